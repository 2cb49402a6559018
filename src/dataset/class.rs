use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of sign categories the classifier distinguishes.
///
/// The declaration order is the one-hot index order and must stay stable
/// across training and evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignClass {
    Stop,
    Yield,
    NoEntry,
    SpeedLimit,
    PriorityRoad,
    PedestrianCrossing,
    Roundabout,
    NoParking,
}

impl SignClass {
    pub const ALL: [SignClass; 8] = [
        SignClass::Stop,
        SignClass::Yield,
        SignClass::NoEntry,
        SignClass::SpeedLimit,
        SignClass::PriorityRoad,
        SignClass::PedestrianCrossing,
        SignClass::Roundabout,
        SignClass::NoParking,
    ];

    pub const COUNT: usize = SignClass::ALL.len();

    /// One-hot column of this class.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<SignClass> {
        SignClass::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            SignClass::Stop => "stop",
            SignClass::Yield => "yield",
            SignClass::NoEntry => "no_entry",
            SignClass::SpeedLimit => "speed_limit",
            SignClass::PriorityRoad => "priority_road",
            SignClass::PedestrianCrossing => "pedestrian_crossing",
            SignClass::Roundabout => "roundabout",
            SignClass::NoParking => "no_parking",
        }
    }

    /// Names of the first `n` classes, for labelling `n` output columns.
    pub fn names(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| SignClass::from_index(i).map_or_else(|| format!("class_{i}"), |c| c.name().to_string()))
            .collect()
    }
}

impl fmt::Display for SignClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignClass {
    type Err = String;

    /// Accepts the snake_case name, ignoring case and treating `-` and
    /// spaces like `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(&['-', ' '][..], "_");
        SignClass::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| format!("unknown sign class {s:?}"))
    }
}
