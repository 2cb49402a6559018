pub mod adam;
pub mod sgd;

use serde::{Serialize, Deserialize};

use crate::layers::dense::{Gradients, Layer};

pub use adam::Adam;
pub use sgd::Sgd;

/// Applies one parameter update to every layer of a network.
///
/// `gradients[i]` belongs to `layers[i]`.
pub trait Optimizer {
    fn step(&mut self, layers: &mut [Layer], gradients: &[Gradients]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd,
    #[default]
    Adam,
}

impl OptimizerKind {
    pub fn build(self, learning_rate: f64) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Sgd => Box::new(Sgd::new(learning_rate)),
            OptimizerKind::Adam => Box::new(Adam::new(learning_rate)),
        }
    }
}
