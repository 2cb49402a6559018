use serde::{Serialize, Deserialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Sigmoid with a fixed steepness constant `k`:
///
/// ```text
/// h(x)  = 1 / (1 + exp(-k·x))
/// h'(x) = k · h(x) · (1 - h(x))
/// ```
///
/// `k` is chosen at construction and never learned.  `k <= 0` is rejected:
/// zero flattens the curve to a constant 0.5 and a negative value turns it
/// into a decreasing function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ParametricSigmoid {
    k: f64,
}

impl ParametricSigmoid {
    pub fn new(k: f64) -> Result<ParametricSigmoid> {
        if k > 0.0 && k.is_finite() {
            Ok(ParametricSigmoid { k })
        } else {
            Err(Error::InvalidActivationParameter(k))
        }
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    /// h(x) for a single value.
    ///
    /// Only `exp` of a non-positive argument is ever taken, so the result
    /// stays finite (saturating at 0.0 or 1.0) for any finite input.
    pub fn function(&self, x: f64) -> f64 {
        stable_sigmoid(self.k * x)
    }

    /// dh/dx for a single value.
    pub fn derivative(&self, x: f64) -> f64 {
        let h = self.function(x);
        self.k * h * (1.0 - h)
    }

    /// Element-wise h(x) over a batch.
    pub fn forward(&self, input: &Matrix) -> Matrix {
        input.map(|x| self.function(x))
    }

    /// `epsilon ⊙ k·h(x)·(1 - h(x))` where `input` is the same `x` that was
    /// given to `forward`.
    pub fn backward(&self, input: &Matrix, epsilon: &Matrix) -> Matrix {
        input.zip_map(epsilon, |x, e| e * self.derivative(x))
    }
}

/// Logistic function evaluated without overflow for large |z|.
pub(crate) fn stable_sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl TryFrom<f64> for ParametricSigmoid {
    type Error = Error;

    fn try_from(k: f64) -> Result<Self> {
        ParametricSigmoid::new(k)
    }
}

impl From<ParametricSigmoid> for f64 {
    fn from(p: ParametricSigmoid) -> f64 {
        p.k
    }
}

impl fmt::Display for ParametricSigmoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParametricSigmoid(k={})", self.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_non_positive_steepness() {
        for k in [0.0, -0.5, -10.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                ParametricSigmoid::new(k),
                Err(Error::InvalidActivationParameter(_))
            ));
        }
    }

    #[test]
    fn midpoint_is_one_half() {
        for k in [0.25, 1.0, 3.0, 10.0] {
            assert_eq!(ParametricSigmoid::new(k).unwrap().function(0.0), 0.5);
        }
    }

    #[test]
    fn stays_finite_for_extreme_inputs() {
        let p = ParametricSigmoid::new(10.0).unwrap();
        for x in [-1e308, -1e6, -800.0, 800.0, 1e6, 1e308] {
            let h = p.function(x);
            let d = p.derivative(x);
            assert!(h.is_finite() && (0.0..=1.0).contains(&h), "h({x}) = {h}");
            assert!(d.is_finite() && d >= 0.0, "h'({x}) = {d}");
        }
    }

    #[test]
    fn backward_scales_upstream_gradient() {
        let p = ParametricSigmoid::new(2.0).unwrap();
        let x = Matrix::from_data(vec![vec![0.0, 1.0]]);
        let eps = Matrix::from_data(vec![vec![3.0, 0.0]]);
        let g = p.backward(&x, &eps);
        // h(0) = 0.5, so k·h·(1-h) = 0.5
        assert_eq!(g.data[0][0], 1.5);
        assert_eq!(g.data[0][1], 0.0);
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let p = ParametricSigmoid::new(1.7).unwrap();
        let x = Matrix::from_data(vec![vec![-3.2, 0.4, 9.9]]);
        let a = p.forward(&x);
        let b = p.forward(&x);
        for (u, v) in a.data[0].iter().zip(b.data[0].iter()) {
            assert_eq!(u.to_bits(), v.to_bits());
        }
    }

    #[test]
    fn deserialization_revalidates_steepness() {
        let ok: ParametricSigmoid = serde_json::from_str("2.5").unwrap();
        assert_eq!(ok.k(), 2.5);
        assert!(serde_json::from_str::<ParametricSigmoid>("-1.0").is_err());
    }

    proptest! {
        #[test]
        fn gradient_matches_finite_difference(k in 0.05f64..10.0, x in -6.0f64..6.0, e in -3.0f64..3.0) {
            let p = ParametricSigmoid::new(k).unwrap();
            let h = 1e-6;
            let numeric = (p.function(x + h) - p.function(x - h)) / (2.0 * h);
            let input = Matrix::from_data(vec![vec![x]]);
            let upstream = Matrix::from_data(vec![vec![e]]);
            let analytic = p.backward(&input, &upstream).data[0][0];
            let fx = p.function(x);
            prop_assert!((analytic - e * k * fx * (1.0 - fx)).abs() < 1e-12);
            prop_assert!((analytic - e * numeric).abs() < 1e-5 * (1.0 + e.abs() * k));
        }

        #[test]
        fn forward_is_monotone(k in 0.05f64..10.0, a in -50.0f64..50.0, b in -50.0f64..50.0) {
            let p = ParametricSigmoid::new(k).unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(p.function(lo) <= p.function(hi));
        }
    }
}
