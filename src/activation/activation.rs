use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::activation::parametric::{stable_sigmoid, ParametricSigmoid};
use crate::math::matrix::Matrix;

const SELU_LAMBDA: f64 = 1.050_700_987_355_480_5;
const SELU_ALPHA: f64 = 1.673_263_242_354_377_3;

/// Forward and backward transform of a layer activation over a batch.
///
/// `backward` receives the same pre-activation `z` that was passed to
/// `forward` together with the upstream gradient ∂L/∂a, and returns ∂L/∂z.
pub trait Activate {
    fn forward(&self, z: &Matrix) -> Matrix;
    fn backward(&self, z: &Matrix, upstream: &Matrix) -> Matrix;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Sigmoid,
    ReLU,
    Identity,
    /// Row-wise softmax.  Not element-wise, so `function()` and
    /// `derivative()` are never called for it.
    Softmax,
    Tanh,
    LeakyReLU { alpha: f64 },
    Elu { alpha: f64 },
    Selu,
    Gelu,
    Swish,
    Mish,
    Softplus,
    HardTanh,
    HardSigmoid,
    ParametricSigmoid(ParametricSigmoid),
}

impl ActivationFunction {
    /// Element-wise activation.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => stable_sigmoid(x),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity => x,
            ActivationFunction::Softmax => {
                unreachable!("softmax is applied row-wise by ActivationFunction::forward")
            }
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { x } else { alpha * x.exp_m1() }
            }
            ActivationFunction::Selu => {
                if x > 0.0 { SELU_LAMBDA * x } else { SELU_LAMBDA * SELU_ALPHA * x.exp_m1() }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            ActivationFunction::Swish => x * stable_sigmoid(x),
            ActivationFunction::Mish => x * softplus(x).tanh(),
            ActivationFunction::Softplus => softplus(x),
            ActivationFunction::HardTanh => x.clamp(-1.0, 1.0),
            ActivationFunction::HardSigmoid => (0.2 * x + 0.5).clamp(0.0, 1.0),
            ActivationFunction::ParametricSigmoid(p) => p.function(x),
        }
    }

    /// Element-wise derivative of the activation, evaluated at the
    /// pre-activation `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = stable_sigmoid(x);
                fx * (1.0 - fx)
            },
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Softmax => {
                unreachable!("softmax gradient is a Jacobian product, see ActivationFunction::backward")
            }
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { 1.0 } else { alpha * x.exp() }
            }
            ActivationFunction::Selu => {
                if x > 0.0 { SELU_LAMBDA } else { SELU_LAMBDA * SELU_ALPHA * x.exp() }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                let inner = c * (x + 0.044715 * x.powi(3));
                let tanh_inner = inner.tanh();
                let sech2 = 1.0 - tanh_inner * tanh_inner;
                let d_inner = c * (1.0 + 3.0 * 0.044715 * x.powi(2));
                0.5 * tanh_inner + 0.5 * x * sech2 * d_inner + 0.5
            }
            ActivationFunction::Swish => {
                let sig = stable_sigmoid(x);
                sig + x * sig * (1.0 - sig)
            }
            ActivationFunction::Mish => {
                let t = softplus(x).tanh();
                t + x * (1.0 - t * t) * stable_sigmoid(x)
            }
            ActivationFunction::Softplus => stable_sigmoid(x),
            ActivationFunction::HardTanh => if (-1.0..=1.0).contains(&x) { 1.0 } else { 0.0 },
            ActivationFunction::HardSigmoid => {
                if (-2.5..=2.5).contains(&x) { 0.2 } else { 0.0 }
            }
            ActivationFunction::ParametricSigmoid(p) => p.derivative(x),
        }
    }

    /// Plain or parametric sigmoid.
    pub fn is_sigmoid_family(&self) -> bool {
        matches!(
            self,
            ActivationFunction::Sigmoid | ActivationFunction::ParametricSigmoid(_)
        )
    }

    /// Whether weights feeding this activation should use He rather than
    /// Xavier initialization.
    pub fn prefers_he_init(&self) -> bool {
        matches!(
            self,
            ActivationFunction::ReLU
                | ActivationFunction::LeakyReLU { .. }
                | ActivationFunction::Elu { .. }
                | ActivationFunction::Selu
                | ActivationFunction::Gelu
                | ActivationFunction::Swish
                | ActivationFunction::Mish
        )
    }
}

impl Activate for ActivationFunction {
    fn forward(&self, z: &Matrix) -> Matrix {
        match self {
            ActivationFunction::Softmax => softmax_rows(z),
            ActivationFunction::ParametricSigmoid(p) => p.forward(z),
            _ => z.map(|x| self.function(x)),
        }
    }

    fn backward(&self, z: &Matrix, upstream: &Matrix) -> Matrix {
        match self {
            ActivationFunction::Softmax => {
                // J·u per row: s_i · (u_i - Σ_j u_j s_j)
                let s = softmax_rows(z);
                let mut res = Matrix::zeros(z.rows, z.cols);
                for ((out, s_row), u_row) in res.data.iter_mut().zip(&s.data).zip(&upstream.data) {
                    let dot: f64 = s_row.iter().zip(u_row).map(|(s, u)| s * u).sum();
                    for ((o, s), u) in out.iter_mut().zip(s_row).zip(u_row) {
                        *o = s * (u - dot);
                    }
                }
                res
            }
            ActivationFunction::ParametricSigmoid(p) => p.backward(z, upstream),
            _ => z.zip_map(upstream, |x, u| u * self.derivative(x)),
        }
    }
}

impl Activate for ParametricSigmoid {
    fn forward(&self, z: &Matrix) -> Matrix {
        ParametricSigmoid::forward(self, z)
    }

    fn backward(&self, z: &Matrix, upstream: &Matrix) -> Matrix {
        ParametricSigmoid::backward(self, z, upstream)
    }
}

fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

/// Numerically stable softmax over each row.
fn softmax_rows(z: &Matrix) -> Matrix {
    let data = z.data.iter()
        .map(|row| {
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = row.iter().map(|x| (x - max).exp()).collect();
            let sum: f64 = exps.iter().sum();
            exps.into_iter().map(|e| e / sum).collect()
        })
        .collect();
    Matrix { rows: z.rows, cols: z.cols, data }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_elementwise() -> Vec<ActivationFunction> {
        vec![
            ActivationFunction::Sigmoid,
            ActivationFunction::Identity,
            ActivationFunction::Tanh,
            ActivationFunction::LeakyReLU { alpha: 0.01 },
            ActivationFunction::Elu { alpha: 1.0 },
            ActivationFunction::Selu,
            ActivationFunction::Gelu,
            ActivationFunction::Swish,
            ActivationFunction::Mish,
            ActivationFunction::Softplus,
            ActivationFunction::ParametricSigmoid(ParametricSigmoid::new(3.0).unwrap()),
        ]
    }

    #[test]
    fn piecewise_derivatives_match_away_from_kinks() {
        let h = 1e-6;
        let piecewise = [
            ActivationFunction::ReLU,
            ActivationFunction::HardTanh,
            ActivationFunction::HardSigmoid,
        ];
        for act in piecewise {
            for &x in &[-3.1, -1.7, -0.4, 0.6, 1.9, 2.8] {
                let numeric = (act.function(x + h) - act.function(x - h)) / (2.0 * h);
                let analytic = act.derivative(x);
                assert!(
                    (numeric - analytic).abs() < 1e-5,
                    "{act:?} at {x}: analytic {analytic}, numeric {numeric}"
                );
            }
        }
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let h = 1e-6;
        for act in all_elementwise() {
            for &x in &[-2.3, -0.7, 0.3, 1.1, 2.9] {
                let numeric = (act.function(x + h) - act.function(x - h)) / (2.0 * h);
                let analytic = act.derivative(x);
                assert!(
                    (numeric - analytic).abs() < 1e-5,
                    "{act:?} at {x}: analytic {analytic}, numeric {numeric}"
                );
            }
        }
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let z = Matrix::from_data(vec![vec![1.0, 2.0, 3.0], vec![1000.0, 1000.0, -1000.0]]);
        let s = ActivationFunction::Softmax.forward(&z);
        for row in &s.data {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        assert!((s.data[1][0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn softmax_backward_matches_finite_differences() {
        let z = Matrix::from_data(vec![vec![0.2, -1.0, 0.7]]);
        let u = Matrix::from_data(vec![vec![1.0, -2.0, 0.5]]);
        let g = ActivationFunction::Softmax.backward(&z, &u);
        let h = 1e-6;
        for j in 0..3 {
            let mut plus = z.clone();
            let mut minus = z.clone();
            plus.data[0][j] += h;
            minus.data[0][j] -= h;
            let sp = ActivationFunction::Softmax.forward(&plus);
            let sm = ActivationFunction::Softmax.forward(&minus);
            let numeric: f64 = (0..3).map(|i| u.data[0][i] * (sp.data[0][i] - sm.data[0][i]) / (2.0 * h)).sum();
            assert!((numeric - g.data[0][j]).abs() < 1e-6);
        }
    }

    #[test]
    fn sigmoid_family_detection() {
        assert!(ActivationFunction::Sigmoid.is_sigmoid_family());
        assert!(!ActivationFunction::ReLU.is_sigmoid_family());
        assert!(!ActivationFunction::Tanh.is_sigmoid_family());
    }

    #[test]
    fn parametric_variant_serializes_with_its_steepness() {
        let act = ActivationFunction::ParametricSigmoid(ParametricSigmoid::new(4.0).unwrap());
        let json = serde_json::to_string(&act).unwrap();
        assert_eq!(json, r#"{"ParametricSigmoid":4.0}"#);
        let back: ActivationFunction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, act);
    }
}
