use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::loss::mse::MseLoss;
use crate::math::matrix::Matrix;

/// Selects which loss the output layer is trained against.
///
/// - `CrossEntropy`: negative log-likelihood; pair with a Softmax output.
/// - `Mse`: mean-squared error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    #[default]
    CrossEntropy,
    Mse,
}

/// Where the initial error of the backward pass lives.
pub enum OutputError {
    /// ∂L/∂a; the output activation's derivative still has to be applied.
    Activation(Matrix),
    /// ∂L/∂z; already includes the output activation.
    PreActivation(Matrix),
}

impl LossType {
    pub fn loss(&self, predicted: &Matrix, expected: &Matrix) -> f64 {
        match self {
            LossType::CrossEntropy => CrossEntropyLoss::loss(predicted, expected),
            LossType::Mse => MseLoss::loss(predicted, expected),
        }
    }

    /// Initial backward-pass error for a batch.
    pub fn output_error(
        &self,
        predicted: &Matrix,
        expected: &Matrix,
        output_activation: &ActivationFunction,
    ) -> OutputError {
        match (self, output_activation) {
            (LossType::CrossEntropy, ActivationFunction::Softmax) => {
                OutputError::PreActivation(CrossEntropyLoss::derivative_with_softmax(predicted, expected))
            }
            (LossType::CrossEntropy, _) => {
                OutputError::Activation(CrossEntropyLoss::derivative(predicted, expected))
            }
            (LossType::Mse, _) => OutputError::Activation(MseLoss::derivative(predicted, expected)),
        }
    }
}
