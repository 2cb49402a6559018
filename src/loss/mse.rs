use crate::math::matrix::Matrix;

pub struct MseLoss;

impl MseLoss {
    /// Mean over rows of mean((predicted - expected)²).
    pub fn loss(predicted: &Matrix, expected: &Matrix) -> f64 {
        if predicted.rows == 0 || predicted.cols == 0 {
            return 0.0;
        }
        let total: f64 = predicted.data.iter().zip(expected.data.iter())
            .flat_map(|(p, e)| p.iter().zip(e.iter()).map(|(a, b)| (a - b).powi(2)))
            .sum();
        total / (predicted.rows * predicted.cols) as f64
    }

    /// ∂L/∂a = 2 · (predicted - expected) / (rows · cols)
    pub fn derivative(predicted: &Matrix, expected: &Matrix) -> Matrix {
        let n = (predicted.rows * predicted.cols).max(1) as f64;
        predicted.zip_map(expected, |a, b| 2.0 * (a - b) / n)
    }
}
