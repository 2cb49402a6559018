use crate::math::matrix::Matrix;

/// Categorical cross-entropy (negative log-likelihood) averaged over the
/// rows of a batch.
pub struct CrossEntropyLoss;

/// Keeps log() finite when a predicted probability underflows to 0.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// L = -(1/n) · Σ_rows Σ_i expected[i] · ln(predicted[i] + ε)
    pub fn loss(predicted: &Matrix, expected: &Matrix) -> f64 {
        if predicted.rows == 0 {
            return 0.0;
        }
        let total: f64 = predicted.data.iter().zip(expected.data.iter())
            .map(|(p_row, e_row)| {
                p_row.iter().zip(e_row.iter())
                    .map(|(p, e)| -e * (p + EPS).ln())
                    .sum::<f64>()
            })
            .sum();
        total / predicted.rows as f64
    }

    /// ∂L/∂a for an arbitrary output activation: -expected / (predicted + ε) / n.
    pub fn derivative(predicted: &Matrix, expected: &Matrix) -> Matrix {
        let n = predicted.rows.max(1) as f64;
        predicted.zip_map(expected, |p, e| -e / (p + EPS) / n)
    }

    /// ∂L/∂z when the output layer is softmax: (predicted - expected) / n.
    ///
    /// The softmax Jacobian is already folded in, so the output layer must
    /// not apply its activation derivative on top of this.
    pub fn derivative_with_softmax(predicted: &Matrix, expected: &Matrix) -> Matrix {
        let n = predicted.rows.max(1) as f64;
        predicted.zip_map(expected, |p, e| (p - e) / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_prediction_has_near_zero_loss() {
        let y = Matrix::from_data(vec![vec![0.0, 1.0, 0.0]]);
        assert!(CrossEntropyLoss::loss(&y, &y) < 1e-9);
    }

    #[test]
    fn fused_gradient_is_averaged_over_rows() {
        let p = Matrix::from_data(vec![vec![0.25, 0.75], vec![0.5, 0.5]]);
        let y = Matrix::from_data(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        let g = CrossEntropyLoss::derivative_with_softmax(&p, &y);
        assert_eq!(g.data, vec![vec![0.125, -0.125], vec![-0.25, 0.25]]);
    }
}
