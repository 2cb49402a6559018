use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::{Activate, ActivationFunction};
use crate::math::matrix::Matrix;

/// Fully-connected layer: `a = f(x·W + b)`.
///
/// `weights` is (input_size × size) and `biases` is (1 × size), so a batch
/// with one sample per row multiplies from the left.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer{
    pub size: usize,
    pub input_size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction
}

/// Values kept from a forward pass for the matching backward pass.
#[derive(Debug, Clone)]
pub struct ForwardCache {
    pub input: Matrix,
    /// z = x·W + b, needed because every derivative is taken at z.
    pub pre_activation: Matrix,
    pub output: Matrix,
}

/// Gradients of the batch loss with respect to one layer.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub weights: Matrix,
    pub biases: Matrix,
    /// ∂L/∂x, the upstream gradient for the previous layer.
    pub input: Matrix,
}

impl Layer {
    /// Creates a layer with He or Xavier weights (picked from the
    /// activation) and zero biases.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let weights = if activation.prefers_he_init() {
            Matrix::he(input_size, size, rng)
        } else {
            Matrix::xavier(input_size, size, rng)
        };

        Layer {
            size,
            input_size,
            weights,
            biases: Matrix::zeros(1, size),
            activator: activation
        }
    }

    /// Inference pass over a batch.
    pub fn forward(&self, input: &Matrix) -> Matrix {
        let z = (input * &self.weights).add_row(&self.biases);
        self.activator.forward(&z)
    }

    /// Training pass over a batch; keeps what `backward` needs.
    pub fn forward_cached(&self, input: Matrix) -> ForwardCache {
        let pre_activation = (&input * &self.weights).add_row(&self.biases);
        let output = self.activator.forward(&pre_activation);
        ForwardCache { input, pre_activation, output }
    }

    /// Backpropagates ∂L/∂a (error in activation space) through the
    /// activation and the affine transform.
    pub fn backward(&self, cache: &ForwardCache, upstream: &Matrix) -> Gradients {
        let delta = self.activator.backward(&cache.pre_activation, upstream);
        self.backward_pre_activation(cache, delta)
    }

    /// Backpropagates an error that is already ∂L/∂z, as produced by the
    /// fused softmax + cross-entropy gradient.
    pub fn backward_pre_activation(&self, cache: &ForwardCache, delta: Matrix) -> Gradients {
        let weights = &cache.input.transpose() * &delta;
        let biases = delta.sum_rows();
        let input = &delta * &self.weights.transpose();
        Gradients { weights, biases, input }
    }

    /// Subtracts already-scaled parameter updates.
    pub fn apply_update(&mut self, weights_step: &Matrix, biases_step: &Matrix) {
        self.weights = &self.weights - weights_step;
        self.biases = &self.biases - biases_step;
    }

    pub fn is_finite(&self) -> bool {
        self.weights.is_finite() && self.biases.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn shapes_follow_declared_widths() {
        let layer = Layer::new(4, 16, ActivationFunction::ReLU, &mut StdRng::seed_from_u64(1));
        assert_eq!((layer.weights.rows, layer.weights.cols), (16, 4));
        assert_eq!((layer.biases.rows, layer.biases.cols), (1, 4));
        let out = layer.forward(&Matrix::zeros(3, 16));
        assert_eq!((out.rows, out.cols), (3, 4));
    }

    #[test]
    fn weight_gradient_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = Layer::new(2, 3, ActivationFunction::Tanh, &mut rng);
        let x = Matrix::from_data(vec![vec![0.5, -1.0, 0.25], vec![0.1, 0.2, -0.3]]);
        // L = sum of outputs, so ∂L/∂a = 1
        let loss = |l: &Layer| l.forward(&x).data.iter().flatten().sum::<f64>();

        let cache = layer.forward_cached(x.clone());
        let grads = layer.backward(&cache, &Matrix::filled(2, 2, 1.0));

        let h = 1e-6;
        for i in 0..3 {
            for j in 0..2 {
                let mut plus = layer.clone();
                let mut minus = layer.clone();
                plus.weights.data[i][j] += h;
                minus.weights.data[i][j] -= h;
                let numeric = (loss(&plus) - loss(&minus)) / (2.0 * h);
                assert!((numeric - grads.weights.data[i][j]).abs() < 1e-6);
            }
        }
    }
}
