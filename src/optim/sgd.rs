use crate::layers::dense::{Gradients, Layer};
use crate::optim::Optimizer;

/// Plain gradient descent: `θ ← θ - lr · g`.
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, layers: &mut [Layer], gradients: &[Gradients]) {
        for (layer, grads) in layers.iter_mut().zip(gradients) {
            layer.apply_update(
                &grads.weights.scale(self.learning_rate),
                &grads.biases.scale(self.learning_rate),
            );
        }
    }
}
