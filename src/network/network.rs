use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::layers::dense::{ForwardCache, Layer};
use crate::math::matrix::Matrix;
use crate::network::spec::LayerSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
}

impl Network {
    /// Materializes the layers of an already validated spec, drawing all
    /// initial weights from `rng` in layer order.
    pub fn new<R: Rng + ?Sized>(layer_specs: &[LayerSpec], rng: &mut R) -> Network {
        let layers = layer_specs.iter()
            .map(|spec| Layer::new(spec.size, spec.input_size, spec.activation, rng))
            .collect();
        Network { layers }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size)
    }

    /// Inference over a batch (one sample per row).
    pub fn forward(&self, input: &Matrix) -> Matrix {
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.forward(&current);
        }
        current
    }

    /// Training forward pass; one cache per layer, in layer order.
    pub fn forward_cached(&self, input: Matrix) -> Vec<ForwardCache> {
        let mut caches: Vec<ForwardCache> = Vec::with_capacity(self.layers.len());
        let mut current = input;
        for layer in &self.layers {
            let cache = layer.forward_cached(current);
            current = cache.output.clone();
            caches.push(cache);
        }
        caches
    }

    /// Index of the first layer holding a non-finite parameter.
    pub fn first_non_finite_layer(&self) -> Option<usize> {
        self.layers.iter().position(|l| !l.is_finite())
    }
}
