use crate::layers::dense::{Gradients, Layer};
use crate::math::matrix::Matrix;
use crate::optim::Optimizer;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

/// First and second moment estimates for one layer.
struct Moments {
    m_weights: Matrix,
    v_weights: Matrix,
    m_biases: Matrix,
    v_biases: Matrix,
}

impl Moments {
    fn for_layer(layer: &Layer) -> Moments {
        Moments {
            m_weights: Matrix::zeros(layer.weights.rows, layer.weights.cols),
            v_weights: Matrix::zeros(layer.weights.rows, layer.weights.cols),
            m_biases: Matrix::zeros(layer.biases.rows, layer.biases.cols),
            v_biases: Matrix::zeros(layer.biases.rows, layer.biases.cols),
        }
    }
}

/// Adaptive-moment gradient descent with bias correction.
///
/// Moment buffers are created lazily on the first step and are bound to the
/// layer shapes seen then.
pub struct Adam {
    pub learning_rate: f64,
    timestep: i32,
    moments: Vec<Moments>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam { learning_rate, timestep: 0, moments: Vec::new() }
    }

    fn update(&self, m: &mut Matrix, v: &mut Matrix, g: &Matrix) -> Matrix {
        *m = m.zip_map(g, |m, g| BETA1 * m + (1.0 - BETA1) * g);
        *v = v.zip_map(g, |v, g| BETA2 * v + (1.0 - BETA2) * g * g);
        let m_corr = 1.0 - BETA1.powi(self.timestep);
        let v_corr = 1.0 - BETA2.powi(self.timestep);
        let lr = self.learning_rate;
        m.zip_map(v, |m, v| lr * (m / m_corr) / ((v / v_corr).sqrt() + EPSILON))
    }
}

impl Optimizer for Adam {
    fn step(&mut self, layers: &mut [Layer], gradients: &[Gradients]) {
        if self.moments.len() != layers.len() {
            self.moments = layers.iter().map(Moments::for_layer).collect();
        }
        self.timestep += 1;

        let mut moments = std::mem::take(&mut self.moments);
        for ((layer, grads), mom) in layers.iter_mut().zip(gradients).zip(moments.iter_mut()) {
            let w_step = self.update(&mut mom.m_weights, &mut mom.v_weights, &grads.weights);
            let b_step = self.update(&mut mom.m_biases, &mut mom.v_biases, &grads.biases);
            layer.apply_update(&w_step, &b_step);
        }
        self.moments = moments;
    }
}
