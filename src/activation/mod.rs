pub mod activation;
pub mod parametric;

pub use activation::{Activate, ActivationFunction};
pub use parametric::ParametricSigmoid;
