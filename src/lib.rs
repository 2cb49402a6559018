pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod loss;
pub mod optim;
pub mod features;
pub mod dataset;
pub mod network;
pub mod train;
pub mod eval;
pub mod config;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use activation::{Activate, ActivationFunction, ParametricSigmoid};
pub use features::{FeatureExtractor, NormalizedPixel, RawImage};
pub use dataset::{Dataset, DatasetAssembler, DatasetConfig, LabeledImage, SignClass};
pub use network::{HiddenLayer, ModelConfig, NetworkBuilder, TrainedModel};
pub use eval::{Evaluation, Evaluator};
pub use config::RunConfig;
