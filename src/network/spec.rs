use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::activation::parametric::ParametricSigmoid;
use crate::error::{Error, Result};
use crate::loss::loss_type::LossType;
use crate::optim::OptimizerKind;

/// One hidden layer as declared by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HiddenLayer {
    pub width: usize,
    pub activation: ActivationFunction,
}

impl HiddenLayer {
    pub fn new(width: usize, activation: ActivationFunction) -> HiddenLayer {
        HiddenLayer { width, activation }
    }
}

/// How hidden-layer activations are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HiddenActivations {
    /// Every hidden layer uses the activation it declares.
    #[default]
    Declared,
    /// Every hidden layer must declare a sigmoid and is given
    /// `ParametricSigmoid(alpha)` instead.
    ParametricSigmoid { alpha: f64 },
}

/// Resolved description of one dense layer.
///
/// - `size`: number of neurons in this layer
/// - `input_size`: output size of the previous layer, or the network
///   input width for the first layer
/// - `activation`: activation applied after the linear transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// Architecture plus loss, with every width already chained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub layers: Vec<LayerSpec>,
    pub loss: LossType,
}

impl NetworkSpec {
    /// Checks that each layer's input width is the previous layer's output
    /// width, starting at `input_size`.
    pub fn check_chain(&self, input_size: usize) -> Result<()> {
        let mut expected = input_size;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.input_size != expected {
                return Err(Error::InvalidModelConfiguration(format!(
                    "layer {i} expects {} inputs but receives {expected}",
                    layer.input_size
                )));
            }
            expected = layer.size;
        }
        Ok(())
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size)
    }
}

/// Everything needed to build and train a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// 0 in a run file means "take it from the dataset".
    #[serde(default)]
    pub input_size: usize,
    #[serde(default)]
    pub output_size: usize,
    pub hidden_layers: Vec<HiddenLayer>,
    #[serde(default)]
    pub hidden_activations: HiddenActivations,
    #[serde(default = "defaults::output_activation")]
    pub output_activation: ActivationFunction,
    #[serde(default = "defaults::learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "defaults::num_epochs")]
    pub num_epochs: usize,
    /// Epochs between two loss log lines.
    #[serde(default = "defaults::log_frequency")]
    pub log_frequency: usize,
    #[serde(default = "defaults::seed")]
    pub seed: u64,
    #[serde(default)]
    pub optimizer: OptimizerKind,
    #[serde(default)]
    pub loss: LossType,
}

mod defaults {
    use crate::activation::activation::ActivationFunction;

    pub fn output_activation() -> ActivationFunction {
        ActivationFunction::Softmax
    }

    pub fn learning_rate() -> f64 {
        0.01
    }

    pub fn num_epochs() -> usize {
        500
    }

    pub fn log_frequency() -> usize {
        10
    }

    pub fn seed() -> u64 {
        1
    }
}

impl ModelConfig {
    /// A configuration with the default hyperparameters.
    pub fn new(input_size: usize, output_size: usize, hidden_layers: Vec<HiddenLayer>) -> ModelConfig {
        ModelConfig {
            input_size,
            output_size,
            hidden_layers,
            hidden_activations: HiddenActivations::Declared,
            output_activation: defaults::output_activation(),
            learning_rate: defaults::learning_rate(),
            num_epochs: defaults::num_epochs(),
            log_frequency: defaults::log_frequency(),
            seed: defaults::seed(),
            optimizer: OptimizerKind::default(),
            loss: LossType::default(),
        }
    }

    /// Switches every hidden layer to `ParametricSigmoid(alpha)`.
    pub fn with_parametric_sigmoid(mut self, alpha: f64) -> ModelConfig {
        self.hidden_activations = HiddenActivations::ParametricSigmoid { alpha };
        self
    }

    pub fn with_epochs(mut self, num_epochs: usize) -> ModelConfig {
        self.num_epochs = num_epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> ModelConfig {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> ModelConfig {
        self.seed = seed;
        self
    }

    pub fn with_output_activation(mut self, activation: ActivationFunction) -> ModelConfig {
        self.output_activation = activation;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerKind) -> ModelConfig {
        self.optimizer = optimizer;
        self
    }

    /// Runs every precondition and resolves the layer stack.  Nothing is
    /// allocated for the network until this succeeds.
    pub fn resolve(&self) -> Result<NetworkSpec> {
        if self.input_size == 0 {
            return Err(invalid("input size must be greater than 0"));
        }
        if self.output_size == 0 {
            return Err(invalid("output size must be greater than 0"));
        }
        if self.hidden_layers.is_empty() {
            return Err(invalid("at least one hidden layer must be configured"));
        }
        if let Some(i) = self.hidden_layers.iter().position(|l| l.width == 0) {
            return Err(invalid(&format!("hidden layer {i} has width 0")));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid(&format!("learning rate must be positive, got {}", self.learning_rate)));
        }
        if self.log_frequency == 0 {
            return Err(invalid("log frequency must be at least 1"));
        }

        let hidden_override = match self.hidden_activations {
            HiddenActivations::Declared => None,
            HiddenActivations::ParametricSigmoid { alpha } => {
                let p = ParametricSigmoid::new(alpha)
                    .map_err(|_| invalid(&format!("alpha must be greater than 0, got {alpha}")))?;
                if let Some(i) = self.hidden_layers.iter().position(|l| !l.activation.is_sigmoid_family()) {
                    return Err(invalid(&format!(
                        "parametric sigmoid mode requires sigmoid hidden layers, layer {i} declares {:?}",
                        self.hidden_layers[i].activation
                    )));
                }
                Some(ActivationFunction::ParametricSigmoid(p))
            }
        };

        let mut layers = Vec::with_capacity(self.hidden_layers.len() + 1);
        let mut prev = self.input_size;
        for hidden in &self.hidden_layers {
            layers.push(LayerSpec {
                size: hidden.width,
                input_size: prev,
                activation: hidden_override.unwrap_or(hidden.activation),
            });
            prev = hidden.width;
        }
        layers.push(LayerSpec {
            size: self.output_size,
            input_size: prev,
            activation: self.output_activation,
        });

        let spec = NetworkSpec { layers, loss: self.loss };
        spec.check_chain(self.input_size)?;
        Ok(spec)
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidModelConfiguration(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relu(width: usize) -> HiddenLayer {
        HiddenLayer::new(width, ActivationFunction::ReLU)
    }

    fn sigmoid(width: usize) -> HiddenLayer {
        HiddenLayer::new(width, ActivationFunction::Sigmoid)
    }

    #[test]
    fn preconditions_fail_in_order() {
        let err = ModelConfig::new(0, 0, vec![]).resolve().unwrap_err();
        assert!(err.to_string().contains("input size"));
        let err = ModelConfig::new(16, 0, vec![]).resolve().unwrap_err();
        assert!(err.to_string().contains("output size"));
        let err = ModelConfig::new(16, 3, vec![]).resolve().unwrap_err();
        assert!(err.to_string().contains("hidden layer"));
    }

    #[test]
    fn widths_chain_through_the_stack() {
        let spec = ModelConfig::new(16, 3, vec![relu(8), relu(4)]).resolve().unwrap();
        let dims: Vec<(usize, usize)> = spec.layers.iter().map(|l| (l.input_size, l.size)).collect();
        assert_eq!(dims, vec![(16, 8), (8, 4), (4, 3)]);
        assert_eq!(spec.layers[2].activation, ActivationFunction::Softmax);
    }

    #[test]
    fn parametric_mode_replaces_hidden_sigmoids() {
        let spec = ModelConfig::new(4, 2, vec![sigmoid(3), sigmoid(3)])
            .with_parametric_sigmoid(2.0)
            .resolve()
            .unwrap();
        for layer in &spec.layers[..2] {
            assert!(matches!(layer.activation, ActivationFunction::ParametricSigmoid(p) if p.k() == 2.0));
        }
        assert_eq!(spec.layers[2].activation, ActivationFunction::Softmax);
    }

    #[test]
    fn parametric_mode_rejects_non_sigmoid_layers_and_bad_alpha() {
        let err = ModelConfig::new(4, 2, vec![sigmoid(3), relu(3)])
            .with_parametric_sigmoid(2.0)
            .resolve();
        assert!(matches!(err, Err(Error::InvalidModelConfiguration(_))));

        let err = ModelConfig::new(4, 2, vec![sigmoid(3)])
            .with_parametric_sigmoid(0.0)
            .resolve();
        assert!(matches!(err, Err(Error::InvalidModelConfiguration(_))));
    }

    #[test]
    fn chain_check_catches_mismatched_widths() {
        let spec = NetworkSpec {
            layers: vec![
                LayerSpec { size: 4, input_size: 16, activation: ActivationFunction::ReLU },
                LayerSpec { size: 3, input_size: 5, activation: ActivationFunction::Softmax },
            ],
            loss: LossType::CrossEntropy,
        };
        assert!(matches!(spec.check_chain(16), Err(Error::InvalidModelConfiguration(_))));
    }

    #[test]
    fn json_config_fills_in_defaults() {
        let json = r#"{"input_size": 16, "output_size": 3,
                       "hidden_layers": [{"width": 4, "activation": "ReLU"}]}"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.num_epochs, 500);
        assert_eq!(config.seed, 1);
        assert_eq!(config.output_activation, ActivationFunction::Softmax);
        assert_eq!(config.hidden_activations, HiddenActivations::Declared);
    }
}
