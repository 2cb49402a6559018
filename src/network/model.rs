use serde::{Serialize, Deserialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::math::matrix::Matrix;
use crate::network::metadata::ModelMetadata;
use crate::network::network::Network;
use crate::network::spec::NetworkSpec;

/// A network whose training has finished.
///
/// Only shared access to the weights is exposed, so a trained model can be
/// scored from several places but never updated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    network: Network,
    spec: NetworkSpec,
    /// Mean loss of the last training epoch.
    final_loss: f64,
    #[serde(default)]
    metadata: ModelMetadata,
}

impl TrainedModel {
    pub(crate) fn new(network: Network, spec: NetworkSpec, final_loss: f64) -> TrainedModel {
        TrainedModel { network, spec, final_loss, metadata: ModelMetadata::default() }
    }

    pub fn with_metadata(mut self, metadata: ModelMetadata) -> TrainedModel {
        self.metadata = metadata;
        self
    }

    pub fn layers(&self) -> &[Layer] {
        &self.network.layers
    }

    pub fn spec(&self) -> &NetworkSpec {
        &self.spec
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }

    pub fn input_size(&self) -> usize {
        self.network.input_size()
    }

    pub fn output_size(&self) -> usize {
        self.network.output_size()
    }

    /// Output activations for a batch of feature rows.
    pub fn predict(&self, inputs: &Matrix) -> Matrix {
        self.network.forward(inputs)
    }

    /// Predicted class index per row.
    pub fn classify(&self, inputs: &Matrix) -> Vec<usize> {
        self.predict(inputs).argmax_rows()
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Loads a model and re-checks that its layer widths chain and that every
    /// stored matrix has the shape its layer declares.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let model: TrainedModel = serde_json::from_reader(reader)?;
        model.spec.check_chain(model.spec.input_size())?;
        if model.spec.layers.is_empty() {
            return Err(Error::InvalidModelConfiguration("stored model has no layers".into()));
        }
        if model.network.layers.len() != model.spec.layers.len() {
            return Err(Error::InvalidModelConfiguration(format!(
                "stored network has {} layers but its specification lists {}",
                model.network.layers.len(),
                model.spec.layers.len()
            )));
        }
        for (i, (layer, spec)) in model.network.layers.iter().zip(&model.spec.layers).enumerate() {
            let consistent = layer.weights.is_consistent()
                && layer.biases.is_consistent()
                && (layer.size, layer.input_size, layer.activator) == (spec.size, spec.input_size, spec.activation)
                && (layer.weights.rows, layer.weights.cols) == (spec.input_size, spec.size)
                && (layer.biases.rows, layer.biases.cols) == (1, spec.size);
            if !consistent {
                return Err(Error::InvalidModelConfiguration(format!(
                    "stored weights of layer {i} do not match a {} -> {} {:?} layer",
                    spec.input_size, spec.size, spec.activation
                )));
            }
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::network::spec::{HiddenLayer, ModelConfig};
    use crate::network::builder::NetworkBuilder;

    fn untrained() -> TrainedModel {
        let config = ModelConfig::new(3, 2, vec![HiddenLayer::new(2, ActivationFunction::ReLU)]);
        let builder = NetworkBuilder::new(config).unwrap();
        TrainedModel::new(builder.build(), builder.spec().clone(), 0.0)
    }

    fn reload(model: &TrainedModel, tag: &str) -> Result<TrainedModel> {
        let path = std::env::temp_dir().join(format!("ferrite-signs-{tag}-{}.json", std::process::id()));
        model.save_json(&path).unwrap();
        let loaded = TrainedModel::load_json(&path);
        std::fs::remove_file(&path).ok();
        loaded
    }

    #[test]
    fn intact_model_reloads() {
        let model = untrained();
        let loaded = reload(&model, "intact").unwrap();
        assert_eq!(loaded.layers()[0].weights, model.layers()[0].weights);
    }

    #[test]
    fn missing_weight_row_is_rejected() {
        let mut model = untrained();
        model.network.layers[1].weights.data.pop();
        assert!(matches!(reload(&model, "short-weights"), Err(Error::InvalidModelConfiguration(_))));
    }

    #[test]
    fn bias_shape_and_activation_must_match() {
        let mut model = untrained();
        model.network.layers[0].biases = Matrix::zeros(2, 2);
        assert!(matches!(reload(&model, "bias-rows"), Err(Error::InvalidModelConfiguration(_))));

        let mut model = untrained();
        model.network.layers[0].activator = ActivationFunction::Tanh;
        assert!(matches!(reload(&model, "activator"), Err(Error::InvalidModelConfiguration(_))));
    }
}
