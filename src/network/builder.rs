use log::info;
use rand::{rngs::StdRng, SeedableRng};
use std::sync::mpsc;

use crate::dataset::dataset::Dataset;
use crate::error::{Error, Result};
use crate::network::model::TrainedModel;
use crate::network::network::Network;
use crate::network::spec::{ModelConfig, NetworkSpec};
use crate::train::{train_loop, EpochStats, TrainConfig};

/// Turns a validated [`ModelConfig`] into a trained model.
///
/// All preconditions are checked in [`NetworkBuilder::new`], so a builder
/// that exists can always materialize its network.  Weights are drawn from
/// a generator seeded with `config.seed`; two builds of the same config on
/// the same data produce identical models.
pub struct NetworkBuilder {
    config: ModelConfig,
    spec: NetworkSpec,
    progress_tx: Option<mpsc::Sender<EpochStats>>,
}

impl NetworkBuilder {
    pub fn new(config: ModelConfig) -> Result<NetworkBuilder> {
        let spec = config.resolve()?;
        Ok(NetworkBuilder { config, spec, progress_tx: None })
    }

    /// Streams one [`EpochStats`] per finished epoch to `tx`.
    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> NetworkBuilder {
        self.progress_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn spec(&self) -> &NetworkSpec {
        &self.spec
    }

    /// Freshly initialized, untrained network.
    pub fn build(&self) -> Network {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        Network::new(&self.spec.layers, &mut rng)
    }

    /// Builds the network and runs `num_epochs` full-batch passes over the
    /// usable rows of `dataset`.
    pub fn build_and_train(self, dataset: &Dataset) -> Result<TrainedModel> {
        if dataset.feature_len() != self.config.input_size {
            return Err(Error::InvalidModelConfiguration(format!(
                "dataset has {} features per sample but the model input size is {}",
                dataset.feature_len(),
                self.config.input_size
            )));
        }
        if dataset.num_classes() != self.config.output_size {
            return Err(Error::InvalidModelConfiguration(format!(
                "dataset has {} classes but the model output size is {}",
                dataset.num_classes(),
                self.config.output_size
            )));
        }
        let (inputs, labels) = dataset.included();
        if inputs.rows == 0 {
            return Err(Error::InvalidModelConfiguration(format!(
                "all {} samples of the training set were excluded",
                dataset.num_samples()
            )));
        }

        let mut network = self.build();
        info!(
            "built network {} with seed {}",
            describe(&self.spec),
            self.config.seed
        );

        let mut optimizer = self.config.optimizer.build(self.config.learning_rate);
        let train_config = TrainConfig {
            epochs: self.config.num_epochs,
            loss_type: self.spec.loss,
            log_frequency: self.config.log_frequency,
            progress_tx: self.progress_tx,
        };
        let final_loss = train_loop(&mut network, &inputs, &labels, optimizer.as_mut(), &train_config)?;
        info!("training finished, final loss {final_loss:.6}");

        Ok(TrainedModel::new(network, self.spec, final_loss))
    }
}

fn describe(spec: &NetworkSpec) -> String {
    let mut widths = vec![spec.input_size().to_string()];
    widths.extend(spec.layers.iter().map(|l| format!("{}:{:?}", l.size, l.activation)));
    widths.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::math::matrix::Matrix;
    use crate::network::spec::HiddenLayer;
    use std::collections::BTreeSet;

    fn tiny_dataset() -> Dataset {
        let inputs = Matrix::from_data(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 0.0]]);
        let labels = Matrix::from_data(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 0.0]]);
        Dataset::new(inputs, labels, BTreeSet::from([2])).unwrap()
    }

    #[test]
    fn invalid_config_never_reaches_a_builder() {
        assert!(matches!(NetworkBuilder::new(ModelConfig::new(0, 3, vec![])), Err(Error::InvalidModelConfiguration(_))));
    }

    #[test]
    fn same_seed_same_weights() {
        let config = ModelConfig::new(2, 2, vec![HiddenLayer::new(3, ActivationFunction::Sigmoid)]).with_seed(42);
        let a = NetworkBuilder::new(config.clone()).unwrap().build();
        let b = NetworkBuilder::new(config.clone()).unwrap().build();
        let c = NetworkBuilder::new(config.with_seed(43)).unwrap().build();
        assert_eq!(a.layers[0].weights, b.layers[0].weights);
        assert_ne!(a.layers[0].weights, c.layers[0].weights);
    }

    #[test]
    fn dataset_shape_must_match_config() {
        let config = ModelConfig::new(3, 2, vec![HiddenLayer::new(3, ActivationFunction::ReLU)]);
        let err = NetworkBuilder::new(config).unwrap().build_and_train(&tiny_dataset());
        assert!(matches!(err, Err(Error::InvalidModelConfiguration(_))));
    }

    #[test]
    fn trains_on_included_rows_only() {
        let config = ModelConfig::new(2, 2, vec![HiddenLayer::new(3, ActivationFunction::ReLU)]).with_epochs(3);
        let model = NetworkBuilder::new(config).unwrap().build_and_train(&tiny_dataset()).unwrap();
        assert!(model.final_loss().is_finite());
        assert_eq!(model.layers().len(), 2);
    }

    #[test]
    fn fully_excluded_dataset_is_rejected() {
        let ds = Dataset::new(Matrix::zeros(2, 2), Matrix::zeros(2, 2), BTreeSet::from([0, 1])).unwrap();
        let config = ModelConfig::new(2, 2, vec![HiddenLayer::new(3, ActivationFunction::ReLU)]);
        assert!(matches!(
            NetworkBuilder::new(config).unwrap().build_and_train(&ds),
            Err(Error::InvalidModelConfiguration(_))
        ));
    }
}
