use std::time::Instant;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::layers::dense::Gradients;
use crate::loss::loss_type::OutputError;
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::optim::Optimizer;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

/// Trains `network` for exactly `config.epochs` full-batch epochs and
/// returns the mean training loss of the last epoch (0.0 when no epoch
/// ran).
///
/// Every epoch runs one forward pass over all rows of `inputs`, averages
/// the gradients over those rows and applies a single optimizer step.  Rows
/// are visited in order; nothing is shuffled and nothing stops early.
///
/// # Errors
/// - `InvalidModelConfiguration` if the matrices are empty or their shapes
///   do not fit the network
/// - `NumericFault` as soon as the loss or any layer parameter stops being
///   finite; the network is left in its faulted state
pub fn train_loop(
    network: &mut Network,
    inputs: &Matrix,
    labels: &Matrix,
    optimizer: &mut dyn Optimizer,
    config: &TrainConfig,
) -> Result<f64> {
    check_shapes(network, inputs, labels)?;

    let Some(output_activation) = network.layers.last().map(|l| l.activator) else {
        return Err(Error::InvalidModelConfiguration("network has no layers".into()));
    };
    let output_layer = network.layers.len() - 1;
    let log_frequency = config.log_frequency.max(1);
    let targets = labels.argmax_rows();

    info!(
        "training {} layers on {} samples for {} epochs",
        network.layers.len(),
        inputs.rows,
        config.epochs
    );

    let mut last_loss = 0.0;
    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        let caches = network.forward_cached(inputs.clone());
        let Some(output) = caches.last().map(|c| &c.output) else {
            return Err(Error::InvalidModelConfiguration("network has no layers".into()));
        };

        let loss = config.loss_type.loss(output, labels);
        if !loss.is_finite() {
            return Err(Error::NumericFault { epoch, layer: output_layer });
        }
        let correct = output.argmax_rows().iter().zip(&targets).filter(|(p, t)| p == t).count();
        let train_accuracy = correct as f64 / inputs.rows as f64;

        // Backward pass, output layer first.
        let mut gradients: Vec<Gradients> = Vec::with_capacity(caches.len());
        let mut upstream = config.loss_type.output_error(output, labels, &output_activation);
        for (layer, cache) in network.layers.iter().zip(&caches).rev() {
            let mut g = match upstream {
                OutputError::Activation(ref grad) => layer.backward(cache, grad),
                OutputError::PreActivation(delta) => layer.backward_pre_activation(cache, delta),
            };
            upstream = OutputError::Activation(std::mem::take(&mut g.input));
            gradients.push(g);
        }
        gradients.reverse();

        optimizer.step(&mut network.layers, &gradients);
        if let Some(layer) = network.first_non_finite_layer() {
            return Err(Error::NumericFault { epoch, layer });
        }

        last_loss = loss;
        if epoch % log_frequency == 0 || epoch == config.epochs {
            info!("epoch {epoch}/{}: loss {loss:.6}, accuracy {:.2}%", config.epochs, train_accuracy * 100.0);
        } else {
            debug!("epoch {epoch}/{}: loss {loss:.6}", config.epochs);
        }

        if let Some(ref tx) = config.progress_tx {
            let stats = EpochStats {
                epoch,
                total_epochs: config.epochs,
                train_loss: loss,
                train_accuracy,
                elapsed_ms: t_start.elapsed().as_millis() as u64,
            };
            // A listener that went away does not stop training.
            let _ = tx.send(stats);
        }
    }

    Ok(last_loss)
}

fn check_shapes(network: &Network, inputs: &Matrix, labels: &Matrix) -> Result<()> {
    if inputs.rows == 0 {
        return Err(Error::InvalidModelConfiguration("training set has no usable samples".into()));
    }
    if inputs.rows != labels.rows {
        return Err(Error::InvalidModelConfiguration(format!(
            "{} input rows but {} label rows",
            inputs.rows, labels.rows
        )));
    }
    if inputs.cols != network.input_size() {
        return Err(Error::InvalidModelConfiguration(format!(
            "samples have {} features but the network expects {}",
            inputs.cols,
            network.input_size()
        )));
    }
    if labels.cols != network.output_size() {
        return Err(Error::InvalidModelConfiguration(format!(
            "labels have {} classes but the network outputs {}",
            labels.cols,
            network.output_size()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::loss::loss_type::LossType;
    use crate::network::spec::LayerSpec;
    use crate::optim::{Adam, Sgd};
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::mpsc;

    fn toy_network(seed: u64) -> Network {
        let specs = [
            LayerSpec { size: 4, input_size: 2, activation: ActivationFunction::Tanh },
            LayerSpec { size: 2, input_size: 4, activation: ActivationFunction::Softmax },
        ];
        Network::new(&specs, &mut StdRng::seed_from_u64(seed))
    }

    fn separable() -> (Matrix, Matrix) {
        let x = Matrix::from_data(vec![
            vec![1.0, 1.0], vec![0.9, 1.2], vec![-1.0, -1.0], vec![-1.1, -0.8],
        ]);
        let y = Matrix::from_data(vec![
            vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0],
        ]);
        (x, y)
    }

    #[test]
    fn loss_decreases_on_separable_data() {
        let (x, y) = separable();
        let mut net = toy_network(7);
        let mut adam = Adam::new(0.05);
        let first = train_loop(&mut net, &x, &y, &mut adam, &TrainConfig::new(1, LossType::CrossEntropy, 1)).unwrap();
        let last = train_loop(&mut net, &x, &y, &mut adam, &TrainConfig::new(100, LossType::CrossEntropy, 50)).unwrap();
        assert!(last < first, "{last} should be below {first}");
        assert_eq!(net.forward(&x).argmax_rows(), vec![0, 0, 1, 1]);
    }

    #[test]
    fn one_progress_message_per_epoch() {
        let (x, y) = separable();
        let mut net = toy_network(1);
        let (tx, rx) = mpsc::channel();
        let config = TrainConfig::new(5, LossType::CrossEntropy, 10).with_progress(tx);
        train_loop(&mut net, &x, &y, &mut Sgd::new(0.1), &config).unwrap();
        drop(config);
        let epochs: Vec<usize> = rx.iter().map(|s| s.epoch).collect();
        assert_eq!(epochs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn zero_epochs_leaves_weights_alone() {
        let (x, y) = separable();
        let mut net = toy_network(2);
        let before = net.layers[0].weights.clone();
        let loss = train_loop(&mut net, &x, &y, &mut Sgd::new(0.1), &TrainConfig::new(0, LossType::Mse, 1)).unwrap();
        assert_eq!(loss, 0.0);
        assert_eq!(net.layers[0].weights, before);
    }

    #[test]
    fn zero_log_frequency_in_a_literal_config_still_trains() {
        let (x, y) = separable();
        let mut net = toy_network(5);
        let config = TrainConfig { epochs: 2, loss_type: LossType::CrossEntropy, log_frequency: 0, progress_tx: None };
        assert!(train_loop(&mut net, &x, &y, &mut Sgd::new(0.1), &config).is_ok());
    }

    #[test]
    fn exploding_update_is_a_numeric_fault() {
        let (x, y) = separable();
        let mut net = toy_network(3);
        let err = train_loop(&mut net, &x, &y, &mut Sgd::new(f64::INFINITY), &TrainConfig::new(3, LossType::CrossEntropy, 1));
        assert!(matches!(err, Err(Error::NumericFault { epoch: 1, .. })));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut net = toy_network(4);
        let x = Matrix::zeros(2, 3);
        let y = Matrix::zeros(2, 2);
        let err = train_loop(&mut net, &x, &y, &mut Sgd::new(0.1), &TrainConfig::new(1, LossType::Mse, 1));
        assert!(matches!(err, Err(Error::InvalidModelConfiguration(_))));
    }
}
