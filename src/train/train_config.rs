use std::sync::mpsc;

use crate::loss::loss_type::LossType;
use crate::train::epoch_stats::EpochStats;

/// Configuration for a `train_loop` run.
///
/// - `epochs`: exact number of full-batch passes; 0 leaves the
///   initial weights untouched
/// - `loss_type`: loss the output layer is trained against
/// - `log_frequency`: epochs between two `info!` loss lines (at least 1)
/// - `progress_tx`: optional channel; one `EpochStats` is sent per
///   completed epoch.  A dropped receiver is ignored, the
///   loop always runs to completion.
pub struct TrainConfig {
    pub epochs: usize,
    pub loss_type: LossType,
    pub log_frequency: usize,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with no progress channel.
    pub fn new(epochs: usize, loss_type: LossType, log_frequency: usize) -> Self {
        TrainConfig {
            epochs,
            loss_type,
            log_frequency: log_frequency.max(1),
            progress_tx: None,
        }
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }
}
