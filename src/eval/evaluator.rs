use log::info;

use crate::dataset::class::SignClass;
use crate::dataset::dataset::Dataset;
use crate::error::{Error, Result};
use crate::eval::metrics::Evaluation;
use crate::math::matrix::Matrix;
use crate::network::model::TrainedModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Pending,
    Consumed,
}

/// The whole test set as one batch.
///
/// `next_batch` yields it exactly once, in dataset order, then reports
/// completion until `reset` puts the cursor back to `Pending`.
#[derive(Debug, Clone)]
pub struct TestBatches {
    inputs: Matrix,
    labels: Matrix,
    state: CursorState,
}

impl TestBatches {
    /// Excluded rows of `dataset` are not part of the batch.
    pub fn new(dataset: &Dataset) -> TestBatches {
        let (inputs, labels) = dataset.included();
        TestBatches { inputs, labels, state: CursorState::Pending }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn has_next(&self) -> bool {
        self.state == CursorState::Pending
    }

    pub fn next_batch(&mut self) -> Option<(&Matrix, &Matrix)> {
        match self.state {
            CursorState::Pending => {
                self.state = CursorState::Consumed;
                Some((&self.inputs, &self.labels))
            }
            CursorState::Consumed => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = CursorState::Pending;
    }

    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.inputs.rows
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.rows == 0
    }
}

/// Scores a trained model on a held-out dataset.
pub struct Evaluator<'a> {
    model: &'a TrainedModel,
    batches: TestBatches,
    class_names: Vec<String>,
}

impl<'a> Evaluator<'a> {
    /// Output columns are named after [`SignClass`] unless the model
    /// carries its own label names.
    pub fn new(model: &'a TrainedModel, dataset: &Dataset) -> Result<Evaluator<'a>> {
        if dataset.feature_len() != model.input_size() {
            return Err(Error::InvalidModelConfiguration(format!(
                "test samples have {} features but the model expects {}",
                dataset.feature_len(),
                model.input_size()
            )));
        }
        if dataset.num_classes() != model.output_size() {
            return Err(Error::InvalidModelConfiguration(format!(
                "test labels have {} classes but the model outputs {}",
                dataset.num_classes(),
                model.output_size()
            )));
        }
        let class_names = match &model.metadata().output_labels {
            Some(labels) if labels.len() == model.output_size() => labels.clone(),
            _ => SignClass::names(model.output_size()),
        };
        Ok(Evaluator { model, batches: TestBatches::new(dataset), class_names })
    }

    pub fn batches(&mut self) -> &mut TestBatches {
        &mut self.batches
    }

    /// Rewinds the test set and scores every sample once.
    pub fn evaluate(&mut self) -> Evaluation {
        self.batches.reset();
        let mut evaluation = Evaluation::new(self.class_names.clone());
        while let Some((inputs, labels)) = self.batches.next_batch() {
            let predicted = self.model.classify(inputs);
            for (actual, predicted) in labels.argmax_rows().into_iter().zip(predicted) {
                evaluation.record(actual, predicted);
            }
        }
        info!(
            "evaluated {} samples: accuracy {:.4}, macro F1 {:.4}",
            evaluation.total(),
            evaluation.accuracy(),
            evaluation.macro_f1()
        );
        evaluation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn dataset() -> Dataset {
        let inputs = Matrix::from_data(vec![vec![1.0], vec![0.0], vec![2.0]]);
        let labels = Matrix::from_data(vec![vec![1.0, 0.0], vec![0.0, 0.0], vec![0.0, 1.0]]);
        Dataset::new(inputs, labels, BTreeSet::from([1])).unwrap()
    }

    #[test]
    fn cursor_yields_once_until_reset() {
        let mut batches = TestBatches::new(&dataset());
        assert!(batches.has_next());
        let (x, y) = batches.next_batch().unwrap();
        assert_eq!((x.rows, y.rows), (2, 2));
        assert!(!batches.has_next());
        assert!(batches.next_batch().is_none());
        assert_eq!(batches.state(), CursorState::Consumed);
        batches.reset();
        assert_eq!(batches.state(), CursorState::Pending);
        assert!(batches.next_batch().is_some());
    }

    #[test]
    fn excluded_rows_are_not_in_the_batch() {
        let batches = TestBatches::new(&dataset());
        assert_eq!(batches.len(), 2);
        assert!(!batches.is_empty());
    }
}
