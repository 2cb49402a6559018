use serde::{Serialize, Deserialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Feature matrix plus one-hot label matrix, one sample per row.
///
/// Row `i` of `inputs` and row `i` of `labels` describe the same sample.
/// Samples that could not be processed keep all-zero rows in both matrices
/// and are listed in `excluded`; training and evaluation leave them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub inputs: Matrix,
    pub labels: Matrix,
    pub excluded: BTreeSet<usize>,
}

impl Dataset {
    pub fn new(inputs: Matrix, labels: Matrix, excluded: BTreeSet<usize>) -> Result<Dataset> {
        let dataset = Dataset { inputs, labels, excluded };
        dataset.check()?;
        Ok(dataset)
    }

    fn check(&self) -> Result<()> {
        for (name, m) in [("input", &self.inputs), ("label", &self.labels)] {
            if !m.is_consistent() {
                return Err(Error::InvalidConfiguration(format!(
                    "{name} matrix declares {}x{} but holds different data",
                    m.rows, m.cols
                )));
            }
        }
        if self.inputs.rows != self.labels.rows {
            return Err(Error::InvalidConfiguration(format!(
                "input matrix has {} rows but label matrix has {}",
                self.inputs.rows, self.labels.rows
            )));
        }
        if let Some(&i) = self.excluded.iter().find(|&&i| i >= self.inputs.rows) {
            return Err(Error::InvalidConfiguration(format!(
                "excluded row {i} is out of range for {} samples",
                self.inputs.rows
            )));
        }
        Ok(())
    }

    /// Row count, skipped samples included.
    pub fn num_samples(&self) -> usize {
        self.inputs.rows
    }

    pub fn feature_len(&self) -> usize {
        self.inputs.cols
    }

    pub fn num_classes(&self) -> usize {
        self.labels.cols
    }

    pub fn is_excluded(&self, index: usize) -> bool {
        self.excluded.contains(&index)
    }

    pub fn included_indices(&self) -> Vec<usize> {
        (0..self.num_samples()).filter(|i| !self.is_excluded(*i)).collect()
    }

    /// Inputs and labels of the usable samples only, in original order.
    pub fn included(&self) -> (Matrix, Matrix) {
        let rows = self.included_indices();
        (self.inputs.select_rows(&rows), self.labels.select_rows(&rows))
    }

    /// Writes the dataset as JSON so it can be reused without decoding the
    /// images again.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let dataset: Dataset = serde_json::from_reader(reader)?;
        dataset.check()?;
        Ok(dataset)
    }
}
