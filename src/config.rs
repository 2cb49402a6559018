use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};

use crate::dataset::assembler::{DatasetConfig, LabeledImage};
use crate::dataset::class::SignClass;
use crate::error::{Error, Result};
use crate::network::spec::ModelConfig;

/// One line of an image manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub label: SignClass,
}

/// Reads a JSON array of `{"path", "label"}` objects.  Relative paths are
/// taken relative to the manifest's own directory.
pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledImage>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let entries: Vec<ManifestEntry> = serde_json::from_reader(std::io::BufReader::new(file))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(entries
        .into_iter()
        .map(|e| {
            let image_path = if e.path.is_relative() { base.join(&e.path) } else { e.path };
            LabeledImage::from_path(image_path, e.label)
        })
        .collect())
}

/// Everything a `train` or `evaluate` run needs, read from one JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub dataset: DatasetConfig,
    pub model: ModelConfig,
    pub train_manifest: Option<PathBuf>,
    pub test_manifest: Option<PathBuf>,
    /// Where `train` writes the model.
    pub model_path: PathBuf,
    /// Assembled datasets are stored here and reused when present.
    #[serde(default)]
    pub train_cache: Option<PathBuf>,
    #[serde(default)]
    pub test_cache: Option<PathBuf>,
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
        let file = std::fs::File::open(path)?;
        let config: RunConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.dataset.validate()?;
        Ok(config)
    }

    /// Model configuration with unset sizes filled in from the dataset
    /// shape.  Explicit sizes that disagree with it are an error.
    pub fn model_config(&self) -> Result<ModelConfig> {
        let mut model = self.model.clone();
        let feature_len = self.dataset.feature_len();
        match model.input_size {
            0 => model.input_size = feature_len,
            n if n != feature_len => {
                return Err(Error::InvalidModelConfiguration(format!(
                    "model input size {n} does not match the {feature_len} features per image"
                )))
            }
            _ => {}
        }
        match model.output_size {
            0 => model.output_size = self.dataset.num_classes,
            n if n != self.dataset.num_classes => {
                return Err(Error::InvalidModelConfiguration(format!(
                    "model output size {n} does not match {} classes",
                    self.dataset.num_classes
                )))
            }
            _ => {}
        }
        Ok(model)
    }
}
