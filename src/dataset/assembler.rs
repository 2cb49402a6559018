use std::collections::BTreeSet;
use std::path::PathBuf;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use crate::dataset::class::SignClass;
use crate::dataset::dataset::Dataset;
use crate::error::{Error, Result};
use crate::features::crop::{Crop, SignCropper};
use crate::features::extractor::FeatureExtractor;
use crate::features::image::{ImageOpsResize, Interpolation, RawImage};
use crate::math::matrix::Matrix;

/// Shape of the dataset to build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub target_rows: usize,
    pub target_cols: usize,
    pub num_classes: usize,
    #[serde(default = "default_include_alpha")]
    pub include_alpha_channel: bool,
    #[serde(default)]
    pub interpolation: Interpolation,
}

fn default_include_alpha() -> bool {
    true
}

impl DatasetConfig {
    pub fn new(
        target_rows: usize,
        target_cols: usize,
        num_classes: usize,
        include_alpha_channel: bool,
    ) -> Result<DatasetConfig> {
        let config = DatasetConfig {
            target_rows,
            target_cols,
            num_classes,
            include_alpha_channel,
            interpolation: Interpolation::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> DatasetConfig {
        self.interpolation = interpolation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_rows == 0 || self.target_cols == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "target dimensions must be positive, got {}x{}",
                self.target_rows, self.target_cols
            )));
        }
        if self.num_classes == 0 {
            return Err(Error::InvalidConfiguration("number of classes must be positive".into()));
        }
        Ok(())
    }

    pub fn channels(&self) -> usize {
        if self.include_alpha_channel { 4 } else { 3 }
    }

    /// Network input width for this configuration.
    pub fn feature_len(&self) -> usize {
        self.target_rows * self.target_cols * self.channels()
    }
}

/// Where a sample's pixels come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Decoded(RawImage),
}

impl ImageSource {
    pub fn load(&self) -> Result<RawImage> {
        match self {
            ImageSource::Path(path) => RawImage::open(path),
            ImageSource::Decoded(image) => Ok(image.clone()),
        }
    }

    fn describe(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Decoded(image) => format!("in-memory {}x{} image", image.rows, image.cols),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LabeledImage {
    pub source: ImageSource,
    pub label: SignClass,
}

impl LabeledImage {
    pub fn new(image: RawImage, label: SignClass) -> LabeledImage {
        LabeledImage { source: ImageSource::Decoded(image), label }
    }

    pub fn from_path<P: Into<PathBuf>>(path: P, label: SignClass) -> LabeledImage {
        LabeledImage { source: ImageSource::Path(path.into()), label }
    }
}

/// Builds a [`Dataset`] from labelled images.
///
/// Each image is loaded, cropped and flattened on its own rayon task, which
/// writes only to its own row.  A sample whose decoding, cropping or
/// extraction fails is logged and left as zero rows; it does not abort the
/// build.
pub struct DatasetAssembler {
    config: DatasetConfig,
    extractor: FeatureExtractor<ImageOpsResize>,
    cropper: Box<dyn Crop>,
}

impl DatasetAssembler {
    /// Uses the edge-based [`SignCropper`].
    pub fn new(config: DatasetConfig) -> Result<DatasetAssembler> {
        DatasetAssembler::with_cropper(config, SignCropper::default())
    }

    pub fn with_cropper<C: Crop + 'static>(config: DatasetConfig, cropper: C) -> Result<DatasetAssembler> {
        config.validate()?;
        let extractor = FeatureExtractor::with_resizer(
            config.target_rows,
            config.target_cols,
            config.include_alpha_channel,
            ImageOpsResize::new(config.interpolation),
        )?;
        Ok(DatasetAssembler { config, extractor, cropper: Box::new(cropper) })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn assemble(&self, samples: &[LabeledImage]) -> Result<Dataset> {
        if samples.is_empty() {
            return Err(Error::InvalidConfiguration("image list cannot be empty".into()));
        }
        if let Some((i, s)) = samples.iter().enumerate().find(|(_, s)| s.label.index() >= self.config.num_classes) {
            return Err(Error::InvalidConfiguration(format!(
                "sample {i} ({}) has class {} (index {}) but only {} classes are configured",
                s.source.describe(),
                s.label,
                s.label.index(),
                self.config.num_classes
            )));
        }

        let n = samples.len();
        let feature_len = self.extractor.feature_len();
        info!("assembling dataset from {n} images, {feature_len} features per sample");

        let mut inputs = Matrix::zeros(n, feature_len);
        let mut labels = Matrix::zeros(n, self.config.num_classes);

        let skipped: Vec<bool> = inputs.data
            .par_iter_mut()
            .zip(labels.data.par_iter_mut())
            .enumerate()
            .map(|(i, (input_row, label_row))| {
                let sample = &samples[i];
                debug!("processing image {} of {n}", i + 1);
                match self.features_for(i, &sample.source) {
                    Ok(features) => {
                        input_row.copy_from_slice(&features);
                        label_row[sample.label.index()] = 1.0;
                        false
                    }
                    Err(reason) => {
                        warn!("skipping sample {i} ({}): {reason}", sample.source.describe());
                        true
                    }
                }
            })
            .collect();

        let excluded: BTreeSet<usize> = skipped.iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
            .collect();

        info!("dataset assembled: {} usable, {} skipped", n - excluded.len(), excluded.len());
        Dataset::new(inputs, labels, excluded)
    }

    /// Load, crop, rescale and flatten one sample.  The error is only
    /// reported, so it is a plain message.
    fn features_for(&self, index: usize, source: &ImageSource) -> std::result::Result<Vec<f64>, String> {
        let image = source.load().map_err(|e| e.to_string())?;
        let cropped = self.cropper.crop(&image).map_err(|e| format!("cropping failed: {e}"))?;
        let features = self.extractor.extract_scaled(&cropped).map_err(|e| e.to_string())?;
        self.check_length(index, features)
    }

    fn check_length(&self, index: usize, features: Vec<f64>) -> std::result::Result<Vec<f64>, String> {
        let expected = self.config.feature_len();
        if features.len() != expected {
            return Err(Error::InconsistentFeatureSize { index, expected, found: features.len() }.to_string());
        }
        Ok(features)
    }
}
