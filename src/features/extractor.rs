use log::debug;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::features::image::{ImageOpsResize, RawImage, Resize};
use crate::features::pixel::NormalizedPixel;

/// Turns images into flat feature vectors of fixed length.
///
/// Each image is rescaled to `target_rows × target_cols`, then visited row
/// by row and column by column; every pixel contributes R, G, B and, when
/// `include_alpha` is set, A, all normalized to [0, 1].
#[derive(Debug, Clone)]
pub struct FeatureExtractor<R = ImageOpsResize> {
    target_rows: usize,
    target_cols: usize,
    include_alpha: bool,
    resizer: R,
}

impl FeatureExtractor<ImageOpsResize> {
    pub fn new(target_rows: usize, target_cols: usize, include_alpha: bool) -> Result<Self> {
        FeatureExtractor::with_resizer(target_rows, target_cols, include_alpha, ImageOpsResize::default())
    }
}

impl<R: Resize> FeatureExtractor<R> {
    pub fn with_resizer(
        target_rows: usize,
        target_cols: usize,
        include_alpha: bool,
        resizer: R,
    ) -> Result<Self> {
        if target_rows == 0 || target_cols == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "target dimensions must be positive, got {target_rows}x{target_cols}"
            )));
        }
        Ok(FeatureExtractor { target_rows, target_cols, include_alpha, resizer })
    }

    /// Values emitted per pixel: 4 with alpha, 3 without.
    pub fn channels(&self) -> usize {
        if self.include_alpha { 4 } else { 3 }
    }

    /// Length of every vector this extractor produces.
    pub fn feature_len(&self) -> usize {
        self.target_rows * self.target_cols * self.channels()
    }

    pub fn rescale(&self, image: &RawImage) -> Result<RawImage> {
        self.resizer.resize(image, self.target_rows, self.target_cols)
    }

    /// Flattens an image as it is, without rescaling.  Any malformed pixel
    /// fails the whole image.
    pub fn extract(&self, image: &RawImage) -> Result<Vec<f64>> {
        let mut features = Vec::with_capacity(image.rows * image.cols * self.channels());
        for row in 0..image.rows {
            for col in 0..image.cols {
                let pixel = NormalizedPixel::from_sample(image.pixel(row, col))
                    .map_err(|defect| defect.at(row, col))?;
                features.extend(pixel.channels(self.include_alpha));
            }
        }
        Ok(features)
    }

    /// Rescales, then extracts.
    pub fn extract_scaled(&self, image: &RawImage) -> Result<Vec<f64>> {
        let rescaled = self.rescale(image)?;
        self.extract(&rescaled)
    }

    /// Rescales and extracts every image and checks that all vectors have
    /// the expected length.
    pub fn extract_batch(&self, images: &[RawImage]) -> Result<Vec<Vec<f64>>> {
        let expected = self.feature_len();
        let features: Vec<Vec<f64>> = images
            .par_iter()
            .map(|image| self.extract_scaled(image))
            .collect::<Result<_>>()?;

        if let Some((index, v)) = features.iter().enumerate().find(|(_, v)| v.len() != expected) {
            return Err(Error::InconsistentFeatureSize { index, expected, found: v.len() });
        }
        debug!("extracted {} feature vectors of length {}", features.len(), expected);
        Ok(features)
    }
}
