use thiserror::Error;

/// Every fatal failure the pipeline can surface to a caller.
///
/// Per-sample crop and extraction failures during dataset assembly are not
/// represented here; the assembler logs and skips them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid pixel at ({row}, {col}): {reason}")]
    InvalidPixel {
        row: usize,
        col: usize,
        reason: String,
    },

    #[error("inconsistent feature size for image {index}: expected {expected} values, found {found}")]
    InconsistentFeatureSize {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid dataset configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid model configuration: {0}")]
    InvalidModelConfiguration(String),

    #[error("activation steepness must be strictly positive and finite, got {0}")]
    InvalidActivationParameter(f64),

    #[error("non-finite value in layer {layer} during epoch {epoch}")]
    NumericFault { epoch: usize, layer: usize },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
