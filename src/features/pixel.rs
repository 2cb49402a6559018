use thiserror::Error;

use crate::error::Error as CrateError;

/// Channel count every pixel must carry: red, green, blue, alpha.
pub const PIXEL_CHANNELS: usize = 4;

const CHANNEL_MAX: f64 = 255.0;

/// Why a raw pixel sample could not be normalized.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PixelDefect {
    #[error("pixel is missing")]
    Missing,
    #[error("pixel has {0} channels, expected 4")]
    ChannelCount(usize),
    #[error("channel {0} is not a finite number")]
    NonFinite(usize),
}

impl PixelDefect {
    /// Attaches the pixel position.
    pub fn at(self, row: usize, col: usize) -> CrateError {
        CrateError::InvalidPixel { row, col, reason: self.to_string() }
    }
}

/// One RGBA pixel with every channel divided by 255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPixel {
    red: f64,
    green: f64,
    blue: f64,
    alpha: f64,
}

impl NormalizedPixel {
    /// Normalizes a raw 4-channel sample.  Absent or partial samples are
    /// rejected rather than zero-filled.
    pub fn from_sample(sample: Option<&[f64]>) -> Result<NormalizedPixel, PixelDefect> {
        let sample = sample.ok_or(PixelDefect::Missing)?;
        if sample.len() != PIXEL_CHANNELS {
            return Err(PixelDefect::ChannelCount(sample.len()));
        }
        if let Some(bad) = sample.iter().position(|v| !v.is_finite()) {
            return Err(PixelDefect::NonFinite(bad));
        }
        Ok(NormalizedPixel {
            red: sample[0] / CHANNEL_MAX,
            green: sample[1] / CHANNEL_MAX,
            blue: sample[2] / CHANNEL_MAX,
            alpha: sample[3] / CHANNEL_MAX,
        })
    }

    pub fn red(&self) -> f64 {
        self.red
    }

    pub fn green(&self) -> f64 {
        self.green
    }

    pub fn blue(&self) -> f64 {
        self.blue
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Channels in feature order: R, G, B and, if requested, A.
    pub fn channels(&self, include_alpha: bool) -> impl Iterator<Item = f64> {
        let values = [self.red, self.green, self.blue, self.alpha];
        let len = if include_alpha { 4 } else { 3 };
        values.into_iter().take(len)
    }
}
