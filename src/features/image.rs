use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba};
use log::trace;
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// A decoded image as a grid of channel samples in [0, 255].
///
/// Samples are stored row-major with channels interleaved.  Nothing forces
/// `data` to hold exactly `rows * cols * channels` values: a truncated
/// buffer shows up as a partial or missing pixel in [`RawImage::pixel`] and
/// is rejected by the pixel normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub rows: usize,
    pub cols: usize,
    pub channels: usize,
    pub data: Vec<f64>,
}

impl RawImage {
    pub fn new(rows: usize, cols: usize, channels: usize, data: Vec<f64>) -> RawImage {
        RawImage { rows, cols, channels, data }
    }

    /// Builds an image from a row list of pixel samples.  All pixels must
    /// share one channel count and all rows one width.
    pub fn from_pixels(pixels: &[Vec<Vec<f64>>]) -> RawImage {
        let rows = pixels.len();
        let cols = pixels.first().map_or(0, Vec::len);
        let channels = pixels.first().and_then(|r| r.first()).map_or(0, Vec::len);
        let data = pixels.iter().flatten().flatten().copied().collect();
        RawImage { rows, cols, channels, data }
    }

    /// Always yields 4 channels (RGBA), whatever the source colour type.
    pub fn from_dynamic(image: &DynamicImage) -> RawImage {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        RawImage {
            rows: height as usize,
            cols: width as usize,
            channels: 4,
            data: rgba.into_raw().into_iter().map(f64::from).collect(),
        }
    }

    /// Decodes an image file (PNG/JPEG/BMP/GIF) into RGBA samples.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<RawImage> {
        let decoded = image::open(path.as_ref())?;
        Ok(RawImage::from_dynamic(&decoded))
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// The samples of one pixel, possibly shorter than `channels` when the
    /// buffer is truncated; `None` when out of range or entirely missing.
    pub fn pixel(&self, row: usize, col: usize) -> Option<&[f64]> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let start = (row * self.cols + col) * self.channels;
        let end = (start + self.channels).min(self.data.len());
        if start >= end {
            return None;
        }
        Some(&self.data[start..end])
    }
}

/// Interpolation used when rescaling.  Training and inference must use the
/// same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<Interpolation> for FilterType {
    fn from(i: Interpolation) -> FilterType {
        match i {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Triangle => FilterType::Triangle,
            Interpolation::CatmullRom => FilterType::CatmullRom,
            Interpolation::Gaussian => FilterType::Gaussian,
            Interpolation::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Resize primitive: returns an image of exactly `rows × cols`.
pub trait Resize: Send + Sync {
    fn resize(&self, image: &RawImage, rows: usize, cols: usize) -> Result<RawImage>;
}

/// Resizes through `image::imageops`.
///
/// Images with 1 to 4 channels are interpolated; an empty image or an
/// unsupported channel count is returned unchanged so that the feature
/// length check downstream rejects it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageOpsResize {
    pub interpolation: Interpolation,
}

impl ImageOpsResize {
    pub fn new(interpolation: Interpolation) -> ImageOpsResize {
        ImageOpsResize { interpolation }
    }
}

impl Resize for ImageOpsResize {
    fn resize(&self, image: &RawImage, rows: usize, cols: usize) -> Result<RawImage> {
        if image.rows == rows && image.cols == cols {
            return Ok(image.clone());
        }
        if image.is_empty() {
            trace!("not resizing empty {}x{} image", image.rows, image.cols);
            return Ok(image.clone());
        }
        let filter = FilterType::from(self.interpolation);
        match image.channels {
            1 => resize_as::<Luma<f32>>(image, rows, cols, filter),
            2 => resize_as::<LumaA<f32>>(image, rows, cols, filter),
            3 => resize_as::<Rgb<f32>>(image, rows, cols, filter),
            4 => resize_as::<Rgba<f32>>(image, rows, cols, filter),
            n => {
                trace!("not resizing image with {n} channels");
                Ok(image.clone())
            }
        }
    }
}

/// Float buffers in `image` are expected in [0, 1], so samples are scaled
/// down before interpolation and back up afterwards.
fn resize_as<P>(image: &RawImage, rows: usize, cols: usize, filter: FilterType) -> Result<RawImage>
where
    P: Pixel<Subpixel = f32> + 'static,
{
    let samples: Vec<f32> = image.data.iter().map(|&v| (v / 255.0) as f32).collect();
    let buffer: ImageBuffer<P, Vec<f32>> =
        ImageBuffer::from_raw(image.cols as u32, image.rows as u32, samples).ok_or_else(|| {
            let complete = image.data.len() / image.channels;
            Error::InvalidPixel {
                row: complete / image.cols,
                col: complete % image.cols,
                reason: "image buffer is shorter than its dimensions".into(),
            }
        })?;
    let resized = imageops::resize(&buffer, cols as u32, rows as u32, filter);
    let data = resized.into_raw().into_iter().map(|v| f64::from(v) * 255.0).collect();
    Ok(RawImage::new(rows, cols, image.channels, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_reports_truncation() {
        let img = RawImage::new(1, 2, 4, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(img.pixel(0, 0), Some(&[1.0, 2.0, 3.0, 4.0][..]));
        assert_eq!(img.pixel(0, 1), Some(&[5.0, 6.0][..]));
        assert_eq!(img.pixel(1, 0), None);
    }

    #[test]
    fn resize_hits_exact_target_dimensions() {
        let img = RawImage::new(5, 7, 4, vec![128.0; 5 * 7 * 4]);
        let out = ImageOpsResize::default().resize(&img, 2, 3).unwrap();
        assert_eq!((out.rows, out.cols, out.channels), (2, 3, 4));
        assert_eq!(out.data.len(), 2 * 3 * 4);
        for v in &out.data {
            assert!((v - 128.0).abs() < 1e-3);
        }
    }

    #[test]
    fn empty_image_is_left_alone() {
        let img = RawImage::new(0, 0, 4, vec![]);
        let out = ImageOpsResize::default().resize(&img, 2, 2).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn dynamic_images_become_rgba() {
        let rgb = image::RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let raw = RawImage::from_dynamic(&DynamicImage::ImageRgb8(rgb));
        assert_eq!((raw.rows, raw.cols, raw.channels), (2, 3, 4));
        assert_eq!(raw.pixel(1, 2), Some(&[10.0, 20.0, 30.0, 255.0][..]));
    }
}
