pub mod crop;
pub mod extractor;
pub mod image;
pub mod pixel;

pub use crop::{Crop, CropError, NoCrop, SignCropper};
pub use extractor::FeatureExtractor;
pub use self::image::{ImageOpsResize, Interpolation, RawImage, Resize};
pub use pixel::{NormalizedPixel, PixelDefect, PIXEL_CHANNELS};
