//! Raster image decoding

use image::{ImageError, RgbImage};
use tracing::debug;

use crate::PreprocessError;

/// Decoded 8-bit RGB image of arbitrary size
pub type PixelImage = RgbImage;

/// Decode raw image bytes into a 3-channel RGB image.
///
/// The container format is guessed from the leading bytes. Alpha is dropped
/// and embedded color profiles are ignored.
pub fn decode(raw: &[u8]) -> Result<PixelImage, PreprocessError> {
    if raw.is_empty() {
        return Err(PreprocessError::EmptyInput);
    }

    let format = image::guess_format(raw).ok();
    let decoded = image::load_from_memory(raw).map_err(classify_decode_error)?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(PreprocessError::UnsupportedImageFormat(
            "image has no pixels".to_string(),
        ));
    }

    debug!(
        "Decoded {:?} image: {}x{} ({:?})",
        format,
        decoded.width(),
        decoded.height(),
        decoded.color()
    );

    Ok(decoded.to_rgb8())
}

fn classify_decode_error(err: ImageError) -> PreprocessError {
    match err {
        ImageError::Unsupported(e) => PreprocessError::UnsupportedImageFormat(e.to_string()),
        ImageError::Decoding(e) => PreprocessError::UnsupportedImageFormat(e.to_string()),
        // Reading from memory only fails on truncated data
        ImageError::IoError(e) => PreprocessError::UnsupportedImageFormat(e.to_string()),
        ImageError::Limits(e) => PreprocessError::ImageTooLarge(e.to_string()),
        other => PreprocessError::Decode(other.to_string()),
    }
}
