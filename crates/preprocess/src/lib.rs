//! Image Preprocessing
//!
//! Turns uploaded image bytes into the tensor layout the classifier expects:
//! - Decode any supported raster format to 8-bit RGB
//! - Resize (stretch, no crop or pad) to the model's input shape
//! - Scale channel values to [0, 1]

pub mod decode;
pub mod resize;
pub mod tensor;

pub use decode::{decode, PixelImage};
pub use resize::{resize, TargetShape, RESIZE_FILTER};
pub use tensor::{normalize, PixelTensor, CHANNELS};

use thiserror::Error;

/// Preprocessing error types
#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Empty input: no image bytes supplied")]
    EmptyInput,

    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("Image exceeds decoder limits: {0}")]
    ImageTooLarge(String),

    #[error("Image decoding failed: {0}")]
    Decode(String),
}
