//! Geometric normalization to the model input shape

use image::imageops::{self, FilterType};
use tracing::debug;

use crate::PixelImage;

/// Resampling filter used for every request (bilinear).
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Spatial input shape (height x width) expected by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetShape {
    height: u32,
    width: u32,
}

impl TargetShape {
    /// Shape used when the model does not declare a usable one
    pub const DEFAULT: TargetShape = TargetShape {
        height: 128,
        width: 128,
    };

    /// Create a shape; both sides must be positive
    pub fn new(height: u32, width: u32) -> Option<Self> {
        if height == 0 || width == 0 {
            return None;
        }
        Some(Self { height, width })
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}

impl Default for TargetShape {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for TargetShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// Resample an image to exactly `target`.
///
/// Aspect ratio is not preserved: the image is stretched or squashed to fit.
pub fn resize(image: &PixelImage, target: TargetShape) -> PixelImage {
    let resized = imageops::resize(image, target.width, target.height, RESIZE_FILTER);
    debug!(
        "Resized {}x{} -> {}x{}",
        image.width(),
        image.height(),
        resized.width(),
        resized.height()
    );
    resized
}
