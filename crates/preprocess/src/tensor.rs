//! Pixel tensors in channels-last layout

use ndarray::Array3;

use crate::PixelImage;

/// Number of color channels fed to the model
pub const CHANNELS: usize = 3;

/// Normalized image tensor of shape (height, width, 3), values in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct PixelTensor {
    data: Array3<f32>,
}

impl PixelTensor {
    /// Tensor shape as (height, width, channels)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    /// Value at row `y`, column `x`, channel `c`
    pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f32> {
        self.data.get((y, x, c)).copied()
    }

    pub fn into_array(self) -> Array3<f32> {
        self.data
    }
}

/// Scale 8-bit channel values to [0, 1] by dividing by 255.
///
/// No mean subtraction or per-channel standardization is applied.
pub fn normalize(image: &PixelImage) -> PixelTensor {
    let (width, height) = image.dimensions();
    let data = Array3::from_shape_fn(
        (height as usize, width as usize, CHANNELS),
        |(y, x, c)| f32::from(image.get_pixel(x as u32, y as u32)[c]) / 255.0,
    );
    PixelTensor { data }
}
