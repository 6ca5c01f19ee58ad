//! Model input shape auto-detection
//!
//! Exported classifiers declare their input either with a leading batch axis
//! (`[N, H, W, C]`, where `N` is usually symbolic) or without one
//! (`[H, W, C]`). Both resolve to the same spatial (H, W). Anything that
//! cannot be resolved falls back to [`TargetShape::DEFAULT`].

use preprocess::TargetShape;
use thiserror::Error;
use tracing::{info, warn};

/// One dimension as declared by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredDim {
    /// Symbolic or unspecified (e.g. the batch axis)
    Unknown,
    /// Concrete size
    Fixed(usize),
}

/// Recognized input layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayout {
    /// `[batch, height, width, ...]`
    Batched { height: usize, width: usize },
    /// `[height, width, ...]`
    Unbatched { height: usize, width: usize },
}

/// Why a declared shape could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("model declares no input shape")]
    Missing,
    #[error("expected at least 2 spatial dimensions, found {0}")]
    TooFewDimensions(usize),
    #[error("spatial dimensions are not fixed numbers")]
    Symbolic,
    #[error("spatial dimension {0} is not a positive 32-bit size")]
    OutOfRange(usize),
}

/// Where the expected shape came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeSource {
    Declared(InputLayout),
    Default { reason: String },
}

impl InputLayout {
    /// Parse the declared input dimensions
    pub fn parse(dims: &[DeclaredDim]) -> Result<Self, LayoutError> {
        match dims {
            [] => Err(LayoutError::Missing),
            // Symbolic leading axis is always the batch axis
            [DeclaredDim::Unknown, spatial @ ..] => {
                let (height, width) = spatial_pair(spatial)?;
                Ok(InputLayout::Batched { height, width })
            }
            // Batch pinned to one: [1, H, W, C]
            [DeclaredDim::Fixed(1), spatial @ ..] if dims.len() == 4 => {
                let (height, width) = spatial_pair(spatial)?;
                Ok(InputLayout::Batched { height, width })
            }
            spatial => {
                let (height, width) = spatial_pair(spatial)?;
                Ok(InputLayout::Unbatched { height, width })
            }
        }
    }

    pub fn height(&self) -> usize {
        match self {
            InputLayout::Batched { height, .. } | InputLayout::Unbatched { height, .. } => *height,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            InputLayout::Batched { width, .. } | InputLayout::Unbatched { width, .. } => *width,
        }
    }

    /// Convert to a resize target
    pub fn target_shape(&self) -> Result<TargetShape, LayoutError> {
        let height = to_side(self.height())?;
        let width = to_side(self.width())?;
        TargetShape::new(height, width).ok_or(LayoutError::OutOfRange(0))
    }
}

fn spatial_pair(dims: &[DeclaredDim]) -> Result<(usize, usize), LayoutError> {
    match dims {
        [DeclaredDim::Fixed(h), DeclaredDim::Fixed(w), ..] => Ok((*h, *w)),
        [_, _, ..] => Err(LayoutError::Symbolic),
        short => Err(LayoutError::TooFewDimensions(short.len())),
    }
}

fn to_side(size: usize) -> Result<u32, LayoutError> {
    match u32::try_from(size) {
        Ok(side) if side > 0 => Ok(side),
        _ => Err(LayoutError::OutOfRange(size)),
    }
}

/// Resolve the expected input shape, falling back to the default.
///
/// Never fails: a detection problem is logged as a warning.
pub fn detect_shape(dims: &[DeclaredDim]) -> (TargetShape, ShapeSource) {
    let detected = InputLayout::parse(dims).and_then(|layout| Ok((layout.target_shape()?, layout)));

    match detected {
        Ok((shape, layout)) => {
            info!("Model expects images of size {} ({:?})", shape, layout);
            (shape, ShapeSource::Declared(layout))
        }
        Err(e) => {
            warn!(
                "Could not detect input shape from {:?}: {}. Using default {}",
                dims,
                e,
                TargetShape::DEFAULT
            );
            (
                TargetShape::DEFAULT,
                ShapeSource::Default {
                    reason: e.to_string(),
                },
            )
        }
    }
}
