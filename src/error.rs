use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScissorsError {
    #[error("Failed to allocate {what} of {width}x{height}")]
    Allocation {
        what: &'static str,
        width: usize,
        height: usize,
    },

    #[error("Region {x},{y} {width}x{height} lies outside the {image_width}x{image_height} image")]
    RegionOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        image_width: usize,
        image_height: usize,
    },

    #[error("Invalid buffer shape: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Mask is {mask_width}x{mask_height} but the selection is {width}x{height}")]
    MaskSizeMismatch {
        mask_width: usize,
        mask_height: usize,
        width: usize,
        height: usize,
    },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Options serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScissorsError {
    pub(crate) fn allocation(what: &'static str, width: usize, height: usize) -> Self {
        ScissorsError::Allocation { what, width, height }
    }
}

pub type Result<T> = std::result::Result<T, ScissorsError>;

/// Allocate a `width * height` buffer filled with `value`, reporting
/// exhaustion as an error instead of aborting.
pub(crate) fn try_alloc<T: Clone>(
    what: &'static str,
    width: usize,
    height: usize,
    value: T,
) -> Result<Vec<T>> {
    let len = width
        .checked_mul(height)
        .ok_or_else(|| ScissorsError::allocation(what, width, height))?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| ScissorsError::allocation(what, width, height))?;
    buffer.resize(len, value);
    Ok(buffer)
}
