//! LUT error types.

use cine_core::DataType;
use thiserror::Error;

/// Result type for LUT operations.
pub type LutResult<T> = Result<T, LutError>;

/// Errors that can occur building or applying a LUT.
#[derive(Debug, Error)]
pub enum LutError {
    /// Table bit depth outside 1..=16.
    #[error("invalid LUT bit depth: {0}")]
    InvalidBitDepth(u32),

    /// Parameters that do not define a curve.
    #[error("invalid film-print parameters: {0}")]
    InvalidParams(String),

    /// Requested output storage is not a float type.
    #[error("LUT output must be F16 or F32, got {0}")]
    UnsupportedOutput(DataType),

    /// Pixel-level failure while applying the table.
    #[error(transparent)]
    Core(#[from] cine_core::Error),
}
