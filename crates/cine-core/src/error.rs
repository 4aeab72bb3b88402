//! Error types for cine-core operations.
//!
//! The [`Error`] enum covers the failure modes of the pixel-level
//! operations in this crate:
//! - buffer size contracts in the conversion engine
//! - pixel layouts the engine cannot produce
//! - frame buffer construction from foreign storage
//!
//! The I/O crate wraps these in its own error type.
//!
//! # Usage
//!
//! ```rust
//! use cine_core::{Error, Result};
//!
//! fn check(len: usize, expected: usize) -> Result<()> {
//!     if len < expected {
//!         return Err(Error::size_mismatch(expected, len));
//!     }
//!     Ok(())
//! }
//! assert!(check(2, 4).unwrap_err().is_size_mismatch());
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by pixel-level operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A buffer is shorter than the operation's contract requires.
    ///
    /// This indicates a caller bug, not bad input data.
    #[error("buffer size mismatch: expected at least {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Bytes required by the contract
        expected: usize,
        /// Bytes actually provided
        actual: usize,
    },

    /// The requested pixel layout cannot be produced or is not supported.
    #[error("unsupported pixel layout: {0}")]
    UnsupportedPixelLayout(String),

    /// Image dimensions are unusable (zero or overflowing).
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },
}

impl Error {
    /// Creates an [`Error::SizeMismatch`] error.
    #[inline]
    pub fn size_mismatch(expected: usize, actual: usize) -> Self {
        Self::SizeMismatch { expected, actual }
    }

    /// Creates an [`Error::UnsupportedPixelLayout`] error.
    #[inline]
    pub fn unsupported_layout(msg: impl Into<String>) -> Self {
        Self::UnsupportedPixelLayout(msg.into())
    }

    /// Returns `true` if this is a buffer size contract violation.
    #[inline]
    pub fn is_size_mismatch(&self) -> bool {
        matches!(self, Self::SizeMismatch { .. })
    }

    /// Returns `true` if this is an unsupported layout error.
    #[inline]
    pub fn is_unsupported_layout(&self) -> bool {
        matches!(self, Self::UnsupportedPixelLayout(_))
    }
}
