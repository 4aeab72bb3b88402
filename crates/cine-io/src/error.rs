//! Error types for frame I/O.
//!
//! Every failure a decode request can end in is an [`IoError`]. Callers that
//! only care about the category match on [`IoError::kind`].

use std::io;
use std::path::{Path, PathBuf};

use cine_lut::LutError;
use thiserror::Error;

use crate::decoder::Frame;

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;

/// Category of an [`IoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// File does not exist.
    NotFound,
    /// Permission denied by the OS.
    AccessDenied,
    /// Leading magic number did not match the format.
    BadMagic,
    /// File is shorter than its header declares.
    Truncated,
    /// Header describes a layout the decoder does not handle.
    UnsupportedPixelLayout,
    /// An RLE scanline failed to decode.
    RleDecodeFailure,
    /// A buffer did not match the size its description implies.
    SizeMismatch,
    /// Anything else.
    Other,
}

/// Frame I/O error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Permission denied.
    #[error("access denied: {}", .0.display())]
    AccessDenied(PathBuf),

    /// Untranslated OS error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Magic number matches neither byte order of the format constant.
    #[error("bad {format} magic: 0x{found:08X}")]
    BadMagic {
        /// Format that was expected.
        format: &'static str,
        /// Value found at the start of the file.
        found: u32,
    },

    /// File ends before the data its header declares.
    ///
    /// When the header was parsed, `partial` holds the frame decoded so
    /// far with missing scanlines zeroed.
    #[error("truncated file: expected {expected} bytes, {actual} available")]
    Truncated {
        /// Bytes the header requires.
        expected: u64,
        /// Bytes present.
        actual: u64,
        /// Partially decoded frame.
        partial: Option<Box<Frame>>,
    },

    /// Layout the decoder does not handle.
    #[error("unsupported pixel layout: {0}")]
    UnsupportedPixelLayout(String),

    /// An RLE scanline failed to decode.
    #[error("RLE decode failed: channel {channel}, scanline {scanline}")]
    RleDecodeFailure {
        /// Channel index.
        channel: u32,
        /// Scanline index in file order.
        scanline: u32,
    },

    /// A buffer did not match its description.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Required bytes.
        expected: usize,
        /// Provided bytes.
        actual: usize,
    },

    /// Neither the magic number nor the extension names a known format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// File name pattern could not be resolved.
    #[error("parse error: {0}")]
    Parse(String),

    /// Film-print LUT failure.
    #[error(transparent)]
    Lut(#[from] LutError),
}

impl IoError {
    /// Translates an OS error raised while accessing `path`.
    pub fn from_os(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::AccessDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }

    /// Creates a truncation error without a partial frame.
    pub fn truncated(expected: u64, actual: u64) -> Self {
        Self::Truncated {
            expected,
            actual,
            partial: None,
        }
    }

    /// Creates an unsupported layout error.
    pub fn unsupported_layout(msg: impl Into<String>) -> Self {
        Self::UnsupportedPixelLayout(msg.into())
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::BadMagic { .. } => ErrorKind::BadMagic,
            Self::Truncated { .. } => ErrorKind::Truncated,
            Self::UnsupportedPixelLayout(_) => ErrorKind::UnsupportedPixelLayout,
            Self::RleDecodeFailure { .. } => ErrorKind::RleDecodeFailure,
            Self::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            Self::Lut(LutError::Core(e)) if e.is_size_mismatch() => ErrorKind::SizeMismatch,
            Self::Io(_) | Self::UnsupportedFormat(_) | Self::Parse(_) | Self::Lut(_) => {
                ErrorKind::Other
            }
        }
    }

    /// Returns true for [`ErrorKind::Truncated`].
    pub fn is_truncated(&self) -> bool {
        self.kind() == ErrorKind::Truncated
    }

    /// Returns true for [`ErrorKind::NotFound`].
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Partial frame carried by a truncation error.
    pub fn partial_frame(&self) -> Option<&Frame> {
        match self {
            Self::Truncated { partial, .. } => partial.as_deref(),
            _ => None,
        }
    }

    /// Consumes the error, returning the partial frame of a truncation.
    pub fn into_partial_frame(self) -> Option<Frame> {
        match self {
            Self::Truncated { partial, .. } => partial.map(|f| *f),
            _ => None,
        }
    }
}

impl From<cine_core::Error> for IoError {
    fn from(err: cine_core::Error) -> Self {
        match err {
            cine_core::Error::SizeMismatch { expected, actual } => {
                Self::SizeMismatch { expected, actual }
            }
            cine_core::Error::UnsupportedPixelLayout(msg) => Self::UnsupportedPixelLayout(msg),
            cine_core::Error::InvalidDimensions { width, height } => {
                Self::UnsupportedPixelLayout(format!("invalid dimensions {width}x{height}"))
            }
        }
    }
}
