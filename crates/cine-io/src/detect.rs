//! Format detection.
//!
//! Detects frame formats from magic bytes, falling back to the file
//! extension, and dispatches header parsing to the matching module.

use std::path::Path;

use crate::file_io::FileIo;
use crate::header::FrameHeader;
use crate::{IoError, IoResult};

/// Supported frame formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Kodak Cineon.
    Cineon,
    /// SMPTE DPX.
    Dpx,
    /// SGI image.
    Sgi,
    /// Netpbm PGM/PPM.
    Ppm,
}

impl Format {
    /// All formats.
    pub const ALL: [Format; 4] = [Format::Cineon, Format::Dpx, Format::Sgi, Format::Ppm];

    /// Detects the format of an open file.
    ///
    /// Checks magic bytes first, then the extension of the file's path.
    pub fn detect(io: &mut FileIo) -> IoResult<Self> {
        let mut magic = [0u8; 4];
        io.set_pos(0)?;
        let n = io.read_available(&mut magic)?;
        io.set_pos(0)?;
        Self::from_bytes(&magic[..n])
            .or_else(|| Self::from_extension(io.path()))
            .ok_or_else(|| {
                IoError::UnsupportedFormat(
                    io.path()
                        .extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or("unknown")
                        .to_string(),
                )
            })
    }

    /// Detects format from file extension only.
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())?;
        Self::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
    }

    /// Detects format from the leading bytes of a file.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            // Cineon: 0x802A5FD7 in either byte order
            [0x80, 0x2a, 0x5f, 0xd7, ..] | [0xd7, 0x5f, 0x2a, 0x80, ..] => Some(Format::Cineon),
            // DPX: "SDPX" big-endian, "XPDS" little-endian
            [b'S', b'D', b'P', b'X', ..] | [b'X', b'P', b'D', b'S', ..] => Some(Format::Dpx),
            // SGI: 474 big-endian
            [0x01, 0xda, ..] => Some(Format::Sgi),
            [b'P', b'2' | b'3' | b'5' | b'6', ..] => Some(Format::Ppm),
            _ => None,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Format::Cineon => "Cineon",
            Format::Dpx => "DPX",
            Format::Sgi => "SGI",
            Format::Ppm => "PPM",
        }
    }

    /// Recognized file extensions, lower case.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Format::Cineon => &["cin"],
            Format::Dpx => &["dpx"],
            Format::Sgi => &["sgi", "rgb", "rgba", "bw"],
            Format::Ppm => &["ppm", "pgm", "pnm"],
        }
    }

    /// Whether support for this format was compiled in.
    pub fn is_enabled(self) -> bool {
        match self {
            Format::Cineon => cfg!(feature = "cineon"),
            Format::Dpx => cfg!(feature = "dpx"),
            Format::Sgi => cfg!(feature = "sgi"),
            Format::Ppm => cfg!(feature = "ppm"),
        }
    }

    /// Parses the header of `io` as this format.
    pub fn load(self, io: &mut FileIo) -> IoResult<FrameHeader> {
        match self {
            #[cfg(feature = "cineon")]
            Format::Cineon => crate::cineon::load(io),
            #[cfg(feature = "dpx")]
            Format::Dpx => crate::dpx::load(io),
            #[cfg(feature = "sgi")]
            Format::Sgi => crate::sgi::load(io),
            #[cfg(feature = "ppm")]
            Format::Ppm => crate::ppm::load(io),
            #[allow(unreachable_patterns)]
            other => Err(IoError::UnsupportedFormat(format!(
                "{} support is disabled",
                other.name()
            ))),
        }
    }
}
