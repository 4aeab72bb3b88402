//! # cine-io
//!
//! Frame I/O for motion-picture pipelines.
//!
//! This crate decodes single frames of the file formats used for film
//! scanning and compositing:
//!
//! - **Cineon** - Kodak 10-bit log film scans
//! - **DPX** - SMPTE 268M, 8/10/16/32-bit, either byte order
//! - **SGI** - raw or run-length encoded planar images
//! - **PPM** - netpbm graymaps and pixmaps, binary and plain
//!
//! # Architecture
//!
//! - [`FileIo`] - file handle with memory-mapped and buffered reads
//! - [`Format`] - format detection by magic bytes, then extension
//! - [`FrameHeader`] - what a header parser reports about a frame
//! - [`rle`] - SGI scanline decompression
//! - [`FrameDecoder`] - the full pipeline, from path to [`Frame`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cine_io::read;
//!
//! // Frame 1001 at half resolution
//! let frame = read("scans/shot.####.cin", Some(1001), 1)?;
//! ```
//!
//! Film-print frames are converted to linear floating point through a
//! cached LUT unless [`FilmPrintMode::Off`] is requested:
//!
//! ```rust,ignore
//! use cine_io::{FilmPrintMode, FrameDecoder, ReadOptions};
//!
//! let options = ReadOptions::default().with_film_print(FilmPrintMode::Off);
//! let frame = FrameDecoder::new(options).read("scan.0001.dpx", None, 0)?;
//! ```
//!
//! # Supported Formats
//!
//! | Format | Bit Depths | Layouts | Notes |
//! |--------|------------|---------|-------|
//! | Cineon | 10 | RGB packed | Film print, film metadata |
//! | DPX | 8, 10, 16, 32 | L, RGB, RGBA | Film/TV metadata, timecode |
//! | SGI | 8, 16 | 1-4 channels, planar | RLE |
//! | PPM | 8, 16 | L, RGB | Plain and binary |
//!
//! # Dependencies
//!
//! - [`cine-core`] - pixel types and conversion
//! - [`cine-lut`] - film-print LUT
//! - [`memmap2`] - memory-mapped fast path
//! - [`byteorder`] - endian-aware header fields
//!
//! # Feature Flags
//!
//! - `cineon` - Cineon support (default)
//! - `dpx` - DPX support (default)
//! - `sgi` - SGI support (default)
//! - `ppm` - PPM support (default)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod detect;
mod error;
pub mod decoder;
pub mod file_io;
pub mod header;
pub mod rle;
pub mod sequence;

#[cfg(feature = "cineon")]
pub mod cineon;

#[cfg(feature = "dpx")]
pub mod dpx;

#[cfg(feature = "sgi")]
pub mod sgi;

#[cfg(feature = "ppm")]
pub mod ppm;

pub use decoder::{DecodeState, FilmPrintMode, Frame, FrameDecoder, ReadOptions};
pub use detect::Format;
pub use error::{ErrorKind, IoError, IoResult};
pub use file_io::{FileIo, MmapMode};
pub use header::{DataEncoding, FilmPrintHints, FrameHeader};

use std::path::Path;

/// Decodes one frame with default options.
///
/// `frame` replaces the frame number in `path`; `proxy` reduces the
/// resolution by `2^proxy`.
///
/// # Example
///
/// ```rust,ignore
/// let frame = cine_io::read("plate.0001.dpx", None, 0)?;
/// assert_eq!(frame.buffer.data_byte_count(), frame.info.data_byte_count());
/// ```
pub fn read<P: AsRef<Path>>(path: P, frame: Option<i64>, proxy: u32) -> IoResult<Frame> {
    FrameDecoder::new(ReadOptions::default()).read(path, frame, proxy)
}

/// Parses the header of a frame file without reading pixel data.
pub fn read_header<P: AsRef<Path>>(path: P) -> IoResult<FrameHeader> {
    let mut io = FileIo::open(path, MmapMode::Never)?;
    let format = Format::detect(&mut io)?;
    format.load(&mut io)
}
