//! # cine-core
//!
//! Core types for decoding motion-picture frame files.
//!
//! This crate provides the foundational types shared by the LUT and I/O crates:
//!
//! - [`PixelType`] - Channel layout x storage type value with byte-count queries
//! - [`ImageInfo`] - Everything a header tells us about one frame
//! - [`Tags`] - Ordered key/value metadata side channel
//! - [`RawFrameBuffer`] - Owned or memory-mapped pixel storage for one frame
//! - [`convert`] - Bit-exact conversion between pixel storage types
//!
//! ## Crate Structure
//!
//! ```text
//! cine-core (this crate)
//!    ^
//!    |
//!    +-- cine-lut (film-print LUT)
//!    +-- cine-io (file reader, header parsers, RLE, frame decoder)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cine_core::{convert, DataType, PixelType};
//!
//! let src = [0u8, 128, 255];
//! let mut dst = [0u8; 6];
//! convert::convert(DataType::U8, &src, DataType::U16, &mut dst, 1, 3, 3).unwrap();
//! assert_eq!(u16::from_ne_bytes([dst[2], dst[3]]), 128 << 8);
//! assert_eq!(PixelType::RGB_U10.bytes_per_pixel(), 6);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod convert;
pub mod error;
pub mod format;
pub mod info;
pub mod tags;

pub use buffer::RawFrameBuffer;
pub use error::{Error, Result};
pub use format::{Channels, DataType, PixelType};
pub use info::{
    ColorProfileKind, DataLayout, Endian, FrameRange, ImageInfo, PixelDataInfo, Size,
};
pub use tags::Tags;
