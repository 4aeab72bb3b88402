//! # cine-lut
//!
//! Film-print lookup tables for logarithmic Cineon and DPX frames.
//!
//! Film scanners store printing density as 10-bit logarithmic code values.
//! [`FilmPrintLut`] maps every code to linear light using five parameters
//! (black point, white point, gamma, break point, soft clip), and applies
//! the table to decoded frame buffers.
//!
//! # Usage
//!
//! ```rust
//! use cine_lut::{FilmPrintLut, FilmPrintLutCache, FilmPrintParams};
//!
//! let lut = FilmPrintLut::build(FilmPrintParams::default()).unwrap();
//! assert_eq!(lut.value(95), 0.0);
//! assert!((lut.value(685) - 1.0).abs() < 1e-6);
//!
//! // Shared across frames with the same parameters
//! let shared = FilmPrintLutCache::global().get_or_build(FilmPrintParams::default()).unwrap();
//! assert_eq!(shared.len(), 1024);
//! ```
//!
//! # Dependencies
//!
//! - [`cine-core`] - Pixel types, frame buffers, conversion
//! - [`thiserror`] - Error handling
//! - [`tracing`] - Cache diagnostics

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod cache;
mod error;
mod film_print;

pub use cache::FilmPrintLutCache;
pub use error::{LutError, LutResult};
pub use film_print::{linear_to_film_print, FilmPrintLut, FilmPrintParams};
