//! Pixel storage types.
//!
//! # Types
//!
//! - [`Channels`] - Channel layout (L, LA, RGB, RGBA)
//! - [`DataType`] - Per-channel storage (U8, U10, U16, U32, F16, F32)
//! - [`PixelType`] - The pair of the two, with byte-count queries
//!
//! # Usage
//!
//! ```rust
//! use cine_core::format::{Channels, DataType, PixelType};
//!
//! // Cineon and 10-bit DPX decode to RGB_U10, one u16 per channel
//! let pt = PixelType::RGB_U10;
//! assert_eq!(pt.bytes_per_channel(), 2);
//! assert_eq!(pt.bytes_per_pixel(), 6);
//!
//! // SGI: channel count plus bit depth
//! assert_eq!(PixelType::from_int(4, 8), Some(PixelType::RGBA_U8));
//! ```

use std::fmt;

/// Channel layout of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channels {
    /// Luminance.
    L,
    /// Luminance + alpha.
    La,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
}

impl Channels {
    /// Number of channels, 1..=4.
    #[inline]
    pub const fn count(self) -> usize {
        match self {
            Self::L => 1,
            Self::La => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Channel layout for a channel count.
    #[inline]
    pub const fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(Self::L),
            2 => Some(Self::La),
            3 => Some(Self::Rgb),
            4 => Some(Self::Rgba),
            _ => None,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::L => "L",
            Self::La => "LA",
            Self::Rgb => "RGB",
            Self::Rgba => "RGBA",
        }
    }
}

/// Storage type of a single channel.
///
/// Integer formats:
/// - `U8` - [0, 255]
/// - `U10` - [0, 1023], stored in the low bits of a `u16`
/// - `U16` - [0, 65535]
/// - `U32` - [0, 4294967295]
///
/// Floating-point formats:
/// - `F16` - IEEE 754 half
/// - `F32` - IEEE 754 single
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 8-bit unsigned integer.
    U8,
    /// 10-bit unsigned integer (Cineon, DPX).
    U10,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit single-precision float.
    F32,
}

impl DataType {
    /// All storage types, integer first.
    pub const ALL: [DataType; 6] = [
        Self::U8,
        Self::U10,
        Self::U16,
        Self::U32,
        Self::F16,
        Self::F32,
    ];

    /// Significant bits per channel.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U10 => 10,
            Self::U16 | Self::F16 => 16,
            Self::U32 | Self::F32 => 32,
        }
    }

    /// Bytes of storage per channel. U10 occupies a full `u16`.
    #[inline]
    pub const fn bytes_per_channel(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U10 | Self::U16 | Self::F16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }

    /// Whether this is a floating-point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }

    /// Maximum integer code value. Floats report 1.0 as their nominal white,
    /// so this returns 1 for them.
    #[inline]
    pub const fn max_value(self) -> u32 {
        match self {
            Self::U8 => 0xff,
            Self::U10 => 0x3ff,
            Self::U16 => 0xffff,
            Self::U32 => u32::MAX,
            Self::F16 | Self::F32 => 1,
        }
    }

    /// Integer type for a bit depth.
    #[inline]
    pub const fn from_int_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::U8),
            10 => Some(Self::U10),
            16 => Some(Self::U16),
            32 => Some(Self::U32),
            _ => None,
        }
    }

    /// Float type for a bit depth.
    #[inline]
    pub const fn from_float_bits(bits: u32) -> Option<Self> {
        match bits {
            16 => Some(Self::F16),
            32 => Some(Self::F32),
            _ => None,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::U8 => "U8",
            Self::U10 => "U10",
            Self::U16 => "U16",
            Self::U32 => "U32",
            Self::F16 => "F16",
            Self::F32 => "F32",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A channel layout paired with a storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelType {
    /// Channel layout.
    pub channels: Channels,
    /// Per-channel storage.
    pub data_type: DataType,
}

macro_rules! pixel_consts {
    ($($name:ident = $ch:ident, $dt:ident;)*) => {
        $(
            #[allow(missing_docs)]
            pub const $name: PixelType = PixelType::new(Channels::$ch, DataType::$dt);
        )*
    };
}

impl PixelType {
    pixel_consts! {
        L_U8 = L, U8;
        L_U10 = L, U10;
        L_U16 = L, U16;
        L_U32 = L, U32;
        L_F16 = L, F16;
        L_F32 = L, F32;
        LA_U8 = La, U8;
        LA_U16 = La, U16;
        LA_F32 = La, F32;
        RGB_U8 = Rgb, U8;
        RGB_U10 = Rgb, U10;
        RGB_U16 = Rgb, U16;
        RGB_U32 = Rgb, U32;
        RGB_F16 = Rgb, F16;
        RGB_F32 = Rgb, F32;
        RGBA_U8 = Rgba, U8;
        RGBA_U16 = Rgba, U16;
        RGBA_U32 = Rgba, U32;
        RGBA_F16 = Rgba, F16;
        RGBA_F32 = Rgba, F32;
    }

    /// Creates a pixel type.
    #[inline]
    pub const fn new(channels: Channels, data_type: DataType) -> Self {
        Self {
            channels,
            data_type,
        }
    }

    /// Integer pixel type from a channel count and bit depth.
    ///
    /// Returns `None` for unsupported combinations.
    pub const fn from_int(channel_count: usize, bits: u32) -> Option<Self> {
        match (Channels::from_count(channel_count), DataType::from_int_bits(bits)) {
            (Some(c), Some(d)) => Some(Self::new(c, d)),
            _ => None,
        }
    }

    /// Float pixel type from a channel count and bit depth.
    pub const fn from_float(channel_count: usize, bits: u32) -> Option<Self> {
        match (Channels::from_count(channel_count), DataType::from_float_bits(bits)) {
            (Some(c), Some(d)) => Some(Self::new(c, d)),
            _ => None,
        }
    }

    /// Same channels, different storage.
    #[inline]
    pub const fn with_data_type(self, data_type: DataType) -> Self {
        Self::new(self.channels, data_type)
    }

    /// Number of channels.
    #[inline]
    pub const fn channel_count(self) -> usize {
        self.channels.count()
    }

    /// Bytes per channel.
    #[inline]
    pub const fn bytes_per_channel(self) -> usize {
        self.data_type.bytes_per_channel()
    }

    /// Bytes per pixel: channels x bytes per channel.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        self.channels.count() * self.data_type.bytes_per_channel()
    }

    /// Whether the storage is floating point.
    #[inline]
    pub const fn is_float(self) -> bool {
        self.data_type.is_float()
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.channels.label(), self.data_type.label())
    }
}
