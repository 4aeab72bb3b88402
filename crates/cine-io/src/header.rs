//! Pieces shared by the header parsers.
//!
//! Cineon and DPX headers are fixed-offset blocks read into memory in one
//! go; [`Fields`] decodes scalars and text at those offsets in the file's
//! byte order. Fields the writer left unset hold sentinel values, which the
//! `valid_*` helpers turn into `None`.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use cine_core::{Endian, ImageInfo, PixelDataInfo, Size};

use crate::rle::RleScanlineTable;
use crate::{IoError, IoResult};

/// Values at or beyond this magnitude are treated as unset.
const LIMIT: f64 = 1_000_000.0;

// === Field access ===

/// Scalar and text fields of an in-memory header block.
///
/// Offsets are compile-time constants inside the block; callers read the
/// whole block before constructing this.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fields<'a> {
    data: &'a [u8],
    endian: Endian,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(data: &'a [u8], endian: Endian) -> Self {
        Self { data, endian }
    }

    pub(crate) fn u8(&self, off: usize) -> u8 {
        self.data[off]
    }

    pub(crate) fn u16(&self, off: usize) -> u16 {
        match self.endian {
            Endian::Msb => BigEndian::read_u16(&self.data[off..]),
            Endian::Lsb => LittleEndian::read_u16(&self.data[off..]),
        }
    }

    pub(crate) fn u32(&self, off: usize) -> u32 {
        match self.endian {
            Endian::Msb => BigEndian::read_u32(&self.data[off..]),
            Endian::Lsb => LittleEndian::read_u32(&self.data[off..]),
        }
    }

    pub(crate) fn i32(&self, off: usize) -> i32 {
        self.u32(off) as i32
    }

    pub(crate) fn f32(&self, off: usize) -> f32 {
        f32::from_bits(self.u32(off))
    }

    /// Text field of `len` bytes, or `None` when unset.
    pub(crate) fn text(&self, off: usize, len: usize) -> Option<String> {
        valid_text(&self.data[off..off + len])
    }
}

// === Sentinels ===

pub(crate) fn valid_u8(v: u8) -> Option<u8> {
    (v != 0xff).then_some(v)
}

pub(crate) fn valid_u16(v: u16) -> Option<u16> {
    (v != 0xffff).then_some(v)
}

pub(crate) fn valid_u32(v: u32) -> Option<u32> {
    (v != 0xffff_ffff && (v as f64) < LIMIT).then_some(v)
}

pub(crate) fn valid_i32(v: i32) -> Option<i32> {
    (v != i32::MIN && (v as f64).abs() < LIMIT).then_some(v)
}

/// `unset` is the bit pattern the format uses for an empty float field.
pub(crate) fn valid_f32(v: f32, unset: u32) -> Option<f32> {
    (v.to_bits() != unset && v.is_finite() && (v as f64).abs() < LIMIT).then_some(v)
}

/// A text field is set when its first byte is non-NUL and every byte up to
/// the first NUL is printable ASCII.
pub(crate) fn valid_text(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text = &bytes[..end];
    if text.is_empty() || !text.iter().all(|b| (32..=126).contains(b)) {
        return None;
    }
    Some(text.iter().map(|&b| b as char).collect())
}

/// Film edge code as `id:type:prefix:count:offset`.
pub(crate) fn keycode(id: u32, kind: u32, prefix: u32, count: u32, offset: u32) -> String {
    format!("{id}:{kind}:{prefix}:{count}:{offset}")
}

/// Orientation code shared by Cineon and DPX: 0 = left to right, top to
/// bottom; 1 flips vertically, 2 horizontally, 3 both. Other values are
/// treated as 0.
pub(crate) fn orientation(code: u32) -> (bool, bool) {
    match code {
        1 => (false, true),
        2 => (true, false),
        3 => (true, true),
        _ => (false, false),
    }
}

// === Parsed header ===

/// How pixel data is stored after the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataEncoding {
    /// Interleaved samples of the header's pixel type, in its layout's byte
    /// order and scanline alignment.
    Interleaved,
    /// One 32-bit word per pixel holding three 10-bit channels.
    PackedRgbU10,
    /// One plane per channel, each `width x height` samples.
    Planar,
    /// SGI run-length encoded scanlines.
    Rle(RleScanlineTable),
    /// Whitespace-separated decimal samples (netpbm plain formats).
    Ascii,
}

impl DataEncoding {
    /// Bytes of one stored scanline unit: a row of a frame, or one channel
    /// of a row for planar data. Zero for variable-length encodings.
    pub fn scanline_bytes(&self, info: &ImageInfo) -> IoResult<usize> {
        let w = info.size.w as usize;
        let bytes = match self {
            Self::Interleaved => {
                let row = PixelDataInfo {
                    size: Size::new(info.size.w, 1),
                    ..info.pixel_data()
                };
                row.checked_data_byte_count()
            }
            Self::PackedRgbU10 => w.checked_mul(4),
            Self::Planar => w.checked_mul(info.pixel_type.bytes_per_channel()),
            Self::Rle(_) | Self::Ascii => Some(0),
        };
        bytes.ok_or_else(|| overflow(info))
    }

    /// Number of scanline units in a frame.
    pub fn scanline_count(&self, info: &ImageInfo) -> IoResult<usize> {
        let h = info.size.h as usize;
        match self {
            Self::Planar => h
                .checked_mul(info.pixel_type.channel_count())
                .ok_or_else(|| overflow(info)),
            _ => Ok(h),
        }
    }

    /// Bytes of stored pixel data, when known from the header alone.
    pub fn data_bytes(&self, info: &ImageInfo) -> IoResult<Option<u64>> {
        match self {
            Self::Rle(_) | Self::Ascii => Ok(None),
            _ => {
                let unit = self.scanline_bytes(info)? as u64;
                let count = self.scanline_count(info)? as u64;
                let total = unit.checked_mul(count).ok_or_else(|| overflow(info))?;
                Ok(Some(total))
            }
        }
    }
}

fn overflow(info: &ImageInfo) -> IoError {
    IoError::unsupported_layout(format!(
        "{}x{} {} frame size overflows",
        info.size.w, info.size.h, info.pixel_type
    ))
}

/// Frame size from 32-bit header fields. Unset fields are rejected.
pub(crate) fn image_size(w: u32, h: u32) -> IoResult<Size> {
    match (valid_u32(w), valid_u32(h)) {
        (Some(w), Some(h)) => Ok(Size::new(w, h)),
        _ => Err(IoError::unsupported_layout(format!(
            "unset image size {w:#x}x{h:#x}"
        ))),
    }
}

/// Header values that refine the film-print LUT parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilmPrintHints {
    /// Display gamma.
    pub gamma: Option<f32>,
    /// Code value of reference black.
    pub black_point: Option<f32>,
    /// Code value of reference white.
    pub white_point: Option<f32>,
    /// Code value where soft clipping starts.
    pub break_point: Option<f32>,
}

/// Result of parsing a frame file header.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHeader {
    /// Frame description in file layout.
    pub info: ImageInfo,
    /// Pixel values are logarithmic film-print codes.
    pub film_print: bool,
    /// Offset of the pixel data.
    pub data_offset: u64,
    /// Storage of the pixel data.
    pub encoding: DataEncoding,
    /// LUT parameter hints.
    pub hints: FilmPrintHints,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cine_core::{PixelType, Size};

    #[test]
    fn test_fields_byte_order() {
        let data = [0x00, 0x00, 0x80, 0x3f, 0x01, 0x02];
        let le = Fields::new(&data, Endian::Lsb);
        assert_eq!(le.f32(0), 1.0);
        assert_eq!(le.u16(4), 0x0201);
        let be = Fields::new(&data, Endian::Msb);
        assert_eq!(be.u16(4), 0x0102);
        assert_eq!(be.u8(5), 2);
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(valid_u8(0xff), None);
        assert_eq!(valid_u8(3), Some(3));
        assert_eq!(valid_u16(0xffff), None);
        assert_eq!(valid_u32(0xffff_ffff), None);
        assert_eq!(valid_u32(1_000_000), None);
        assert_eq!(valid_u32(999_999), Some(999_999));
        assert_eq!(valid_i32(i32::MIN), None);
        assert_eq!(valid_i32(-1_000_000), None);
        assert_eq!(valid_i32(-12), Some(-12));
        assert_eq!(valid_f32(f32::from_bits(0x7f80_0000), 0x7f80_0000), None);
        assert_eq!(valid_f32(f32::from_bits(0xffff_ffff), 0xffff_ffff), None);
        assert_eq!(valid_f32(2.0e6, 0xffff_ffff), None);
        assert_eq!(valid_f32(2.2, 0x7f80_0000), Some(2.2));
        assert_eq!(valid_f32(0.0, 0x7f80_0000), Some(0.0));
    }

    #[test]
    fn test_text() {
        assert_eq!(valid_text(b"scan 01\0\0\0"), Some("scan 01".to_string()));
        assert_eq!(valid_text(b"full"), Some("full".to_string()));
        assert_eq!(valid_text(b"\0abc"), None);
        assert_eq!(valid_text(&[0xff; 4]), None);
        assert_eq!(valid_text(b"ab\x07c"), None);
    }

    #[test]
    fn test_orientation() {
        assert_eq!(orientation(0), (false, false));
        assert_eq!(orientation(1), (false, true));
        assert_eq!(orientation(2), (true, false));
        assert_eq!(orientation(3), (true, true));
        assert_eq!(orientation(7), (false, false));
    }

    #[test]
    fn test_data_bytes() {
        let info = ImageInfo::new("a", Size::new(4, 3), PixelType::RGB_U10);
        assert_eq!(DataEncoding::PackedRgbU10.data_bytes(&info).unwrap(), Some(48));
        assert_eq!(DataEncoding::Interleaved.data_bytes(&info).unwrap(), Some(72));

        let info = ImageInfo::new("a", Size::new(4, 3), PixelType::RGBA_U8);
        assert_eq!(DataEncoding::Planar.scanline_count(&info).unwrap(), 12);
        assert_eq!(DataEncoding::Planar.data_bytes(&info).unwrap(), Some(48));
        assert_eq!(DataEncoding::Ascii.data_bytes(&info).unwrap(), None);
    }

    #[test]
    fn test_data_bytes_aligned_rows() {
        let mut info = ImageInfo::new("a", Size::new(3, 2), PixelType::RGB_U8);
        info.layout.alignment = 4;
        assert_eq!(DataEncoding::Interleaved.scanline_bytes(&info).unwrap(), 12);
        assert_eq!(DataEncoding::Interleaved.data_bytes(&info).unwrap(), Some(24));
    }

    #[test]
    fn test_data_bytes_overflow() {
        let info = ImageInfo::new("a", Size::new(u32::MAX, u32::MAX), PixelType::RGBA_F32);
        let err = DataEncoding::Interleaved.data_bytes(&info).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedPixelLayout);
        assert!(DataEncoding::PackedRgbU10.data_bytes(&info).is_err());
    }

    #[test]
    fn test_image_size() {
        assert_eq!(image_size(2048, 1556).unwrap(), Size::new(2048, 1556));
        for (w, h) in [(0xffff_ffff, 4), (4, 0xffff_ffff), (0xffff_fffe, 0xffff_fffe)] {
            let err = image_size(w, h).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::UnsupportedPixelLayout);
        }
    }
}
