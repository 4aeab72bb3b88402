//! Pixel storage conversion.
//!
//! Bit-exact conversion between every pair of [`DataType`]s, plus the
//! buffer shuffles the decoders need:
//!
//! - [`convert`] - bulk type conversion with channel extraction
//! - [`extract`] - keep the first N channels of each pixel
//! - [`planar_interleave`] / [`planar_deinterleave`] - planes to pixels and back
//! - [`swap_endian`] - in-place byte swap of 16/32-bit words
//! - [`unpack_rgb_u10`] - three 10-bit channels packed in a 32-bit word
//! - [`convert_image`] - whole-frame conversion with proxy decimation
//!
//! # Scalar rules
//!
//! | From | To | Rule |
//! |------|----|------|
//! | int | wider int | shift left by the bit difference |
//! | int | narrower int | shift right by the bit difference (truncates) |
//! | int | float | divide by the source maximum |
//! | float | int | multiply by the destination maximum, clamp, round to nearest |
//! | float | float | value copy (F16 rounds to nearest) |
//!
//! All bulk functions take native-endian byte slices unless an [`Endian`]
//! is passed explicitly. A slice shorter than the sample counts imply is a
//! caller bug and returns [`Error::SizeMismatch`].
//!
//! # Example
//!
//! ```rust
//! use cine_core::convert::{convert, Sample};
//! use cine_core::DataType;
//!
//! assert_eq!(Sample::Int(1023).convert(DataType::U10, DataType::U16), Sample::Int(0xffc0));
//! assert_eq!(Sample::Float(2.0).convert(DataType::F32, DataType::U8), Sample::Int(255));
//!
//! // RGBA_U8 -> L_F32: keeps the first channel only
//! let src = [255u8, 0, 0, 255];
//! let mut dst = [0u8; 4];
//! convert(DataType::U8, &src, DataType::F32, &mut dst, 1, 4, 1).unwrap();
//! assert_eq!(f32::from_ne_bytes(dst), 1.0);
//! ```

use half::f16;

use crate::error::{Error, Result};
use crate::format::DataType;
use crate::info::{Endian, PixelDataInfo, Size};

// ============================================================================
// Scalar conversion
// ============================================================================

/// One channel value, tagged by integer or float domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// Integer code value.
    Int(u32),
    /// Float value, nominal range [0, 1].
    Float(f32),
}

impl Sample {
    /// Converts a value stored as `from` into the domain of `to`.
    #[inline]
    pub fn convert(self, from: DataType, to: DataType) -> Sample {
        match (self, to.is_float()) {
            (Sample::Int(v), false) => Sample::Int(int_to_int(v, from.bits(), to.bits())),
            (Sample::Int(v), true) => Sample::Float(int_to_float(v, from)),
            (Sample::Float(f), false) => Sample::Int(float_to_int(f, to)),
            (Sample::Float(f), true) => Sample::Float(f),
        }
    }

    /// Value as a float, without normalization for integers.
    #[inline]
    pub fn as_f32(self) -> f32 {
        match self {
            Sample::Int(v) => v as f32,
            Sample::Float(f) => f,
        }
    }
}

/// Integer to integer by shifting.
#[inline]
pub fn int_to_int(v: u32, src_bits: u32, dst_bits: u32) -> u32 {
    if dst_bits >= src_bits {
        v << (dst_bits - src_bits)
    } else {
        v >> (src_bits - dst_bits)
    }
}

/// Integer code to normalized float.
#[inline]
pub fn int_to_float(v: u32, src: DataType) -> f32 {
    (v as f64 / src.max_value() as f64) as f32
}

/// Normalized float to integer code: scale, clamp, round to nearest.
///
/// NaN maps to zero.
#[inline]
pub fn float_to_int(f: f32, dst: DataType) -> u32 {
    if f.is_nan() {
        return 0;
    }
    let max = dst.max_value() as f64;
    (f as f64 * max).round().clamp(0.0, max) as u32
}

/// Reads one sample of type `dt` from the front of `bytes`.
#[inline]
pub fn load_sample(dt: DataType, bytes: &[u8], endian: Endian) -> Sample {
    match dt {
        DataType::U8 => Sample::Int(bytes[0] as u32),
        DataType::U10 => Sample::Int(read_u16(bytes, endian) as u32 & 0x3ff),
        DataType::U16 => Sample::Int(read_u16(bytes, endian) as u32),
        DataType::U32 => Sample::Int(read_u32(bytes, endian)),
        DataType::F16 => Sample::Float(f16::from_bits(read_u16(bytes, endian)).to_f32()),
        DataType::F32 => Sample::Float(f32::from_bits(read_u32(bytes, endian))),
    }
}

/// Writes one sample already in the domain of `dt` to the front of `out`.
#[inline]
pub fn store_sample(dt: DataType, sample: Sample, out: &mut [u8], endian: Endian) {
    match (dt, sample) {
        (DataType::U8, Sample::Int(v)) => out[0] = v as u8,
        (DataType::U10, Sample::Int(v)) => write_u16(out, (v & 0x3ff) as u16, endian),
        (DataType::U16, Sample::Int(v)) => write_u16(out, v as u16, endian),
        (DataType::U32, Sample::Int(v)) => write_u32(out, v, endian),
        (DataType::F16, Sample::Float(f)) => write_u16(out, f16::from_f32(f).to_bits(), endian),
        (DataType::F32, Sample::Float(f)) => write_u32(out, f.to_bits(), endian),
        (dt, s) => store_sample(dt, s.convert(other_domain(dt), dt), out, endian),
    }
}

// A sample tagged with the wrong domain for `dt` is reinterpreted as coming
// from the widest type of its own domain.
#[inline]
fn other_domain(dt: DataType) -> DataType {
    if dt.is_float() { DataType::U32 } else { DataType::F32 }
}

#[inline]
fn read_u16(b: &[u8], endian: Endian) -> u16 {
    let raw = [b[0], b[1]];
    match endian {
        Endian::Msb => u16::from_be_bytes(raw),
        Endian::Lsb => u16::from_le_bytes(raw),
    }
}

#[inline]
fn read_u32(b: &[u8], endian: Endian) -> u32 {
    let raw = [b[0], b[1], b[2], b[3]];
    match endian {
        Endian::Msb => u32::from_be_bytes(raw),
        Endian::Lsb => u32::from_le_bytes(raw),
    }
}

#[inline]
fn write_u16(out: &mut [u8], v: u16, endian: Endian) {
    let raw = match endian {
        Endian::Msb => v.to_be_bytes(),
        Endian::Lsb => v.to_le_bytes(),
    };
    out[..2].copy_from_slice(&raw);
}

#[inline]
fn write_u32(out: &mut [u8], v: u32, endian: Endian) {
    let raw = match endian {
        Endian::Msb => v.to_be_bytes(),
        Endian::Lsb => v.to_le_bytes(),
    };
    out[..4].copy_from_slice(&raw);
}

// ============================================================================
// Bulk conversion
// ============================================================================

fn check_len(len: usize, expected: usize) -> Result<()> {
    if len < expected {
        return Err(Error::size_mismatch(expected, len));
    }
    Ok(())
}

fn check_channels(in_channels: usize, out_channels: usize) -> Result<()> {
    if !(1..=4).contains(&in_channels) || !(1..=4).contains(&out_channels) {
        return Err(Error::unsupported_layout(format!(
            "channel counts {in_channels} -> {out_channels}"
        )));
    }
    if out_channels > in_channels {
        return Err(Error::unsupported_layout(format!(
            "cannot produce {out_channels} channels from {in_channels}"
        )));
    }
    Ok(())
}

/// Converts `pixel_count` pixels of `in_channels` samples of `src_type`
/// into `out_channels` samples of `dst_type`.
///
/// Only the first `out_channels` of each source pixel are kept.
pub fn convert(
    src_type: DataType,
    src: &[u8],
    dst_type: DataType,
    dst: &mut [u8],
    pixel_count: usize,
    in_channels: usize,
    out_channels: usize,
) -> Result<()> {
    convert_endian(
        src_type,
        src,
        Endian::native(),
        dst_type,
        dst,
        pixel_count,
        in_channels,
        out_channels,
    )
}

/// Like [`convert`], reading source samples in `src_endian`.
#[allow(clippy::too_many_arguments)]
pub fn convert_endian(
    src_type: DataType,
    src: &[u8],
    src_endian: Endian,
    dst_type: DataType,
    dst: &mut [u8],
    pixel_count: usize,
    in_channels: usize,
    out_channels: usize,
) -> Result<()> {
    check_channels(in_channels, out_channels)?;
    let src_bpc = src_type.bytes_per_channel();
    let dst_bpc = dst_type.bytes_per_channel();
    check_len(src.len(), pixel_count * in_channels * src_bpc)?;
    check_len(dst.len(), pixel_count * out_channels * dst_bpc)?;

    if src_type == dst_type && (src_endian.is_native() || src_bpc == 1) {
        return extract(src, dst, pixel_count, in_channels, out_channels, src_bpc);
    }

    let native = Endian::native();
    let src_px = in_channels * src_bpc;
    let dst_px = out_channels * dst_bpc;
    for (s, d) in src
        .chunks_exact(src_px)
        .zip(dst.chunks_exact_mut(dst_px))
        .take(pixel_count)
    {
        for c in 0..out_channels {
            let v = load_sample(src_type, &s[c * src_bpc..], src_endian);
            store_sample(dst_type, v.convert(src_type, dst_type), &mut d[c * dst_bpc..], native);
        }
    }
    Ok(())
}

/// Copies the first `out_channels` of each `in_channels` pixel into a
/// densely packed output.
pub fn extract(
    src: &[u8],
    dst: &mut [u8],
    pixel_count: usize,
    in_channels: usize,
    out_channels: usize,
    bytes_per_channel: usize,
) -> Result<()> {
    check_channels(in_channels, out_channels)?;
    let src_px = in_channels * bytes_per_channel;
    let dst_px = out_channels * bytes_per_channel;
    check_len(src.len(), pixel_count * src_px)?;
    check_len(dst.len(), pixel_count * dst_px)?;

    if in_channels == out_channels {
        let n = pixel_count * src_px;
        dst[..n].copy_from_slice(&src[..n]);
        return Ok(());
    }

    let pixels = src
        .chunks_exact(src_px)
        .zip(dst.chunks_exact_mut(dst_px))
        .take(pixel_count);
    match (out_channels, bytes_per_channel) {
        (1, 1) => {
            for (s, d) in pixels {
                d[0] = s[0];
            }
        }
        (2, 1) => {
            for (s, d) in pixels {
                d[0] = s[0];
                d[1] = s[1];
            }
        }
        (1, 2) => {
            for (s, d) in pixels {
                d[..2].copy_from_slice(&s[..2]);
            }
        }
        (2, 2) => {
            for (s, d) in pixels {
                d[..4].copy_from_slice(&s[..4]);
            }
        }
        _ => {
            for (s, d) in pixels {
                d.copy_from_slice(&s[..dst_px]);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Planar <-> interleaved
// ============================================================================

/// Interleaves single-channel planes into one pixel buffer.
///
/// Each plane holds `sample_count` samples of `bytes_per_channel` bytes;
/// the output receives `sample_count * planes.len()` samples.
pub fn planar_interleave(
    planes: &[&[u8]],
    out: &mut [u8],
    sample_count: usize,
    bytes_per_channel: usize,
) -> Result<()> {
    let channels = planes.len();
    check_channels(channels, channels)?;
    let plane_len = sample_count * bytes_per_channel;
    for p in planes {
        check_len(p.len(), plane_len)?;
    }
    check_len(out.len(), plane_len * channels)?;

    let bpc = bytes_per_channel;
    match channels {
        1 => out[..plane_len].copy_from_slice(&planes[0][..plane_len]),
        2 => {
            let (a, b) = (planes[0], planes[1]);
            for (i, px) in out.chunks_exact_mut(2 * bpc).take(sample_count).enumerate() {
                let o = i * bpc;
                px[..bpc].copy_from_slice(&a[o..o + bpc]);
                px[bpc..].copy_from_slice(&b[o..o + bpc]);
            }
        }
        _ => {
            for (i, px) in out.chunks_exact_mut(channels * bpc).take(sample_count).enumerate() {
                let o = i * bpc;
                for (c, plane) in planes.iter().enumerate() {
                    px[c * bpc..(c + 1) * bpc].copy_from_slice(&plane[o..o + bpc]);
                }
            }
        }
    }
    Ok(())
}

/// Splits an interleaved pixel buffer into single-channel planes.
///
/// The inverse of [`planar_interleave`].
pub fn planar_deinterleave(
    src: &[u8],
    planes: &mut [&mut [u8]],
    sample_count: usize,
    bytes_per_channel: usize,
) -> Result<()> {
    let channels = planes.len();
    check_channels(channels, channels)?;
    let plane_len = sample_count * bytes_per_channel;
    for p in planes.iter() {
        check_len(p.len(), plane_len)?;
    }
    check_len(src.len(), plane_len * channels)?;

    let bpc = bytes_per_channel;
    match channels {
        1 => planes[0][..plane_len].copy_from_slice(&src[..plane_len]),
        2 => {
            let (a, b) = planes.split_at_mut(1);
            let (a, b) = (&mut a[0], &mut b[0]);
            for (i, px) in src.chunks_exact(2 * bpc).take(sample_count).enumerate() {
                let o = i * bpc;
                a[o..o + bpc].copy_from_slice(&px[..bpc]);
                b[o..o + bpc].copy_from_slice(&px[bpc..]);
            }
        }
        _ => {
            for (i, px) in src.chunks_exact(channels * bpc).take(sample_count).enumerate() {
                let o = i * bpc;
                for (c, plane) in planes.iter_mut().enumerate() {
                    plane[o..o + bpc].copy_from_slice(&px[c * bpc..(c + 1) * bpc]);
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// Endian and packing
// ============================================================================

/// Reverses the byte order of every `word_size`-byte word in `buf`.
///
/// Word sizes of 0 and 1 leave the buffer unchanged. A trailing partial
/// word is left as is.
pub fn swap_endian(buf: &mut [u8], word_size: usize) {
    if word_size <= 1 {
        return;
    }
    for word in buf.chunks_exact_mut(word_size) {
        word.reverse();
    }
}

/// Unpacks 32-bit words holding three 10-bit channels (R in bits 31..22,
/// G in 21..12, B in 11..2) into RGB_U10 samples.
///
/// Reads word `i * step` for output pixel `i`; a step of 1 reads every word.
pub fn unpack_rgb_u10(
    src: &[u8],
    endian: Endian,
    dst: &mut [u8],
    pixel_count: usize,
    step: usize,
) -> Result<()> {
    let step = step.max(1);
    if pixel_count > 0 {
        check_len(src.len(), ((pixel_count - 1) * step + 1) * 4)?;
    }
    check_len(dst.len(), pixel_count * 6)?;

    let native = Endian::native();
    for (i, px) in dst.chunks_exact_mut(6).take(pixel_count).enumerate() {
        let w = read_u32(&src[i * step * 4..], endian);
        write_u16(&mut px[0..], ((w >> 22) & 0x3ff) as u16, native);
        write_u16(&mut px[2..], ((w >> 12) & 0x3ff) as u16, native);
        write_u16(&mut px[4..], ((w >> 2) & 0x3ff) as u16, native);
    }
    Ok(())
}

// ============================================================================
// Proxy
// ============================================================================

/// Decimation factor for a proxy level: `2^level`, saturating.
#[inline]
pub fn proxy_scale(level: u32) -> u64 {
    1u64 << level.min(63)
}

/// Dimensions at proxy `level`: `ceil(size / 2^level)`, never below 1.
pub fn proxy_size(size: Size, level: u32) -> Size {
    let scale = proxy_scale(level);
    let dim = |v: u32| (v as u64).div_ceil(scale).max(1) as u32;
    Size::new(dim(size.w), dim(size.h))
}

/// Converts a whole frame, decimating by `2^proxy` in the same pass.
///
/// `dst_info.size` must equal [`proxy_size`] of the source size. Source
/// samples are read in the source layout's byte order and written in the
/// destination's. Alignment padding is honored on both sides; mirror flags
/// are carried by the layout and not applied.
pub fn convert_image(
    src: &[u8],
    src_info: &PixelDataInfo,
    dst: &mut [u8],
    dst_info: &PixelDataInfo,
    proxy: u32,
) -> Result<()> {
    let expected = proxy_size(src_info.size, proxy);
    if dst_info.size != expected {
        return Err(Error::InvalidDimensions {
            width: dst_info.size.w,
            height: dst_info.size.h,
        });
    }
    let in_ch = src_info.pixel_type.channel_count();
    let out_ch = dst_info.pixel_type.channel_count();
    check_channels(in_ch, out_ch)?;
    check_len(src.len(), src_info.data_byte_count())?;
    check_len(dst.len(), dst_info.data_byte_count())?;
    if src_info.size.is_empty() {
        return Ok(());
    }

    let src_type = src_info.pixel_type.data_type;
    let dst_type = dst_info.pixel_type.data_type;
    let src_bpp = src_info.pixel_type.bytes_per_pixel();
    let src_bpc = src_type.bytes_per_channel();
    let dst_bpc = dst_type.bytes_per_channel();
    let src_stride = src_info.scanline_byte_count();
    let dst_stride = dst_info.scanline_byte_count();
    let dst_row = dst_info.row_bytes();
    let scale = proxy_scale(proxy) as usize;
    let src_endian = src_info.layout.endian;
    let dst_endian = dst_info.layout.endian;

    let same_repr = src_type == dst_type && (src_bpc == 1 || src_endian == dst_endian);
    for y in 0..dst_info.size.h as usize {
        let s_row = &src[y * scale * src_stride..];
        let d_row = &mut dst[y * dst_stride..y * dst_stride + dst_row];
        if same_repr && scale == 1 {
            extract(s_row, d_row, dst_info.size.w as usize, in_ch, out_ch, src_bpc)?;
            continue;
        }
        for (x, d) in d_row.chunks_exact_mut(out_ch * dst_bpc).enumerate() {
            let s = &s_row[x * scale * src_bpp..];
            for c in 0..out_ch {
                let v = load_sample(src_type, &s[c * src_bpc..], src_endian);
                store_sample(
                    dst_type,
                    v.convert(src_type, dst_type),
                    &mut d[c * dst_bpc..],
                    dst_endian,
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelType;
    use approx::assert_relative_eq;

    const INTS: [DataType; 4] = [DataType::U8, DataType::U10, DataType::U16, DataType::U32];

    fn encode(dt: DataType, values: &[Sample]) -> Vec<u8> {
        let bpc = dt.bytes_per_channel();
        let mut out = vec![0u8; values.len() * bpc];
        for (v, o) in values.iter().zip(out.chunks_exact_mut(bpc)) {
            store_sample(dt, *v, o, Endian::native());
        }
        out
    }

    fn decode(dt: DataType, bytes: &[u8]) -> Vec<Sample> {
        bytes
            .chunks_exact(dt.bytes_per_channel())
            .map(|b| load_sample(dt, b, Endian::native()))
            .collect()
    }

    #[test]
    fn test_int_shifts() {
        assert_eq!(int_to_int(0xff, 8, 16), 0xff00);
        assert_eq!(int_to_int(0x3ff, 10, 16), 0xffc0);
        assert_eq!(int_to_int(0x3ff, 10, 32), 0xffc0_0000);
        assert_eq!(int_to_int(0xffff, 16, 10), 0x3ff);
        assert_eq!(int_to_int(0x3ff, 10, 8), 0xff);
        assert_eq!(int_to_int(0xffff_ffff, 32, 8), 0xff);
        assert_eq!(int_to_int(0x1234, 16, 8), 0x12);
    }

    #[test]
    fn test_int_to_float() {
        assert_eq!(int_to_float(255, DataType::U8), 1.0);
        assert_eq!(int_to_float(0, DataType::U16), 0.0);
        assert_relative_eq!(int_to_float(512, DataType::U10), 512.0 / 1023.0, epsilon = 1e-7);
        assert_eq!(int_to_float(u32::MAX, DataType::U32), 1.0);
    }

    #[test]
    fn test_clamp_law() {
        for dt in INTS {
            for f in [1.0f32, 1.5, 100.0, f32::INFINITY] {
                assert_eq!(float_to_int(f, dt), dt.max_value(), "{dt} {f}");
            }
            for f in [0.0f32, -0.5, -100.0, f32::NEG_INFINITY] {
                assert_eq!(float_to_int(f, dt), 0, "{dt} {f}");
            }
            assert_eq!(float_to_int(f32::NAN, dt), 0);
        }
    }

    #[test]
    fn test_float_rounds_to_nearest() {
        // 0.5 * 255 = 127.5 rounds up
        assert_eq!(float_to_int(0.5, DataType::U8), 128);
        assert_eq!(float_to_int(0.498, DataType::U8), 127);
        assert_eq!(float_to_int(1.0 / 1023.0, DataType::U10), 1);
    }

    #[test]
    fn test_int_round_trip() {
        let codes: [u32; 5] = [0, 1, 77, 200, 255];
        for a in INTS {
            for b in INTS {
                for &c in &codes {
                    let v = int_to_int(c, 8, a.bits());
                    let there = Sample::Int(v).convert(a, b);
                    let back = match there.convert(b, a) {
                        Sample::Int(x) => x,
                        Sample::Float(_) => unreachable!(),
                    };
                    if b.bits() >= a.bits() {
                        assert_eq!(back, v, "{a}->{b}->{a} code {v}");
                    } else {
                        let lsb = 1u32 << (a.bits() - b.bits());
                        assert!(v - back < lsb, "{a}->{b}->{a} code {v} got {back}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_float_round_trip_through_int() {
        for dt in [DataType::U8, DataType::U10, DataType::U16] {
            for code in [0u32, 1, dt.max_value() / 3, dt.max_value()] {
                let f = Sample::Int(code).convert(dt, DataType::F32);
                assert_eq!(f.convert(DataType::F32, dt), Sample::Int(code), "{dt} {code}");
            }
        }
    }

    #[test]
    fn test_half_store() {
        let bytes = encode(DataType::F16, &[Sample::Float(0.5), Sample::Float(1.0)]);
        let back = decode(DataType::F16, &bytes);
        assert_eq!(back, [Sample::Float(0.5), Sample::Float(1.0)]);
    }

    #[test]
    fn test_u10_masks_high_bits() {
        let bytes = 0xfc01u16.to_ne_bytes();
        assert_eq!(load_sample(DataType::U10, &bytes, Endian::native()), Sample::Int(1));
    }

    #[test]
    fn test_convert_all_pairs_identity_on_white() {
        for src in DataType::ALL {
            for dst in DataType::ALL {
                let white = if src.is_float() {
                    Sample::Float(1.0)
                } else {
                    Sample::Int(src.max_value())
                };
                let s = encode(src, &[white]);
                let mut d = vec![0u8; dst.bytes_per_channel()];
                convert(src, &s, dst, &mut d, 1, 1, 1).unwrap();
                let got = decode(dst, &d)[0];
                let expect_int = int_to_int(src.max_value(), src.bits(), dst.bits());
                match got {
                    Sample::Float(f) => assert_eq!(f, 1.0, "{src}->{dst}"),
                    Sample::Int(v) if src.is_float() => assert_eq!(v, dst.max_value()),
                    Sample::Int(v) => assert_eq!(v, expect_int, "{src}->{dst}"),
                }
            }
        }
    }

    #[test]
    fn test_convert_extracts_channels() {
        let src = encode(
            DataType::U16,
            &[1, 2, 3, 4, 5, 6, 7, 8].map(|v| Sample::Int(v << 8)),
        );
        let mut dst = vec![0u8; 2 * 3];
        convert(DataType::U16, &src, DataType::U8, &mut dst, 2, 4, 3).unwrap();
        assert_eq!(dst, [1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn test_convert_size_mismatch() {
        let src = [0u8; 5];
        let mut dst = [0u8; 6];
        let err = convert(DataType::U8, &src, DataType::U8, &mut dst, 2, 3, 3).unwrap_err();
        assert!(err.is_size_mismatch());

        let src = [0u8; 6];
        let mut dst = [0u8; 2];
        let err = convert(DataType::U8, &src, DataType::U16, &mut dst, 2, 3, 1).unwrap_err();
        assert!(err.is_size_mismatch());
    }

    #[test]
    fn test_convert_more_channels_rejected() {
        let src = [0u8; 3];
        let mut dst = [0u8; 4];
        let err = convert(DataType::U8, &src, DataType::U8, &mut dst, 1, 3, 4).unwrap_err();
        assert!(err.is_unsupported_layout());
    }

    #[test]
    fn test_convert_foreign_endian() {
        let src = [0x12u8, 0x34];
        let mut dst = [0u8; 2];
        convert_endian(DataType::U16, &src, Endian::Msb, DataType::U16, &mut dst, 1, 1, 1)
            .unwrap();
        assert_eq!(u16::from_ne_bytes(dst), 0x1234);
    }

    #[test]
    fn test_extract_fast_paths() {
        let src: Vec<u8> = (0..12).collect();
        let mut one = [0u8; 3];
        extract(&src, &mut one, 3, 4, 1, 1).unwrap();
        assert_eq!(one, [0, 4, 8]);

        let mut two = [0u8; 6];
        extract(&src, &mut two, 3, 4, 2, 1).unwrap();
        assert_eq!(two, [0, 1, 4, 5, 8, 9]);

        let mut three = [0u8; 6];
        extract(&src, &mut three, 1, 3, 3, 2).unwrap();
        assert_eq!(three, [0, 1, 2, 3, 4, 5]);

        let mut wide = [0u8; 4];
        extract(&src, &mut wide, 2, 3, 1, 2).unwrap();
        assert_eq!(wide, [0, 1, 6, 7]);
    }

    #[test]
    fn test_planar_round_trip() {
        for dt in DataType::ALL {
            let bpc = dt.bytes_per_channel();
            for channels in 1..=4usize {
                let samples = 7;
                let src: Vec<u8> = (0..samples * channels * bpc).map(|i| (i * 7 + 3) as u8).collect();
                let mut storage = vec![0u8; src.len()];
                {
                    let mut planes: Vec<&mut [u8]> =
                        storage.chunks_exact_mut(samples * bpc).collect();
                    planar_deinterleave(&src, &mut planes, samples, bpc).unwrap();
                }
                let planes: Vec<&[u8]> = storage.chunks_exact(samples * bpc).collect();
                let mut back = vec![0u8; src.len()];
                planar_interleave(&planes, &mut back, samples, bpc).unwrap();
                assert_eq!(back, src, "{dt} x{channels}");
            }
        }
    }

    #[test]
    fn test_planar_interleave_order() {
        let r = [1u8, 2];
        let g = [3u8, 4];
        let b = [5u8, 6];
        let mut out = [0u8; 6];
        planar_interleave(&[&r, &g, &b], &mut out, 2, 1).unwrap();
        assert_eq!(out, [1, 3, 5, 2, 4, 6]);
    }

    #[test]
    fn test_swap_endian() {
        let mut buf = [1u8, 2, 3, 4, 5, 6, 7, 8];
        swap_endian(&mut buf, 2);
        assert_eq!(buf, [2, 1, 4, 3, 6, 5, 8, 7]);
        swap_endian(&mut buf, 2);
        swap_endian(&mut buf, 4);
        assert_eq!(buf, [4, 3, 2, 1, 8, 7, 6, 5]);
    }

    #[test]
    fn test_unpack_rgb_u10() {
        let word: u32 = (1023 << 22) | (512 << 12) | (1 << 2);
        let mut src = word.to_be_bytes().to_vec();
        src.extend_from_slice(&0u32.to_be_bytes());
        let mut dst = [0u8; 12];
        unpack_rgb_u10(&src, Endian::Msb, &mut dst, 2, 1).unwrap();
        let vals: Vec<u16> = dst.chunks_exact(2).map(|b| u16::from_ne_bytes([b[0], b[1]])).collect();
        assert_eq!(vals, [1023, 512, 1, 0, 0, 0]);

        let mut one = [0u8; 6];
        unpack_rgb_u10(&src, Endian::Msb, &mut one, 1, 2).unwrap();
        assert_eq!(u16::from_ne_bytes([one[0], one[1]]), 1023);
    }

    #[test]
    fn test_proxy_size() {
        assert_eq!(proxy_size(Size::new(256, 256), 0), Size::new(256, 256));
        assert_eq!(proxy_size(Size::new(256, 256), 1), Size::new(128, 128));
        assert_eq!(proxy_size(Size::new(255, 3), 1), Size::new(128, 2));
        assert_eq!(proxy_size(Size::new(5, 5), 3), Size::new(1, 1));
        assert_eq!(proxy_size(Size::new(4096, 2160), 100), Size::new(1, 1));
    }

    #[test]
    fn test_convert_image_proxy() {
        let src_info = PixelDataInfo::new(Size::new(4, 4), PixelType::RGBA_U8);
        let src: Vec<u8> = (0..4 * 4 * 4).map(|i| i as u8).collect();
        let dst_info = PixelDataInfo::new(Size::new(2, 2), PixelType::RGBA_U8);
        let mut dst = vec![0u8; dst_info.data_byte_count()];
        convert_image(&src, &src_info, &mut dst, &dst_info, 1).unwrap();
        // pixels (0,0), (2,0), (0,2), (2,2)
        assert_eq!(&dst[0..4], &[0, 1, 2, 3]);
        assert_eq!(&dst[4..8], &[8, 9, 10, 11]);
        assert_eq!(&dst[8..12], &[32, 33, 34, 35]);
        assert_eq!(&dst[12..16], &[40, 41, 42, 43]);
    }

    #[test]
    fn test_convert_image_types_and_padding() {
        let mut src_info = PixelDataInfo::new(Size::new(1, 2), PixelType::RGB_U8);
        src_info.layout.alignment = 4;
        let src = [255u8, 0, 51, 0xee, 0, 255, 0, 0xee];
        let dst_info = PixelDataInfo::new(Size::new(1, 2), PixelType::L_F32);
        let mut dst = vec![0u8; dst_info.data_byte_count()];
        convert_image(&src, &src_info, &mut dst, &dst_info, 0).unwrap();
        let vals: Vec<f32> = dst
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(vals, [1.0, 0.0]);
    }

    #[test]
    fn test_convert_image_wrong_size() {
        let src_info = PixelDataInfo::new(Size::new(4, 4), PixelType::L_U8);
        let dst_info = PixelDataInfo::new(Size::new(4, 4), PixelType::L_U8);
        let src = [0u8; 16];
        let mut dst = [0u8; 16];
        assert!(convert_image(&src, &src_info, &mut dst, &dst_info, 1).is_err());
    }
}
