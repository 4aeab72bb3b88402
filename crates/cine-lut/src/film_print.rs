//! Logarithmic film-print to linear conversion.
//!
//! Code values are printing density in steps of 0.002, with a film gamma
//! of 0.6. With `d = (c - white) * 0.002 / 0.6 * gamma / 1.7`:
//!
//! ```text
//! gain   = 1 / (1 - 10^((black - white) * 0.002 / 0.6 * gamma / 1.7))
//! offset = gain - 1
//! f(c)   = 10^d * gain - offset
//! ```
//!
//! so `f(black) = 0` and `f(white) = 1`. With a soft clip `s > 0`, codes
//! above the break point roll off instead of growing exponentially:
//!
//! ```text
//! knee_gain = (1 - f(break)) / (5 s)^(s / 100)
//! g(c)      = (c - break)^(s / 100) * knee_gain + f(break)
//! ```
//!
//! Parameters are always in 10-bit code units. Tables of other sizes
//! rescale their index into that domain.

use cine_core::convert::{int_to_int, load_sample, store_sample, Sample};
use cine_core::{DataType, Endian, PixelDataInfo, RawFrameBuffer};

use crate::{LutError, LutResult};

// === Constants ===

/// Density per code value.
const DENSITY_STEP: f64 = 0.002;
/// Negative film gamma.
const FILM_GAMMA: f64 = 0.6;
/// Reference display gamma the `gamma` parameter is relative to.
const REF_GAMMA: f64 = 1.7;
/// Largest 10-bit code, the parameter domain.
const CODE_MAX: f64 = 1023.0;

/// Film-print curve parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilmPrintParams {
    /// Code value mapped to linear 0.
    pub black_point: f32,
    /// Code value mapped to linear 1.
    pub white_point: f32,
    /// Display gamma.
    pub gamma: f32,
    /// Code value where the soft clip starts.
    pub break_point: f32,
    /// Soft clip strength; 0 disables it.
    pub soft_clip: f32,
    /// Table index width in bits; the table holds `2^bit_depth` entries.
    pub bit_depth: u32,
}

impl Default for FilmPrintParams {
    fn default() -> Self {
        Self {
            black_point: 95.0,
            white_point: 685.0,
            gamma: 1.7,
            break_point: 685.0,
            soft_clip: 0.0,
            bit_depth: 10,
        }
    }
}

impl FilmPrintParams {
    /// Sets the black point.
    pub fn with_black_point(mut self, v: f32) -> Self {
        self.black_point = v;
        self
    }

    /// Sets the white point.
    pub fn with_white_point(mut self, v: f32) -> Self {
        self.white_point = v;
        self
    }

    /// Sets the gamma.
    pub fn with_gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the break point.
    pub fn with_break_point(mut self, v: f32) -> Self {
        self.break_point = v;
        self
    }

    /// Sets the soft clip.
    pub fn with_soft_clip(mut self, v: f32) -> Self {
        self.soft_clip = v;
        self
    }

    /// Sets the table bit depth.
    pub fn with_bit_depth(mut self, bits: u32) -> Self {
        self.bit_depth = bits;
        self
    }

    /// Checks the parameters define a finite, increasing curve.
    pub fn validate(&self) -> LutResult<()> {
        if !(1..=16).contains(&self.bit_depth) {
            return Err(LutError::InvalidBitDepth(self.bit_depth));
        }
        let finite = [
            self.black_point,
            self.white_point,
            self.gamma,
            self.break_point,
            self.soft_clip,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(LutError::InvalidParams("non-finite value".into()));
        }
        if self.white_point <= self.black_point {
            return Err(LutError::InvalidParams(format!(
                "white point {} must exceed black point {}",
                self.white_point, self.black_point
            )));
        }
        if self.gamma <= 0.0 {
            return Err(LutError::InvalidParams(format!("gamma {}", self.gamma)));
        }
        if self.soft_clip < 0.0 {
            return Err(LutError::InvalidParams(format!("soft clip {}", self.soft_clip)));
        }
        Ok(())
    }

    /// Hashable identity of the parameter tuple.
    pub(crate) fn key(&self) -> [u32; 6] {
        [
            self.black_point.to_bits(),
            self.white_point.to_bits(),
            self.gamma.to_bits(),
            self.break_point.to_bits(),
            self.soft_clip.to_bits(),
            self.bit_depth,
        ]
    }
}

/// Precomputed curve constants.
#[derive(Debug, Clone, Copy)]
struct Curve {
    white: f64,
    exponent: f64,
    gain: f64,
    offset: f64,
    break_point: f64,
    soft_clip: f64,
    knee_offset: f64,
    knee_gain: f64,
}

impl Curve {
    fn new(p: &FilmPrintParams) -> Self {
        let white = p.white_point as f64;
        let exponent = DENSITY_STEP / FILM_GAMMA * p.gamma as f64 / REF_GAMMA;
        let gain = 1.0 / (1.0 - 10f64.powf((p.black_point as f64 - white) * exponent));
        let offset = gain - 1.0;
        let mut curve = Self {
            white,
            exponent,
            gain,
            offset,
            break_point: p.break_point as f64,
            soft_clip: p.soft_clip as f64,
            knee_offset: 0.0,
            knee_gain: 0.0,
        };
        if curve.soft_clip > 0.0 {
            curve.knee_offset = curve.log_to_lin(curve.break_point);
            curve.knee_gain = (1.0 - curve.knee_offset)
                / (5.0 * curve.soft_clip).powf(curve.soft_clip / 100.0);
        }
        curve
    }

    fn log_to_lin(&self, code: f64) -> f64 {
        10f64.powf((code - self.white) * self.exponent) * self.gain - self.offset
    }

    fn eval(&self, code: f64) -> f64 {
        if self.soft_clip > 0.0 && code > self.break_point {
            (code - self.break_point).powf(self.soft_clip / 100.0) * self.knee_gain
                + self.knee_offset
        } else {
            self.log_to_lin(code)
        }
    }

    fn invert(&self, linear: f64) -> f64 {
        if self.soft_clip > 0.0 && linear > self.knee_offset && self.knee_gain > 0.0 {
            let t = (linear - self.knee_offset) / self.knee_gain;
            return self.break_point + t.max(0.0).powf(100.0 / self.soft_clip);
        }
        let v = (linear + self.offset) / self.gain;
        if v <= 0.0 {
            return 0.0;
        }
        self.white + v.log10() / self.exponent
    }
}

/// A film-print to linear table indexed by raw code value.
#[derive(Debug, Clone)]
pub struct FilmPrintLut {
    params: FilmPrintParams,
    entries: Vec<f32>,
}

impl FilmPrintLut {
    /// Evaluates the curve at every code of a `2^bit_depth` entry table.
    pub fn build(params: FilmPrintParams) -> LutResult<Self> {
        params.validate()?;
        let curve = Curve::new(&params);
        let size = 1usize << params.bit_depth;
        let to_code = CODE_MAX / (size - 1).max(1) as f64;
        let entries = (0..size)
            .map(|i| curve.eval(i as f64 * to_code) as f32)
            .collect();
        Ok(Self { params, entries })
    }

    /// Parameters the table was built from.
    #[inline]
    pub fn params(&self) -> &FilmPrintParams {
        &self.params
    }

    /// Index width in bits.
    #[inline]
    pub fn bit_depth(&self) -> u32 {
        self.params.bit_depth
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a table holds at least two entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, indexed by code.
    #[inline]
    pub fn entries(&self) -> &[f32] {
        &self.entries
    }

    /// Linear value for `code`, clamped to the table.
    #[inline]
    pub fn value(&self, code: u32) -> f32 {
        self.entries[(code as usize).min(self.entries.len() - 1)]
    }

    /// Code whose table value is nearest to `linear`.
    pub fn invert(&self, linear: f32) -> u32 {
        linear_to_film_print(&self.params, linear).round() as u32
    }

    /// Table index for a sample stored as `dt`.
    #[inline]
    fn index(&self, sample: Sample, dt: DataType) -> usize {
        let bits = self.params.bit_depth;
        let idx = match sample {
            Sample::Int(v) => int_to_int(v, dt.bits(), bits),
            Sample::Float(f) => {
                let max = (self.entries.len() - 1) as f32;
                if f.is_nan() { 0 } else { (f * max).round().clamp(0.0, max) as u32 }
            }
        };
        (idx as usize).min(self.entries.len() - 1)
    }

    /// Maps every sample of `src` through the table.
    ///
    /// The result has the same size and channels as `src`, stored as
    /// `output` (F16 or F32) in native byte order.
    pub fn apply(&self, src: &RawFrameBuffer, output: DataType) -> LutResult<RawFrameBuffer> {
        if !output.is_float() {
            return Err(LutError::UnsupportedOutput(output));
        }
        let info = src.info();
        let src_type = info.pixel_type.data_type;
        let mut dst_info = PixelDataInfo::new(info.size, info.pixel_type.with_data_type(output));
        dst_info.layout.mirror_x = info.layout.mirror_x;
        dst_info.layout.mirror_y = info.layout.mirror_y;
        let mut dst = RawFrameBuffer::new(dst_info);

        let src_bpc = src_type.bytes_per_channel();
        let dst_bpc = output.bytes_per_channel();
        let src_endian = info.layout.endian;
        let native = Endian::native();
        for y in 0..info.size.h {
            let s_row = src.scanline(y);
            let d_row = dst.scanline_mut(y);
            for (s, d) in s_row.chunks_exact(src_bpc).zip(d_row.chunks_exact_mut(dst_bpc)) {
                let v = self.entries[self.index(load_sample(src_type, s, src_endian), src_type)];
                store_sample(output, Sample::Float(v), d, native);
            }
        }
        Ok(dst)
    }
}

/// Inverse curve: linear value to code value in the table's index domain.
///
/// The result is clamped to `[0, 2^bit_depth - 1]`.
pub fn linear_to_film_print(params: &FilmPrintParams, linear: f32) -> f32 {
    let curve = Curve::new(params);
    let max = ((1u64 << params.bit_depth.min(31)) - 1) as f64;
    let code = curve.invert(linear as f64) * max / CODE_MAX;
    code.clamp(0.0, max) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cine_core::{PixelType, Size};

    fn frame(pt: PixelType, samples: &[Sample]) -> RawFrameBuffer {
        let width = (samples.len() / pt.channel_count()) as u32;
        let info = PixelDataInfo::new(Size::new(width, 1), pt);
        let mut buf = RawFrameBuffer::new(info);
        let bpc = pt.bytes_per_channel();
        for (s, out) in samples.iter().zip(buf.bytes_mut().chunks_exact_mut(bpc)) {
            store_sample(pt.data_type, *s, out, Endian::native());
        }
        buf
    }

    fn f32s(buf: &RawFrameBuffer) -> Vec<f32> {
        buf.as_bytes()
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    #[test]
    fn test_black_and_white() {
        let lut = FilmPrintLut::build(FilmPrintParams::default()).unwrap();
        assert_eq!(lut.len(), 1024);
        assert_relative_eq!(lut.value(95), 0.0, epsilon = 1e-6);
        assert_relative_eq!(lut.value(685), 1.0, epsilon = 1e-6);
        assert!(lut.value(0) < 0.0);
        assert!(lut.value(1023) > 1.0);
    }

    #[test]
    fn test_monotonic() {
        let params = FilmPrintParams::default().with_gamma(2.2);
        let lut = FilmPrintLut::build(params).unwrap();
        assert!(lut.entries().windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_gamma_changes_midtones() {
        let a = FilmPrintLut::build(FilmPrintParams::default()).unwrap();
        let b = FilmPrintLut::build(FilmPrintParams::default().with_gamma(2.2)).unwrap();
        assert_relative_eq!(b.value(685), 1.0, epsilon = 1e-6);
        assert!((a.value(445) - b.value(445)).abs() > 1e-3);
    }

    #[test]
    fn test_soft_clip_rolls_off() {
        let hard = FilmPrintLut::build(FilmPrintParams::default()).unwrap();
        let params = FilmPrintParams::default()
            .with_soft_clip(20.0)
            .with_break_point(600.0);
        let soft = FilmPrintLut::build(params).unwrap();
        // Identical below the break point
        assert_eq!(hard.value(500), soft.value(500));
        // Reaches 1.0 at break + 5 * soft clip
        assert_relative_eq!(soft.value(700), 1.0, epsilon = 1e-5);
        assert!(soft.value(1023) < hard.value(1023));
    }

    #[test]
    fn test_other_bit_depths() {
        let lut = FilmPrintLut::build(FilmPrintParams::default().with_bit_depth(12)).unwrap();
        assert_eq!(lut.len(), 4096);
        let ten = FilmPrintLut::build(FilmPrintParams::default()).unwrap();
        assert_relative_eq!(lut.value(4095), ten.value(1023), epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_params() {
        assert!(matches!(
            FilmPrintLut::build(FilmPrintParams::default().with_bit_depth(0)),
            Err(LutError::InvalidBitDepth(0))
        ));
        assert!(FilmPrintLut::build(FilmPrintParams::default().with_white_point(90.0)).is_err());
        assert!(FilmPrintLut::build(FilmPrintParams::default().with_gamma(0.0)).is_err());
        assert!(FilmPrintLut::build(FilmPrintParams::default().with_soft_clip(f32::NAN)).is_err());
    }

    #[test]
    fn test_inverse_round_trip() {
        for params in [
            FilmPrintParams::default(),
            FilmPrintParams::default().with_gamma(2.2),
            FilmPrintParams::default().with_soft_clip(10.0).with_break_point(620.0),
        ] {
            let lut = FilmPrintLut::build(params).unwrap();
            for code in [95u32, 200, 445, 600, 685, 900] {
                assert_eq!(lut.invert(lut.value(code)), code, "{params:?} code {code}");
            }
        }
    }

    #[test]
    fn test_inverse_clamps() {
        let p = FilmPrintParams::default();
        assert_eq!(linear_to_film_print(&p, -10.0), 0.0);
        assert_eq!(linear_to_film_print(&p, 1e9), 1023.0);
    }

    #[test]
    fn test_apply_u10_direct() {
        let lut = FilmPrintLut::build(FilmPrintParams::default()).unwrap();
        let src = frame(
            PixelType::RGB_U10,
            &[Sample::Int(95), Sample::Int(445), Sample::Int(685)],
        );
        let out = lut.apply(&src, DataType::F32).unwrap();
        assert_eq!(out.info().pixel_type, PixelType::RGB_F32);
        assert_eq!(f32s(&out), [lut.value(95), lut.value(445), lut.value(685)]);
    }

    #[test]
    fn test_apply_converts_other_types() {
        let lut = FilmPrintLut::build(FilmPrintParams::default()).unwrap();
        // 16-bit code 685 << 6 lands on table entry 685
        let src = frame(PixelType::L_U16, &[Sample::Int(685 << 6)]);
        let out = lut.apply(&src, DataType::F32).unwrap();
        assert_eq!(f32s(&out), [lut.value(685)]);

        let src = frame(PixelType::L_F32, &[Sample::Float(1.0)]);
        let out = lut.apply(&src, DataType::F32).unwrap();
        assert_eq!(f32s(&out), [lut.value(1023)]);
    }

    #[test]
    fn test_apply_half_output() {
        let lut = FilmPrintLut::build(FilmPrintParams::default()).unwrap();
        let src = frame(PixelType::L_U10, &[Sample::Int(685)]);
        let out = lut.apply(&src, DataType::F16).unwrap();
        assert_eq!(out.info().pixel_type, PixelType::L_F16);
        assert_eq!(out.data_byte_count(), 2);
        assert!(lut.apply(&src, DataType::U16).is_err());
    }
}
