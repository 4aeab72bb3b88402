//! Frame decoding pipeline.
//!
//! [`FrameDecoder::read`] turns a path, an optional frame number and a
//! proxy level into a [`Frame`]:
//!
//! ```text
//! resolve name -> open -> detect -> parse header
//!     -> read (mmap fast path | buffered slow path) or RLE decode
//!     -> unpack / deinterleave / convert / proxy
//!     -> film-print LUT (when flagged)
//!     -> Frame
//! ```
//!
//! Output buffers are interleaved, native-endian and tightly packed. Mirror
//! flags from the header are reported in the layout and not applied.
//!
//! Header dimensions are checked against the [`ReadOptions`] size limits
//! before any pixel buffer is allocated.
//!
//! # Example
//!
//! ```rust,no_run
//! use cine_io::{FrameDecoder, ReadOptions};
//!
//! let mut decoder = FrameDecoder::new(ReadOptions::default());
//! let frame = decoder.read("plates/shot.####.dpx", Some(1001), 1)?;
//! println!("{}x{}", frame.info.size.w, frame.info.size.h);
//! # Ok::<(), cine_io::IoError>(())
//! ```

use std::path::Path;

use cine_core::convert::{convert_image, planar_interleave, proxy_scale, unpack_rgb_u10};
use cine_core::{
    ColorProfileKind, DataLayout, DataType, Endian, ImageInfo, PixelDataInfo, PixelType,
    RawFrameBuffer,
};
use cine_lut::{FilmPrintLutCache, FilmPrintParams};
use tracing::{debug, trace, warn};

use crate::detect::Format;
use crate::file_io::{FileIo, MmapMode};
use crate::header::{DataEncoding, FilmPrintHints, FrameHeader};
use crate::rle::{RleScanlineTable, decode_scanline};
use crate::sequence::SequenceResolver;
use crate::{ErrorKind, IoError, IoResult};

/// A decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Frame description, matching `buffer`.
    pub info: ImageInfo,
    /// Pixel data.
    pub buffer: RawFrameBuffer,
}

/// Whether to apply the film-print LUT to frames that ask for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilmPrintMode {
    /// Apply it when the header flags film-print data.
    #[default]
    Auto,
    /// Leave code values as stored.
    Off,
}

/// Options for [`FrameDecoder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadOptions {
    /// Memory mapping policy.
    pub mmap: MmapMode,
    /// Film-print LUT policy.
    pub film_print: FilmPrintMode,
    /// Explicit LUT parameters. When unset, defaults refined by valid
    /// header hints are used.
    pub film_print_params: Option<FilmPrintParams>,
    /// Storage type of LUT output (F32 or F16).
    pub lut_output: DataType,
    /// Final pixel type, when different from the file's.
    pub convert_to: Option<PixelType>,
    /// Widest frame accepted, in pixels.
    pub max_width: u32,
    /// Tallest frame accepted, in pixels.
    pub max_height: u32,
    /// Largest buffer the decoder allocates for one frame, in bytes.
    ///
    /// Checked against the stored, decoded and output sizes before any pixel
    /// data is read, so a header declaring more than a file could hold fails
    /// with [`IoError::UnsupportedPixelLayout`] instead of allocating.
    pub max_frame_bytes: u64,
}

/// Default [`ReadOptions::max_width`] and [`ReadOptions::max_height`].
pub const DEFAULT_MAX_DIMENSION: u32 = 1 << 15;

/// Default [`ReadOptions::max_frame_bytes`].
pub const DEFAULT_MAX_FRAME_BYTES: u64 = 1 << 31;

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            mmap: MmapMode::Auto,
            film_print: FilmPrintMode::Auto,
            film_print_params: None,
            lut_output: DataType::F32,
            convert_to: None,
            max_width: DEFAULT_MAX_DIMENSION,
            max_height: DEFAULT_MAX_DIMENSION,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ReadOptions {
    /// Sets the memory mapping policy.
    pub fn with_mmap(mut self, mode: MmapMode) -> Self {
        self.mmap = mode;
        self
    }

    /// Sets the film-print LUT policy.
    pub fn with_film_print(mut self, mode: FilmPrintMode) -> Self {
        self.film_print = mode;
        self
    }

    /// Overrides the LUT parameters.
    pub fn with_film_print_params(mut self, params: FilmPrintParams) -> Self {
        self.film_print_params = Some(params);
        self
    }

    /// Sets the LUT output type.
    pub fn with_lut_output(mut self, dt: DataType) -> Self {
        self.lut_output = dt;
        self
    }

    /// Converts decoded frames to `pixel_type`.
    pub fn with_convert_to(mut self, pixel_type: PixelType) -> Self {
        self.convert_to = Some(pixel_type);
        self
    }

    /// Sets the largest accepted frame dimensions.
    pub fn with_max_size(mut self, width: u32, height: u32) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }

    /// Sets the largest per-frame allocation.
    pub fn with_max_frame_bytes(mut self, bytes: u64) -> Self {
        self.max_frame_bytes = bytes;
        self
    }
}

/// Stage reached by the last [`FrameDecoder::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeState {
    /// No file opened yet.
    Unopened,
    /// Header parsed.
    HeaderParsed,
    /// RLE scanlines decoded.
    RleDecoded,
    /// Stored pixel data read.
    RawRead,
    /// Converted to the output layout.
    Converted,
    /// Film-print LUT applied.
    ColorProfileApplied,
    /// Frame complete.
    Ready,
    /// Decode failed; terminal.
    Failed(ErrorKind),
}

/// Pixel data as read from the file.
enum RawData {
    /// Zero-copy view already in output layout.
    Mapped(RawFrameBuffer),
    /// Stored bytes, laid out per the header's encoding.
    Stored(Vec<u8>),
    /// Interleaved native-endian samples at full resolution.
    Native(Vec<u8>),
}

/// Byte counts of a short file: required and present.
type Shortfall = Option<(u64, u64)>;

/// Decodes frame files.
///
/// Frames share the LUT cache and the sequence ranges found on disk; each
/// sequence directory is scanned once per decoder.
pub struct FrameDecoder<'a> {
    options: ReadOptions,
    cache: &'a FilmPrintLutCache,
    sequences: SequenceResolver,
    state: DecodeState,
}

impl FrameDecoder<'static> {
    /// Creates a decoder using the process-wide LUT cache.
    pub fn new(options: ReadOptions) -> Self {
        Self::with_cache(options, FilmPrintLutCache::global())
    }
}

impl<'a> FrameDecoder<'a> {
    /// Creates a decoder using `cache` for film-print LUTs.
    pub fn with_cache(options: ReadOptions, cache: &'a FilmPrintLutCache) -> Self {
        Self {
            options,
            cache,
            sequences: SequenceResolver::new(),
            state: DecodeState::Unopened,
        }
    }

    /// Decoder options.
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Forgets cached sequence ranges, so frames added on disk since the
    /// last read are reported.
    pub fn rescan(&mut self) {
        self.sequences.clear();
    }

    /// Stage reached by the last read.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Decodes `frame` of the sequence at `path`, reduced by `2^proxy`.
    ///
    /// A file shorter than its header declares fails with
    /// [`IoError::Truncated`] carrying the frame decoded so far, with
    /// missing scanlines zeroed.
    pub fn read<P: AsRef<Path>>(
        &mut self,
        path: P,
        frame: Option<i64>,
        proxy: u32,
    ) -> IoResult<Frame> {
        self.state = DecodeState::Unopened;
        match self.decode(path.as_ref(), frame, proxy) {
            Ok(frame) => {
                self.transition(DecodeState::Ready);
                Ok(frame)
            }
            Err(e) => {
                self.transition(DecodeState::Failed(e.kind()));
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: DecodeState) {
        trace!("decoder {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn decode(&mut self, path: &Path, frame: Option<i64>, proxy: u32) -> IoResult<Frame> {
        let resolved = self.sequences.resolve(path, frame)?;
        let mut io = FileIo::open(&resolved.path, self.options.mmap)?;
        let format = Format::detect(&mut io)?;
        let mut header = format.load(&mut io)?;
        header.info.sequence = resolved.range;
        if header.info.size.is_empty() {
            return Err(IoError::unsupported_layout("zero-sized image"));
        }
        if header.film_print {
            header.info.color_profile = ColorProfileKind::FilmPrint;
        }
        self.transition(DecodeState::HeaderParsed);

        let apply_lut = header.film_print && self.options.film_print == FilmPrintMode::Auto;
        self.check_limits(&header, apply_lut)?;
        let out_layout = DataLayout {
            mirror_x: header.info.layout.mirror_x,
            mirror_y: header.info.layout.mirror_y,
            ..DataLayout::default()
        };
        let out_info = PixelDataInfo {
            layout: out_layout,
            ..header.info.with_proxy(proxy).pixel_data()
        };

        let stored = header.info.pixel_data();
        let zero_copy = proxy == 0
            && !apply_lut
            && self
                .options
                .convert_to
                .is_none_or(|pt| pt == header.info.pixel_type)
            && matches!(header.encoding, DataEncoding::Interleaved)
            && (stored.layout.endian.is_native() || stored.pixel_type.bytes_per_channel() == 1)
            && stored.scanline_byte_count() == stored.row_bytes();

        let (raw, shortfall) = match &header.encoding {
            DataEncoding::Rle(table) => {
                let result = self.read_rle(&mut io, &header, table)?;
                self.transition(DecodeState::RleDecoded);
                result
            }
            DataEncoding::Ascii => {
                let result = read_ascii(&mut io, &header)?;
                self.transition(DecodeState::RawRead);
                result
            }
            _ => {
                let result = read_stored(&mut io, &header, zero_copy.then_some(out_info))?;
                self.transition(DecodeState::RawRead);
                result
            }
        };

        let mut buffer = match raw {
            RawData::Mapped(buffer) => buffer,
            RawData::Native(data) => {
                let src = PixelDataInfo {
                    layout: out_layout,
                    ..header.info.pixel_data()
                };
                convert_to_output(&data, &src, out_info, proxy)?
            }
            RawData::Stored(data) => convert_stored(&data, &header, out_info, proxy)?,
        };
        self.transition(DecodeState::Converted);

        if apply_lut {
            let params = self.lut_params(&header.hints);
            let lut = self.cache.get_or_build(params)?;
            buffer = lut.apply(&buffer, self.options.lut_output)?;
            self.transition(DecodeState::ColorProfileApplied);
        }

        let target = self
            .options
            .convert_to
            .filter(|&pt| pt != buffer.info().pixel_type);
        if let Some(pt) = target {
            let dst_info = PixelDataInfo {
                pixel_type: pt,
                ..*buffer.info()
            };
            let mut dst = RawFrameBuffer::new(dst_info);
            convert_image(buffer.as_bytes(), buffer.info(), dst.bytes_mut(), &dst_info, 0)?;
            buffer = dst;
        }

        let mut info = header.info.with_proxy(proxy);
        info.pixel_type = buffer.info().pixel_type;
        info.layout = buffer.info().layout;
        let frame = Frame { info, buffer };

        match shortfall {
            Some((expected, actual)) => {
                warn!(
                    "{}: truncated, {} of {} bytes",
                    resolved.path.display(),
                    actual,
                    expected
                );
                Err(IoError::Truncated {
                    expected,
                    actual,
                    partial: Some(Box::new(frame)),
                })
            }
            None => Ok(frame),
        }
    }

    /// Rejects frames larger than the configured limits, before anything is
    /// allocated for them.
    fn check_limits(&self, header: &FrameHeader, apply_lut: bool) -> IoResult<()> {
        let info = &header.info;
        let (w, h) = (info.size.w, info.size.h);
        if w > self.options.max_width || h > self.options.max_height {
            return Err(IoError::unsupported_layout(format!(
                "{}x{} exceeds the {}x{} size limit",
                w, h, self.options.max_width, self.options.max_height
            )));
        }

        let pixel_type = info.pixel_type;
        let mut pixel_bytes = pixel_type.bytes_per_pixel();
        if apply_lut {
            pixel_bytes = pixel_bytes
                .max(pixel_type.channel_count() * self.options.lut_output.bytes_per_channel());
        }
        if let Some(pt) = self.options.convert_to {
            pixel_bytes = pixel_bytes.max(pt.bytes_per_pixel());
        }
        let overflow = || IoError::unsupported_layout(format!("{w}x{h} frame size overflows"));
        let stored = header.encoding.data_bytes(info)?.unwrap_or(0);
        let decoded = info.pixel_data().checked_data_byte_count().ok_or_else(overflow)? as u64;
        let output = (w as u64)
            .checked_mul(h as u64)
            .and_then(|n| n.checked_mul(pixel_bytes as u64))
            .ok_or_else(overflow)?;

        let largest = stored.max(decoded).max(output);
        if largest > self.options.max_frame_bytes {
            return Err(IoError::unsupported_layout(format!(
                "{}x{} {} needs {} bytes, limit is {}",
                w, h, pixel_type, largest, self.options.max_frame_bytes
            )));
        }
        Ok(())
    }

    /// LUT parameters: the explicit override, else defaults refined by the
    /// header hints when those form a valid curve.
    fn lut_params(&self, hints: &FilmPrintHints) -> FilmPrintParams {
        if let Some(params) = self.options.film_print_params {
            return params;
        }
        let defaults = FilmPrintParams::default();
        let mut params = defaults;
        if let Some(v) = hints.gamma {
            params = params.with_gamma(v);
        }
        if let Some(v) = hints.black_point {
            params = params.with_black_point(v);
        }
        if let Some(v) = hints.white_point {
            params = params.with_white_point(v);
        }
        if let Some(v) = hints.break_point {
            params = params.with_break_point(v);
        }
        match params.validate() {
            Ok(()) => params,
            Err(e) => {
                warn!("ignoring film-print header hints: {}", e);
                defaults
            }
        }
    }

    /// Decodes every scanline of every channel, then interleaves.
    ///
    /// Scanlines whose compressed bytes lie past the end of the file are
    /// left zeroed and reported as a shortfall.
    fn read_rle(
        &self,
        io: &mut FileIo,
        header: &FrameHeader,
        table: &RleScanlineTable,
    ) -> IoResult<(RawData, Shortfall)> {
        io.read_ahead();
        let owned = if io.is_mapped() {
            None
        } else {
            let mut bytes = vec![0u8; io.size() as usize];
            io.set_pos(0)?;
            io.read_bytes(&mut bytes)?;
            Some(bytes)
        };
        let file: &[u8] = match (&owned, io.mapped()) {
            (Some(bytes), _) => bytes,
            (None, Some(map)) => map,
            (None, None) => &[],
        };

        let info = &header.info;
        let w = info.size.w as usize;
        let h = info.size.h as usize;
        let channels = info.pixel_type.channel_count();
        let bpc = info.pixel_type.bytes_per_channel();
        let row = w * bpc;
        let plane = row * h;
        let mut planes = vec![0u8; plane * channels];
        let mut short = false;

        for c in 0..channels {
            for y in 0..h {
                let failure = || IoError::RleDecodeFailure {
                    channel: c as u32,
                    scanline: y as u32,
                };
                let (offset, size) = table.get(c as u32, y as u32).ok_or_else(failure)?;
                let start = offset as usize;
                let Some(compressed) = file.get(start..start.saturating_add(size as usize)) else {
                    short = true;
                    continue;
                };
                let out = &mut planes[c * plane + y * row..c * plane + (y + 1) * row];
                if !decode_scanline(compressed, out, w, bpc, Endian::Msb) {
                    return Err(failure());
                }
            }
        }

        let mut data = vec![0u8; plane * channels];
        let views: Vec<&[u8]> = planes.chunks_exact(plane.max(1)).take(channels).collect();
        if plane > 0 {
            planar_interleave(&views, &mut data, w * h, bpc)?;
        }
        debug!(
            "RLE decoded {} channels x {} scanlines ({} compressed bytes)",
            channels,
            h,
            table.end().saturating_sub(header.data_offset)
        );
        let shortfall = short.then(|| (table.end(), io.size()));
        Ok((RawData::Native(data), shortfall))
    }
}

/// Reads fixed-size pixel data.
///
/// When the whole frame is present the file is mapped (as the mode allows)
/// and, if `zero_copy` carries the output description, the buffer views the
/// map directly. Otherwise scanline units are read one at a time and a short
/// file leaves the missing ones zeroed.
fn read_stored(
    io: &mut FileIo,
    header: &FrameHeader,
    zero_copy: Option<PixelDataInfo>,
) -> IoResult<(RawData, Shortfall)> {
    let info = &header.info;
    let encoding = &header.encoding;
    let expected = encoding.data_bytes(info)?.unwrap_or(0);
    let end = header.data_offset.saturating_add(expected);
    io.set_pos(header.data_offset.min(io.size()))?;

    if io.pos() == header.data_offset && io.remaining() >= expected {
        io.read_ahead();
        let region = zero_copy.and_then(|out| Some((out, io.mapped_region(expected as usize)?)));
        if let Some((out_info, (map, offset))) = region {
            debug!("{}: zero-copy mapped frame", io.path().display());
            return Ok((
                RawData::Mapped(RawFrameBuffer::mapped(out_info, map, offset)?),
                None,
            ));
        }
        let mut data = vec![0u8; expected as usize];
        io.read_bytes(&mut data)?;
        debug!(
            "{}: read {} bytes ({})",
            io.path().display(),
            expected,
            if io.is_mapped() { "mapped" } else { "buffered" }
        );
        return Ok((RawData::Stored(data), None));
    }

    let unit = encoding.scanline_bytes(info)?;
    let mut data = vec![0u8; expected as usize];
    let mut units = 0;
    for chunk in data.chunks_mut(unit.max(1)) {
        if io.read_available(chunk)? < chunk.len() {
            chunk.fill(0);
            break;
        }
        units += 1;
    }
    debug!(
        "{}: buffered read of short file, {} of {} scanlines",
        io.path().display(),
        units,
        encoding.scanline_count(info)?
    );
    Ok((RawData::Stored(data), Some((end, io.size()))))
}

#[cfg(feature = "ppm")]
fn read_ascii(io: &mut FileIo, header: &FrameHeader) -> IoResult<(RawData, Shortfall)> {
    io.set_pos(header.data_offset.min(io.size()))?;
    let (data, rows) = crate::ppm::read_ascii(io, &header.info)?;
    let h = header.info.size.h as usize;
    let row = header.info.pixel_data().row_bytes() as u64;
    let shortfall = (rows < h).then(|| (row * h as u64, row * rows as u64));
    Ok((RawData::Native(data), shortfall))
}

#[cfg(not(feature = "ppm"))]
fn read_ascii(_io: &mut FileIo, _header: &FrameHeader) -> IoResult<(RawData, Shortfall)> {
    Err(IoError::UnsupportedFormat("PPM support is disabled".into()))
}

/// Brings decoded samples to the output description.
fn convert_to_output(
    data: &[u8],
    src: &PixelDataInfo,
    out_info: PixelDataInfo,
    proxy: u32,
) -> IoResult<RawFrameBuffer> {
    if proxy == 0 && *src == out_info {
        return Ok(RawFrameBuffer::from_vec(out_info, data.to_vec())?);
    }
    let mut buffer = RawFrameBuffer::new(out_info);
    convert_image(data, src, buffer.bytes_mut(), &out_info, proxy)?;
    Ok(buffer)
}

/// Unpacks, interleaves or converts stored bytes per the header encoding.
fn convert_stored(
    data: &[u8],
    header: &FrameHeader,
    out_info: PixelDataInfo,
    proxy: u32,
) -> IoResult<RawFrameBuffer> {
    let info = &header.info;
    let file_layout = info.layout;
    match header.encoding {
        DataEncoding::PackedRgbU10 => {
            let w = info.size.w as usize;
            let step = proxy_scale(proxy) as usize;
            let mut buffer = RawFrameBuffer::new(out_info);
            let out_w = out_info.size.w as usize;
            for y in 0..out_info.size.h {
                let sy = (y as usize * step).min(info.size.h as usize - 1);
                let src = &data[sy * w * 4..(sy + 1) * w * 4];
                unpack_rgb_u10(src, file_layout.endian, buffer.scanline_mut(y), out_w, step)?;
            }
            Ok(buffer)
        }
        DataEncoding::Planar => {
            let channels = info.pixel_type.channel_count();
            let bpc = info.pixel_type.bytes_per_channel();
            let samples = info.size.area();
            let plane = samples * bpc;
            let mut interleaved = vec![0u8; data.len()];
            if plane > 0 {
                let views: Vec<&[u8]> = data.chunks_exact(plane).take(channels).collect();
                planar_interleave(&views, &mut interleaved, samples, bpc)?;
            }
            let src = PixelDataInfo {
                layout: DataLayout {
                    alignment: 1,
                    ..file_layout
                },
                ..info.pixel_data()
            };
            let buffer = convert_to_output(&interleaved, &src, out_info, proxy)?;
            Ok(buffer)
        }
        _ => convert_to_output(data, &info.pixel_data(), out_info, proxy),
    }
}
