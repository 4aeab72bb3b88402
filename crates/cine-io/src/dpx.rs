//! SMPTE DPX header parser.
//!
//! DPX extends the Cineon layout with a 2048-byte header in five sections:
//!
//! | Offset | Section |
//! |--------|---------|
//! | 0 | file (magic, image offset, creator, project, copyright) |
//! | 768 | image (orientation, element count, size, 8 elements) |
//! | 1408 | orientation (source offset, center, size, border, aspect) |
//! | 1664 | film (edge code, frame, rate, shutter, slate) |
//! | 1920 | television (timecode, gamma, black/white levels) |
//!
//! The magic reads `SDPX` in big-endian files and `XPDS` in little-endian
//! ones. Only the first image element is decoded; files declaring more
//! than one element are rejected.
//!
//! # Supported layouts
//!
//! | Packing | Depth | Descriptor | Result |
//! |---------|-------|------------|--------|
//! | 0 or 1 | 10 | RGB | RGB_U10, one 32-bit word per pixel |
//! | 0 | 8, 16, 32 | L, RGB, RGBA | interleaved samples |
//! | 1 | 16 | L, RGB, RGBA | interleaved samples |

use cine_core::{ColorProfileKind, Endian, ImageInfo, PixelType};
use tracing::debug;

use crate::file_io::FileIo;
use crate::header::{
    DataEncoding, Fields, FilmPrintHints, FrameHeader, image_size, keycode, orientation,
    valid_f32, valid_u8, valid_u16, valid_u32,
};
use crate::{IoError, IoResult};

/// `SDPX` read as a big-endian u32.
pub const MAGIC: u32 = 0x5344_5058;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 2048;

/// Bit pattern of an unset float field.
const F32_UNSET: u32 = 0xffff_ffff;

/// Frame rates at or below this are unset.
const MIN_SPEED: f32 = 1.0e-6;

/// Transfer characteristic of printing density.
const TRANSFER_FILM_PRINT: u8 = 1;

const DESCRIPTOR_L: u8 = 6;
const DESCRIPTOR_RGB: u8 = 50;
const DESCRIPTOR_RGBA: u8 = 51;

// === Offsets ===

const IMAGE_OFFSET: usize = 4;
const FILE_TIME: usize = 136;
const CREATOR: usize = 160;
const PROJECT: usize = 260;
const COPYRIGHT: usize = 460;

const ORIENT: usize = 768;
const ELEM_SIZE: usize = 770;
const SIZE: usize = 772;
const ELEM: usize = 780;
const ELEM_DESCRIPTOR: usize = ELEM + 20;
const ELEM_TRANSFER: usize = ELEM + 21;
const ELEM_BIT_DEPTH: usize = ELEM + 23;
const ELEM_PACKING: usize = ELEM + 24;
const ELEM_ENCODING: usize = ELEM + 26;
const ELEM_LINE_PADDING: usize = ELEM + 32;

const SOURCE_OFFSET: usize = 1408;
const SOURCE_CENTER: usize = 1416;
const SOURCE_SIZE: usize = 1424;
const SOURCE_FILE: usize = 1432;
const SOURCE_TIME: usize = 1532;
const SOURCE_DEVICE: usize = 1556;
const SOURCE_SERIAL: usize = 1588;
const SOURCE_BORDER: usize = 1620;
const SOURCE_ASPECT: usize = 1628;
const SOURCE_SCAN_SIZE: usize = 1636;

const FILM_ID: usize = 1664;
const FILM_TYPE: usize = 1666;
const FILM_OFFSET: usize = 1668;
const FILM_PREFIX: usize = 1670;
const FILM_COUNT: usize = 1676;
const FILM_FORMAT: usize = 1680;
const FILM_FRAME: usize = 1712;
const FILM_SEQUENCE: usize = 1716;
const FILM_HOLD: usize = 1720;
const FILM_FRAME_RATE: usize = 1724;
const FILM_SHUTTER: usize = 1728;
const FILM_FRAME_ID: usize = 1732;
const FILM_SLATE: usize = 1764;

const TV_TIMECODE: usize = 1920;
const TV_INTERLACE: usize = 1928;
const TV_FIELD: usize = 1929;
const TV_VIDEO_SIGNAL: usize = 1930;
const TV_SAMPLE_RATE: usize = 1932;
const TV_FRAME_RATE: usize = 1940;
const TV_TIME_OFFSET: usize = 1944;
const TV_GAMMA: usize = 1948;
const TV_BLACK_LEVEL: usize = 1952;
const TV_BLACK_GAIN: usize = 1956;
const TV_BREAKPOINT: usize = 1960;
const TV_WHITE_LEVEL: usize = 1964;
const TV_INTEGRATION_TIMES: usize = 1968;

/// Byte order implied by the magic number, if it is a DPX magic.
pub fn magic_endian(magic: u32) -> Option<Endian> {
    if magic == MAGIC {
        Some(Endian::Msb)
    } else if magic == MAGIC.swap_bytes() {
        Some(Endian::Lsb)
    } else {
        None
    }
}

/// Parses the header at the start of `io`.
pub fn load(io: &mut FileIo) -> IoResult<FrameHeader> {
    io.set_pos(0)?;
    io.set_endian(Endian::Msb);
    let magic = io.read_u32()?;
    let endian = magic_endian(magic).ok_or(IoError::BadMagic {
        format: "DPX",
        found: magic,
    })?;
    io.set_endian(endian);

    let mut block = vec![0u8; HEADER_SIZE];
    io.set_pos(0)?;
    io.read_bytes(&mut block)?;
    let f = Fields::new(&block, endian);

    let elements = f.u16(ELEM_SIZE);
    if elements != 1 {
        return Err(IoError::unsupported_layout(format!(
            "{elements} image elements"
        )));
    }
    if f.u16(ELEM_ENCODING) != 0 {
        return Err(IoError::unsupported_layout("run-length encoded element"));
    }
    if valid_u32(f.u32(ELEM_LINE_PADDING)).is_some_and(|v| v != 0) {
        return Err(IoError::unsupported_layout("line padding"));
    }

    let size = image_size(f.u32(SIZE), f.u32(SIZE + 4))?;
    let descriptor = f.u8(ELEM_DESCRIPTOR);
    let bits = f.u8(ELEM_BIT_DEPTH);
    let packing = f.u16(ELEM_PACKING);
    let (pixel_type, encoding) = pixel_layout(descriptor, bits, packing).ok_or_else(|| {
        IoError::unsupported_layout(format!(
            "descriptor {descriptor}, {bits} bits, packing {packing}"
        ))
    })?;

    let name = io.path().display().to_string();
    let mut info = ImageInfo::new(name, size, pixel_type);
    info.layout.endian = endian;
    (info.layout.mirror_x, info.layout.mirror_y) = orientation(f.u16(ORIENT) as u32);

    let film_print = f.u8(ELEM_TRANSFER) == TRANSFER_FILM_PRINT;
    if film_print {
        info.color_profile = ColorProfileKind::FilmPrint;
    }

    let float = |off| valid_f32(f.f32(off), F32_UNSET);
    let hints = FilmPrintHints {
        gamma: float(TV_GAMMA),
        black_point: float(TV_BLACK_LEVEL),
        white_point: float(TV_WHITE_LEVEL),
        break_point: float(TV_BREAKPOINT),
    };
    read_tags(&f, &mut info);

    let data_offset = match f.u32(IMAGE_OFFSET) {
        0 => HEADER_SIZE as u64,
        n => n as u64,
    };
    debug!(
        "DPX {}x{} {} {:?} packing {} film print {} data at {}",
        size.w, size.h, pixel_type, endian, packing, film_print, data_offset
    );

    Ok(FrameHeader {
        info,
        film_print,
        data_offset,
        encoding,
        hints,
    })
}

fn pixel_layout(descriptor: u8, bits: u8, packing: u16) -> Option<(PixelType, DataEncoding)> {
    let channels = match descriptor {
        DESCRIPTOR_L => 1,
        DESCRIPTOR_RGB => 3,
        DESCRIPTOR_RGBA => 4,
        _ => return None,
    };
    match (packing, bits) {
        (0 | 1, 10) if channels == 3 => Some((PixelType::RGB_U10, DataEncoding::PackedRgbU10)),
        (0, 8 | 16 | 32) | (1, 16) => {
            PixelType::from_int(channels, bits as u32).map(|pt| (pt, DataEncoding::Interleaved))
        }
        _ => None,
    }
}

/// SMPTE timecode stored as BCD `hhmmssff`.
fn timecode(v: u32) -> String {
    let d = |shift: u32| (v >> shift) & 0xff;
    let bcd = |b: u32| (b >> 4) * 10 + (b & 0xf);
    format!(
        "{:02}:{:02}:{:02}:{:02}",
        bcd(d(24)),
        bcd(d(16)),
        bcd(d(8)),
        bcd(d(0))
    )
}

fn read_tags(f: &Fields<'_>, info: &mut ImageInfo) {
    let tags = &mut info.tags;
    let float = |off| valid_f32(f.f32(off), F32_UNSET);
    let pair_u32 = |off| Some(format!("{} {}", valid_u32(f.u32(off))?, valid_u32(f.u32(off + 4))?));
    let pair_f32 = |off| Some(format!("{} {}", float(off)?, float(off + 4)?));
    let numeric_text = |off, len| f.text(off, len)?.trim().parse::<u32>().ok();

    for (key, off, len) in [
        ("Time", FILE_TIME, 24),
        ("Creator", CREATOR, 100),
        ("Project", PROJECT, 200),
        ("Copyright", COPYRIGHT, 200),
    ] {
        if let Some(v) = f.text(off, len) {
            tags.set(key, v);
        }
    }

    // Orientation section
    if let Some(v) = pair_u32(SOURCE_OFFSET) {
        tags.set("Source Offset", v);
    }
    if let Some(v) = pair_f32(SOURCE_CENTER) {
        tags.set("Source Center", v);
    }
    if let Some(v) = pair_u32(SOURCE_SIZE) {
        tags.set("Source Size", v);
    }
    for (key, off, len) in [
        ("Source File", SOURCE_FILE, 100),
        ("Source Time", SOURCE_TIME, 24),
        ("Source Input Device", SOURCE_DEVICE, 32),
        ("Source Input Serial", SOURCE_SERIAL, 32),
    ] {
        if let Some(v) = f.text(off, len) {
            tags.set(key, v);
        }
    }
    let border: Option<Vec<String>> = (0..4)
        .map(|i| valid_u16(f.u16(SOURCE_BORDER + 2 * i)).map(|v| v.to_string()))
        .collect();
    if let Some(border) = border {
        tags.set("Source Border", border.join(" "));
    }
    if let Some(v) = pair_u32(SOURCE_ASPECT) {
        tags.set("Source Pixel Aspect", v);
    }
    if let Some(v) = pair_f32(SOURCE_SCAN_SIZE) {
        tags.set("Source Scan Size", v);
    }

    // Film section
    if let (Some(id), Some(kind), Some(offset), Some(prefix), Some(count)) = (
        numeric_text(FILM_ID, 2),
        numeric_text(FILM_TYPE, 2),
        numeric_text(FILM_OFFSET, 2),
        numeric_text(FILM_PREFIX, 6),
        numeric_text(FILM_COUNT, 4),
    ) {
        tags.set("Keycode", keycode(id, kind, prefix, count, offset));
    }
    if let Some(v) = f.text(FILM_FORMAT, 32) {
        tags.set("Film Format", v);
    }
    for (key, off) in [
        ("Film Frame", FILM_FRAME),
        ("Film Sequence", FILM_SEQUENCE),
        ("Film Hold", FILM_HOLD),
    ] {
        if let Some(v) = valid_u32(f.u32(off)) {
            tags.set(key, v.to_string());
        }
    }
    if let Some(v) = float(FILM_FRAME_RATE).filter(|&v| v > MIN_SPEED) {
        info.frame_rate = Some(v);
        tags.set("Film Frame Rate", v.to_string());
    }
    if let Some(v) = float(FILM_SHUTTER) {
        tags.set("Film Shutter", v.to_string());
    }
    if let Some(v) = f.text(FILM_FRAME_ID, 32) {
        tags.set("Film Frame ID", v);
    }
    if let Some(v) = f.text(FILM_SLATE, 100) {
        tags.set("Film Slate", v);
    }

    // Television section
    let tc = f.u32(TV_TIMECODE);
    if tc != 0xffff_ffff {
        tags.set("Timecode", timecode(tc));
    }
    for (key, off) in [
        ("TV Interlace", TV_INTERLACE),
        ("TV Field", TV_FIELD),
        ("TV Video Signal", TV_VIDEO_SIGNAL),
    ] {
        if let Some(v) = valid_u8(f.u8(off)) {
            tags.set(key, v.to_string());
        }
    }
    if let Some(v) = pair_f32(TV_SAMPLE_RATE) {
        tags.set("TV Sample Rate", v);
    }
    if let Some(v) = float(TV_FRAME_RATE).filter(|&v| v > MIN_SPEED) {
        info.frame_rate = Some(v);
        tags.set("TV Frame Rate", v.to_string());
    }
    for (key, off) in [
        ("TV Time Offset", TV_TIME_OFFSET),
        ("TV Gamma", TV_GAMMA),
        ("TV Black Level", TV_BLACK_LEVEL),
        ("TV Black Gain", TV_BLACK_GAIN),
        ("TV Breakpoint", TV_BREAKPOINT),
        ("TV White Level", TV_WHITE_LEVEL),
        ("TV Integration Times", TV_INTEGRATION_TIMES),
    ] {
        if let Some(v) = float(off) {
            tags.set(key, v.to_string());
        }
    }
}
