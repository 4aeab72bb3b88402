//! Kodak Cineon header parser.
//!
//! A Cineon file starts with a 2048-byte header made of five fixed
//! sections, followed by pixel data at the offset the file section names:
//!
//! | Offset | Section |
//! |--------|---------|
//! | 0 | file (magic, image offset, creation time) |
//! | 192 | image (orientation, 8 channel descriptors, data format) |
//! | 712 | origination (source offset, file, device, gamma) |
//! | 1024 | film (edge code, format, frame rate, slate) |
//!
//! The magic number `0x802A5FD7` is stored in the writer's byte order, which
//! every later field follows. The only supported pixel layout is three
//! 10-bit channels packed into one 32-bit word per pixel.

use cine_core::{ColorProfileKind, Endian, ImageInfo, PixelType};
use tracing::debug;

use crate::file_io::FileIo;
use crate::header::{
    DataEncoding, Fields, FilmPrintHints, FrameHeader, image_size, keycode, orientation,
    valid_f32, valid_i32, valid_u8, valid_u32,
};
use crate::{IoError, IoResult};

/// Cineon magic number.
pub const MAGIC: u32 = 0x802a_5fd7;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 2048;

/// Bit pattern of an unset float field.
const F32_UNSET: u32 = 0x7f80_0000;

/// Frame rates below this are unset.
const MIN_SPEED: f32 = 1.0e-6;

/// Film-print descriptor in byte 1 of a channel designator.
const DESCRIPTOR_FILM_PRINT: u8 = 1;

// === Offsets ===

const IMAGE_OFFSET: usize = 4;
const FILE_TIME: usize = 132;
const ORIENT: usize = 192;
const CHANNELS: usize = 193;
const CHANNEL_BASE: usize = 196;
const CHANNEL_STRIDE: usize = 28;
const LINE_PADDING: usize = 684;
const CHANNEL_PADDING: usize = 688;
const SOURCE_OFFSET: usize = 712;
const SOURCE_FILE: usize = 720;
const SOURCE_TIME: usize = 820;
const SOURCE_DEVICE: usize = 844;
const SOURCE_MODEL: usize = 908;
const SOURCE_SERIAL: usize = 940;
const SOURCE_PITCH: usize = 972;
const SOURCE_GAMMA: usize = 980;
const FILM_ID: usize = 1024;
const FILM_TYPE: usize = 1025;
const FILM_OFFSET: usize = 1026;
const FILM_PREFIX: usize = 1028;
const FILM_COUNT: usize = 1032;
const FILM_FORMAT: usize = 1036;
const FILM_FRAME: usize = 1068;
const FILM_FRAME_RATE: usize = 1072;
const FILM_FRAME_ID: usize = 1076;
const FILM_SLATE: usize = 1108;

/// Byte order implied by the magic number, if it is a Cineon magic.
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
///
/// Leaves the reader's byte order set to the file's.
pub fn load(io: &mut FileIo) -> IoResult<FrameHeader> {
    io.set_pos(0)?;
    io.set_endian(Endian::Msb);
    let magic = io.read_u32()?;
    let endian = magic_endian(magic).ok_or(IoError::BadMagic {
        format: "Cineon",
        found: magic,
    })?;
    io.set_endian(endian);

    let mut block = vec![0u8; HEADER_SIZE];
    io.set_pos(0)?;
    io.read_bytes(&mut block)?;
    let f = Fields::new(&block, endian);

    let channels = f.u8(CHANNELS) as usize;
    if channels == 0 {
        return Err(IoError::unsupported_layout("no image channels"));
    }
    if channels > 8 {
        return Err(IoError::unsupported_layout(format!("{channels} channels")));
    }
    let channel = |i: usize| CHANNEL_BASE + CHANNEL_STRIDE * i;
    let bits = f.u8(channel(0) + 2);
    let size = image_size(f.u32(channel(0) + 4), f.u32(channel(0) + 8))?;
    for i in 1..channels {
        let c = channel(i);
        if f.u8(c + 2) != bits || f.u32(c + 4) != size.w || f.u32(c + 8) != size.h {
            return Err(IoError::unsupported_layout(
                "image channels must share size and bit depth",
            ));
        }
    }
    if channels != 3 || bits != 10 {
        return Err(IoError::unsupported_layout(format!(
            "{channels} channels at {bits} bits"
        )));
    }
    if valid_u32(f.u32(LINE_PADDING)).is_some_and(|v| v != 0) {
        return Err(IoError::unsupported_layout("line padding"));
    }
    if valid_u32(f.u32(CHANNEL_PADDING)).is_some_and(|v| v != 0) {
        return Err(IoError::unsupported_layout("channel padding"));
    }

    let name = io.path().display().to_string();
    let mut info = ImageInfo::new(name, size, PixelType::RGB_U10);
    info.layout.endian = endian;
    (info.layout.mirror_x, info.layout.mirror_y) = orientation(f.u8(ORIENT) as u32);

    let film_print = f.u8(channel(0) + 1) == DESCRIPTOR_FILM_PRINT;
    if film_print {
        info.color_profile = ColorProfileKind::FilmPrint;
    }

    let gamma = valid_f32(f.f32(SOURCE_GAMMA), F32_UNSET);
    read_tags(&f, &mut info);

    let data_offset = match f.u32(IMAGE_OFFSET) {
        0 => HEADER_SIZE as u64,
        n => n as u64,
    };
    debug!(
        "Cineon {}x{} {} {:?} film print {} data at {}",
        size.w, size.h, info.pixel_type, endian, film_print, data_offset
    );

    Ok(FrameHeader {
        info,
        film_print,
        data_offset,
        encoding: DataEncoding::PackedRgbU10,
        hints: FilmPrintHints {
            gamma,
            ..FilmPrintHints::default()
        },
    })
}

fn read_tags(f: &Fields<'_>, info: &mut ImageInfo) {
    let tags = &mut info.tags;
    let float = |off| valid_f32(f.f32(off), F32_UNSET);

    if let Some(v) = f.text(FILE_TIME, 24) {
        tags.set("Time", v);
    }
    if let (Some(x), Some(y)) = (
        valid_i32(f.i32(SOURCE_OFFSET)),
        valid_i32(f.i32(SOURCE_OFFSET + 4)),
    ) {
        tags.set("Source Offset", format!("{x} {y}"));
    }
    for (key, off, len) in [
        ("Source File", SOURCE_FILE, 100),
        ("Source Time", SOURCE_TIME, 24),
        ("Source Input Device", SOURCE_DEVICE, 64),
        ("Source Input Model", SOURCE_MODEL, 32),
        ("Source Input Serial", SOURCE_SERIAL, 32),
    ] {
        if let Some(v) = f.text(off, len) {
            tags.set(key, v);
        }
    }
    if let (Some(x), Some(y)) = (float(SOURCE_PITCH), float(SOURCE_PITCH + 4)) {
        tags.set("Source Input Pitch", format!("{x} {y}"));
    }
    if let Some(v) = float(SOURCE_GAMMA) {
        tags.set("Source Gamma", v.to_string());
    }

    if let (Some(id), Some(kind), Some(offset), Some(prefix), Some(count)) = (
        valid_u8(f.u8(FILM_ID)),
        valid_u8(f.u8(FILM_TYPE)),
        valid_u8(f.u8(FILM_OFFSET)),
        valid_u32(f.u32(FILM_PREFIX)),
        valid_u32(f.u32(FILM_COUNT)),
    ) {
        tags.set(
            "Keycode",
            keycode(id as u32, kind as u32, prefix, count, offset as u32),
        );
    }
    if let Some(v) = f.text(FILM_FORMAT, 32) {
        tags.set("Film Format", v);
    }
    if let Some(v) = valid_u32(f.u32(FILM_FRAME)) {
        tags.set("Film Frame", v.to_string());
    }
    if let Some(v) = float(FILM_FRAME_RATE).filter(|&v| v >= MIN_SPEED) {
        info.frame_rate = Some(v);
        tags.set("Film Frame Rate", v.to_string());
    }
    if let Some(v) = f.text(FILM_FRAME_ID, 32) {
        tags.set("Film Frame ID", v);
    }
    if let Some(v) = f.text(FILM_SLATE, 200) {
        tags.set("Film Slate", v);
    }
}
