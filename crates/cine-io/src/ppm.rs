//! Netpbm graymap and pixmap support.
//!
//! Binary (`P5`, `P6`) and plain (`P2`, `P3`) variants. The header is a
//! run of whitespace-separated decimal fields with `#` comments:
//!
//! ```text
//! P6
//! # comment
//! 2048 1556
//! 65535
//! <one whitespace byte><samples>
//! ```
//!
//! Maximum values up to 255 give 8-bit samples, larger ones 16-bit
//! big-endian samples. Samples are not rescaled when the maximum is below
//! the storage maximum.

use cine_core::{Endian, ImageInfo, PixelType, Size};
use tracing::debug;

use crate::file_io::FileIo;
use crate::header::{DataEncoding, FilmPrintHints, FrameHeader};
use crate::{IoError, IoResult};

/// Parses the header at the start of `io`.
pub fn load(io: &mut FileIo) -> IoResult<FrameHeader> {
    io.set_pos(0)?;
    io.set_endian(Endian::Msb);
    let mut magic = [0u8; 2];
    io.read_bytes(&mut magic)?;
    let (channels, ascii) = match &magic {
        b"P2" => (1, true),
        b"P3" => (3, true),
        b"P5" => (1, false),
        b"P6" => (3, false),
        _ => {
            return Err(IoError::BadMagic {
                format: "PPM",
                found: u16::from_be_bytes(magic) as u32,
            });
        }
    };

    let width = read_integer(io)?;
    let height = read_integer(io)?;
    let max_value = read_integer(io)?;
    if max_value == 0 || max_value > u16::MAX as u32 {
        return Err(IoError::Parse(format!("PPM max value {max_value}")));
    }
    let bits = if max_value > 255 { 16 } else { 8 };
    let pixel_type = PixelType::from_int(channels, bits)
        .ok_or_else(|| IoError::unsupported_layout(format!("{channels} channels")))?;

    let name = io.path().display().to_string();
    let mut info = ImageInfo::new(name, Size::new(width, height), pixel_type);
    info.layout.endian = Endian::Msb;

    debug!(
        "PPM {}x{} {} max {} {}",
        width,
        height,
        pixel_type,
        max_value,
        if ascii { "plain" } else { "binary" }
    );

    Ok(FrameHeader {
        info,
        film_print: false,
        data_offset: io.pos(),
        encoding: if ascii {
            DataEncoding::Ascii
        } else {
            DataEncoding::Interleaved
        },
        hints: FilmPrintHints::default(),
    })
}

/// Skips whitespace and comments, leaving the cursor on the next field.
fn skip_spaces(io: &mut FileIo) -> IoResult<()> {
    loop {
        let byte = io.read_u8()?;
        if byte == b'#' {
            while io.read_u8()? != b'\n' {}
        } else if !byte.is_ascii_whitespace() {
            return io.seek(-1);
        }
    }
}

/// Reads a decimal field and the single whitespace byte after it.
fn read_integer(io: &mut FileIo) -> IoResult<u32> {
    skip_spaces(io)?;
    let mut value: u32 = 0;
    let mut digits = 0;
    loop {
        let byte = io.read_u8()?;
        if byte.is_ascii_digit() {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add((byte - b'0') as u32))
                .ok_or_else(|| IoError::Parse("PPM header field overflows".into()))?;
            digits += 1;
            // A header may end at the last digit of the file.
            if io.is_eof() {
                return Ok(value);
            }
        } else if byte.is_ascii_whitespace() && digits > 0 {
            return Ok(value);
        } else {
            return Err(IoError::Parse(format!(
                "unexpected byte 0x{byte:02x} in PPM header"
            )));
        }
    }
}

/// Parses plain-format samples at the cursor into native-endian storage.
///
/// Returns the samples and the number of complete scanlines found; missing
/// samples are zero.
pub(crate) fn read_ascii(io: &mut FileIo, info: &ImageInfo) -> IoResult<(Vec<u8>, usize)> {
    let mut text = vec![0u8; io.remaining() as usize];
    io.read_bytes(&mut text)?;

    let data_type = info.pixel_type.data_type;
    let bpc = data_type.bytes_per_channel();
    let samples_per_row = info.size.w as usize * info.pixel_type.channel_count();
    let total = samples_per_row * info.size.h as usize;
    let mut out = vec![0u8; total * bpc];

    let tokens = text
        .split(|b| b.is_ascii_whitespace())
        .filter(|t| !t.is_empty())
        .take(total);
    let mut count = 0;
    for (i, token) in tokens.enumerate() {
        let v: u32 = std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IoError::Parse("invalid PPM sample".into()))?;
        let v = v.min(data_type.max_value());
        match bpc {
            1 => out[i] = v as u8,
            _ => out[i * 2..i * 2 + 2].copy_from_slice(&(v as u16).to_ne_bytes()),
        }
        count += 1;
    }
    let rows = if samples_per_row == 0 {
        info.size.h as usize
    } else {
        count / samples_per_row
    };
    Ok((out, rows))
}
