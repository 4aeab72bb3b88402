//! SGI image header parser.
//!
//! A 512-byte big-endian header followed by either raw planar scanlines or
//! a run-length encoded stream per channel and scanline. Scanlines are
//! stored bottom to top.

use cine_core::{Endian, ImageInfo, PixelType, Size};
use tracing::{debug, warn};

use crate::file_io::FileIo;
use crate::header::{DataEncoding, FilmPrintHints, FrameHeader, valid_text};
use crate::rle::RleScanlineTable;
use crate::{IoError, IoResult};

/// SGI magic number.
pub const MAGIC: u16 = 474;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 512;

const NAME: usize = 24;
const NAME_LEN: usize = 80;
const COLORMAP: usize = 104;

/// Parses the header at the start of `io`, including the scanline table of
/// compressed files.
pub fn load(io: &mut FileIo) -> IoResult<FrameHeader> {
    io.set_pos(0)?;
    io.set_endian(Endian::Msb);
    let magic = io.read_u16()?;
    if magic != MAGIC {
        return Err(IoError::BadMagic {
            format: "SGI",
            found: magic as u32,
        });
    }
    let storage = io.read_u8()?;
    let bytes = io.read_u8()?;
    let _dimension = io.read_u16()?;
    let width = io.read_u16()? as u32;
    let height = io.read_u16()? as u32;
    let channels = io.read_u16()?;
    let pixel_min = io.read_i32()?;
    let pixel_max = io.read_i32()?;
    io.set_pos(COLORMAP as u64)?;
    let colormap = io.read_i32()?;
    if colormap != 0 {
        warn!("SGI colormap type {} decoded as plain channels", colormap);
    }

    let mut block = vec![0u8; HEADER_SIZE];
    io.set_pos(0)?;
    io.read_bytes(&mut block)?;

    let bits = match bytes {
        1 => 8,
        2 => 16,
        _ => {
            return Err(IoError::unsupported_layout(format!(
                "{bytes} bytes per channel"
            )));
        }
    };
    let pixel_type = PixelType::from_int(channels as usize, bits).ok_or_else(|| {
        IoError::unsupported_layout(format!("{channels} channels at {bits} bits"))
    })?;

    let name = io.path().display().to_string();
    let mut info = ImageInfo::new(name, Size::new(width, height), pixel_type);
    info.layout.endian = Endian::Msb;
    info.layout.mirror_y = true;
    if let Some(v) = valid_text(&block[NAME..NAME + NAME_LEN]) {
        info.tags.set("Name", v);
    }

    let encoding = if storage != 0 {
        io.set_pos(HEADER_SIZE as u64)?;
        DataEncoding::Rle(RleScanlineTable::read(io, channels as u32, height)?)
    } else {
        DataEncoding::Planar
    };
    let data_offset = match &encoding {
        DataEncoding::Rle(_) => io.pos(),
        _ => HEADER_SIZE as u64,
    };
    debug!(
        "SGI {}x{} {} {} (pixel range {}..{})",
        width,
        height,
        pixel_type,
        if storage != 0 { "RLE" } else { "raw" },
        pixel_min,
        pixel_max
    );

    Ok(FrameHeader {
        info,
        film_print: false,
        data_offset,
        encoding,
        hints: FilmPrintHints::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::file_io::MmapMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn header(storage: u8, bytes: u8, w: u16, h: u16, c: u16) -> Vec<u8> {
        let mut b = vec![0u8; HEADER_SIZE];
        b[0..2].copy_from_slice(&MAGIC.to_be_bytes());
        b[2] = storage;
        b[3] = bytes;
        b[4..6].copy_from_slice(&3u16.to_be_bytes());
        b[6..8].copy_from_slice(&w.to_be_bytes());
        b[8..10].copy_from_slice(&h.to_be_bytes());
        b[10..12].copy_from_slice(&c.to_be_bytes());
        b[16..20].copy_from_slice(&255u32.to_be_bytes());
        b
    }

    fn load_bytes(bytes: &[u8]) -> IoResult<FrameHeader> {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(bytes).expect("write");
        file.flush().expect("flush");
        let mut io = FileIo::open(file.path(), MmapMode::Never)?;
        load(&mut io)
    }

    #[test]
    fn test_raw_header() {
        let mut b = header(0, 2, 3, 2, 4);
        b[NAME..NAME + 5].copy_from_slice(b"plate");
        let h = load_bytes(&b).expect("load");
        assert_eq!(h.info.size, Size::new(3, 2));
        assert_eq!(h.info.pixel_type, PixelType::RGBA_U16);
        assert_eq!(h.info.layout.endian, Endian::Msb);
        assert!(h.info.layout.mirror_y);
        assert_eq!(h.encoding, DataEncoding::Planar);
        assert_eq!(h.data_offset, 512);
        assert_eq!(h.info.tags.get("Name"), Some("plate"));
    }

    #[test]
    fn test_colormap_still_loads() {
        let mut b = header(0, 1, 2, 2, 1);
        b[COLORMAP..COLORMAP + 4].copy_from_slice(&3i32.to_be_bytes());
        let h = load_bytes(&b).expect("load");
        assert_eq!(h.info.pixel_type, PixelType::L_U8);
    }

    #[test]
    fn test_rle_table() {
        let mut b = header(1, 1, 2, 2, 1);
        for v in [528u32, 530, 2, 2] {
            b.extend_from_slice(&v.to_be_bytes());
        }
        b.extend_from_slice(&[0x02, 7, 0x02, 9]);
        let h = load_bytes(&b).expect("load");
        assert_eq!(h.data_offset, 528);
        match h.encoding {
            DataEncoding::Rle(table) => {
                assert_eq!(table.len(), 2);
                assert_eq!(table.get(0, 1), Some((530, 2)));
            }
            other => panic!("expected RLE, got {other:?}"),
        }
        assert!(!h.info.tags.contains("Name"));
    }

    #[test]
    fn test_rejects() {
        let mut b = header(0, 1, 2, 2, 3);
        b[1] = 0;
        assert_eq!(load_bytes(&b).unwrap_err().kind(), ErrorKind::BadMagic);

        let b = header(0, 4, 2, 2, 3);
        assert_eq!(
            load_bytes(&b).unwrap_err().kind(),
            ErrorKind::UnsupportedPixelLayout
        );

        let b = header(0, 1, 2, 2, 5);
        assert_eq!(
            load_bytes(&b).unwrap_err().kind(),
            ErrorKind::UnsupportedPixelLayout
        );

        let b = header(1, 1, 2, 2, 3);
        assert_eq!(load_bytes(&b).unwrap_err().kind(), ErrorKind::Truncated);
    }
}
