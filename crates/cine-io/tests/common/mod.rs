//! Synthetic frame file writers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use cine_core::Endian;

pub fn put_u16(buf: &mut [u8], off: usize, v: u16, endian: Endian) {
    let b = match endian {
        Endian::Msb => v.to_be_bytes(),
        Endian::Lsb => v.to_le_bytes(),
    };
    buf[off..off + 2].copy_from_slice(&b);
}

pub fn put_u32(buf: &mut [u8], off: usize, v: u32, endian: Endian) {
    let b = match endian {
        Endian::Msb => v.to_be_bytes(),
        Endian::Lsb => v.to_le_bytes(),
    };
    buf[off..off + 4].copy_from_slice(&b);
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write frame");
    path
}

/// Packs three 10-bit codes the way Cineon and DPX store them.
pub fn pack_rgb10(r: u32, g: u32, b: u32) -> u32 {
    (r << 22) | (g << 12) | (b << 2)
}

/// Cineon file with one packed word per pixel.
pub fn cineon(w: u32, h: u32, endian: Endian, film_print: bool, gamma: Option<f32>, words: &[u32]) -> Vec<u8> {
    let mut buf = vec![0u8; 2048];
    put_u32(&mut buf, 0, 0x802a_5fd7, endian);
    put_u32(&mut buf, 4, 2048, endian);
    buf[193] = 3;
    for c in 0..3 {
        let base = 196 + 28 * c;
        buf[base + 1] = film_print as u8;
        buf[base + 2] = 10;
        put_u32(&mut buf, base + 4, w, endian);
        put_u32(&mut buf, base + 8, h, endian);
    }
    let gamma_bits = gamma.map(f32::to_bits).unwrap_or(0x7f80_0000);
    put_u32(&mut buf, 980, gamma_bits, endian);
    for word in words {
        let mut b = [0u8; 4];
        put_u32(&mut b, 0, *word, endian);
        buf.extend_from_slice(&b);
    }
    buf
}

/// DPX file with interleaved samples already encoded in `endian`.
pub fn dpx(w: u32, h: u32, endian: Endian, descriptor: u8, bits: u8, packing: u16, data: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 2048];
    put_u32(&mut buf, 0, 0x5344_5058, endian);
    put_u32(&mut buf, 4, 2048, endian);
    put_u16(&mut buf, 770, 1, endian);
    put_u32(&mut buf, 772, w, endian);
    put_u32(&mut buf, 776, h, endian);
    buf[800] = descriptor;
    buf[803] = bits;
    put_u16(&mut buf, 804, packing, endian);
    // Unset TV fields.
    for off in (1940..1972).step_by(4) {
        put_u32(&mut buf, off, 0xffff_ffff, endian);
    }
    buf.extend_from_slice(data);
    buf
}

/// SGI header; `storage` 1 selects RLE.
pub fn sgi_header(storage: u8, bytes: u8, w: u16, h: u16, channels: u16) -> Vec<u8> {
    let mut buf = vec![0u8; 512];
    put_u16(&mut buf, 0, 474, Endian::Msb);
    buf[2] = storage;
    buf[3] = bytes;
    put_u16(&mut buf, 4, 3, Endian::Msb);
    put_u16(&mut buf, 6, w, Endian::Msb);
    put_u16(&mut buf, 8, h, Endian::Msb);
    put_u16(&mut buf, 10, channels, Endian::Msb);
    put_u32(&mut buf, 16, 255, Endian::Msb);
    buf
}

/// Raw SGI file from per-channel planes.
pub fn sgi_raw(w: u16, h: u16, planes: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = sgi_header(0, 1, w, h, planes.len() as u16);
    for plane in planes {
        buf.extend_from_slice(plane);
    }
    buf
}

/// RLE SGI file with one compressed stream per (channel, scanline),
/// ordered channel-major.
pub fn sgi_rle(w: u16, h: u16, channels: u16, scanlines: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = sgi_header(1, 1, w, h, channels);
    let count = scanlines.len();
    let mut offset = 512 + count * 8;
    let mut offsets = Vec::with_capacity(count);
    for s in scanlines {
        offsets.push(offset as u32);
        offset += s.len();
    }
    for o in &offsets {
        buf.extend_from_slice(&o.to_be_bytes());
    }
    for s in scanlines {
        buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
    }
    for s in scanlines {
        buf.extend_from_slice(s);
    }
    buf
}
