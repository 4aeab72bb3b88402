//! SGI run-length decoding.
//!
//! Every channel of every scanline is compressed separately. A stream is a
//! sequence of tokens, each one sample wide (a byte for 8-bit images, a
//! 16-bit word for 16-bit images):
//!
//! ```text
//! token = 0x80 | n    n literal samples follow
//! token = n           the next sample repeats n times
//! token = 0           end of scanline
//! ```
//!
//! The file locates each stream with a table of absolute offsets and sizes
//! indexed by `channel * height + y`.

use cine_core::Endian;

use crate::file_io::FileIo;
use crate::IoResult;

/// Offset and size of every compressed scanline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RleScanlineTable {
    offsets: Vec<u32>,
    sizes: Vec<u32>,
    height: u32,
}

impl RleScanlineTable {
    /// Reads `channels * height` offsets followed by as many sizes at the
    /// cursor, in the reader's byte order.
    pub fn read(io: &mut FileIo, channels: u32, height: u32) -> IoResult<Self> {
        let n = channels as usize * height as usize;
        let mut offsets = vec![0u32; n];
        let mut sizes = vec![0u32; n];
        io.read_u32_into(&mut offsets)?;
        io.read_u32_into(&mut sizes)?;
        Ok(Self {
            offsets,
            sizes,
            height,
        })
    }

    /// Builds a table from explicit entries.
    pub fn new(offsets: Vec<u32>, sizes: Vec<u32>, height: u32) -> Self {
        Self {
            offsets,
            sizes,
            height,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// `(offset, size)` of scanline `y` of `channel`.
    pub fn get(&self, channel: u32, y: u32) -> Option<(u32, u32)> {
        let i = channel as usize * self.height as usize + y as usize;
        Some((*self.offsets.get(i)?, *self.sizes.get(i)?))
    }

    /// Largest end offset of any scanline.
    pub fn end(&self) -> u64 {
        self.offsets
            .iter()
            .zip(&self.sizes)
            .map(|(&o, &s)| o as u64 + s as u64)
            .max()
            .unwrap_or(0)
    }
}

/// Decodes one compressed scanline into exactly `pixel_count` samples.
///
/// `compressed` holds samples in `endian` order; `out` receives them in
/// native order. Returns false if a token would write past `pixel_count`
/// samples, if the stream ends early, or if `bytes_per_sample` is not 1 or
/// 2.
pub fn decode_scanline(
    compressed: &[u8],
    out: &mut [u8],
    pixel_count: usize,
    bytes_per_sample: usize,
    endian: Endian,
) -> bool {
    match bytes_per_sample {
        1 => decode::<1>(compressed, out, pixel_count, endian),
        2 => decode::<2>(compressed, out, pixel_count, endian),
        _ => false,
    }
}

fn decode<const N: usize>(src: &[u8], out: &mut [u8], pixel_count: usize, endian: Endian) -> bool {
    if out.len() < pixel_count * N {
        return false;
    }
    let swap = N > 1 && !endian.is_native();
    let mut samples = src.chunks_exact(N);
    let mut o = 0;
    while o < pixel_count {
        let Some(token) = samples.next() else {
            return false;
        };
        let token = match (N, endian) {
            (1, _) => token[0] as u16,
            (_, Endian::Msb) => u16::from_be_bytes([token[0], token[1]]),
            (_, Endian::Lsb) => u16::from_le_bytes([token[0], token[1]]),
        };
        let count = (token & 0x7f) as usize;
        if count == 0 || o + count > pixel_count {
            return false;
        }
        let dst = &mut out[o * N..(o + count) * N];
        if token & 0x80 != 0 {
            for d in dst.chunks_exact_mut(N) {
                let Some(s) = samples.next() else {
                    return false;
                };
                d.copy_from_slice(s);
                if swap {
                    d.reverse();
                }
            }
        } else {
            let Some(s) = samples.next() else {
                return false;
            };
            let mut v = [0u8; N];
            v.copy_from_slice(s);
            if swap {
                v.reverse();
            }
            for d in dst.chunks_exact_mut(N) {
                d.copy_from_slice(&v);
            }
        }
        o += count;
    }
    true
}
