//! Pixel storage for one decoded frame.
//!
//! A [`RawFrameBuffer`] holds exactly `data_byte_count()` bytes of pixel
//! data described by a [`PixelDataInfo`]. The bytes live either in an owned
//! heap allocation or in a window of a memory-mapped file:
//!
//! ```text
//! Owned(Vec<u8>)                       freed on drop
//! Mapped { Arc<Mmap>, offset, len }    mapping lives while any buffer holds it
//! ```
//!
//! The mapped variant shares the map through an [`Arc`], so a buffer can be
//! moved to another thread or outlive the reader that produced it. Writing
//! to a mapped buffer detaches it first.
//!
//! # Example
//!
//! ```rust
//! use cine_core::{PixelDataInfo, PixelType, RawFrameBuffer, Size};
//!
//! let info = PixelDataInfo::new(Size::new(4, 2), PixelType::RGB_U8);
//! let mut buf = RawFrameBuffer::new(info);
//! assert_eq!(buf.as_bytes().len(), 24);
//! buf.bytes_mut()[0] = 255;
//! assert_eq!(buf.scanline(0)[0], 255);
//! ```

use std::fmt;
use std::sync::Arc;

use memmap2::Mmap;

use crate::convert::load_sample;
use crate::error::{Error, Result};
use crate::format::DataType;
use crate::info::PixelDataInfo;

/// Backing storage of a frame buffer.
enum Storage {
    Owned(Vec<u8>),
    Mapped {
        map: Arc<Mmap>,
        offset: usize,
        len: usize,
    },
}

/// Pixel data for one frame, owned or memory-mapped.
pub struct RawFrameBuffer {
    info: PixelDataInfo,
    storage: Storage,
}

impl RawFrameBuffer {
    /// Allocates a zeroed owned buffer.
    pub fn new(info: PixelDataInfo) -> Self {
        Self {
            storage: Storage::Owned(vec![0; info.data_byte_count()]),
            info,
        }
    }

    /// Wraps owned bytes. The length must equal `info.data_byte_count()`.
    pub fn from_vec(info: PixelDataInfo, data: Vec<u8>) -> Result<Self> {
        let expected = info.data_byte_count();
        if data.len() != expected {
            return Err(Error::size_mismatch(expected, data.len()));
        }
        Ok(Self {
            info,
            storage: Storage::Owned(data),
        })
    }

    /// Views `info.data_byte_count()` bytes of `map` starting at `offset`.
    pub fn mapped(info: PixelDataInfo, map: Arc<Mmap>, offset: usize) -> Result<Self> {
        let len = info.data_byte_count();
        let available = map.len().saturating_sub(offset);
        if available < len {
            return Err(Error::size_mismatch(len, available));
        }
        Ok(Self {
            info,
            storage: Storage::Mapped { map, offset, len },
        })
    }

    /// Description of the pixel data.
    #[inline]
    pub fn info(&self) -> &PixelDataInfo {
        &self.info
    }

    /// Whether the bytes live in a memory map.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self.storage, Storage::Mapped { .. })
    }

    /// Total bytes, including scanline padding.
    #[inline]
    pub fn data_byte_count(&self) -> usize {
        self.info.data_byte_count()
    }

    /// All pixel bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Owned(v) => v,
            Storage::Mapped { map, offset, len } => &map[*offset..*offset + *len],
        }
    }

    /// Mutable pixel bytes. Detaches a mapped buffer first.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.detach();
        match &mut self.storage {
            Storage::Owned(v) => v,
            Storage::Mapped { .. } => unreachable!("detached above"),
        }
    }

    /// Copies mapped bytes into owned memory. No-op for owned buffers.
    pub fn detach(&mut self) {
        if let Storage::Mapped { .. } = self.storage {
            self.storage = Storage::Owned(self.as_bytes().to_vec());
        }
    }

    /// Sets every byte to zero.
    pub fn zero(&mut self) {
        if self.is_mapped() {
            self.storage = Storage::Owned(vec![0; self.info.data_byte_count()]);
        } else if let Storage::Owned(v) = &mut self.storage {
            v.fill(0);
        }
    }

    /// Significant bytes of scanline `y`, without alignment padding.
    ///
    /// # Panics
    ///
    /// Panics if `y` is out of range.
    pub fn scanline(&self, y: u32) -> &[u8] {
        let start = y as usize * self.info.scanline_byte_count();
        &self.as_bytes()[start..start + self.info.row_bytes()]
    }

    /// Mutable significant bytes of scanline `y`.
    pub fn scanline_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.info.scanline_byte_count();
        let row = self.info.row_bytes();
        &mut self.bytes_mut()[start..start + row]
    }

    /// Consumes the buffer, returning owned bytes.
    pub fn into_vec(self) -> Vec<u8> {
        match self.storage {
            Storage::Owned(v) => v,
            Storage::Mapped { map, offset, len } => map[offset..offset + len].to_vec(),
        }
    }
}

impl Clone for RawFrameBuffer {
    fn clone(&self) -> Self {
        let storage = match &self.storage {
            Storage::Owned(v) => Storage::Owned(v.clone()),
            Storage::Mapped { map, offset, len } => Storage::Mapped {
                map: Arc::clone(map),
                offset: *offset,
                len: *len,
            },
        };
        Self {
            info: self.info,
            storage,
        }
    }
}

/// Buffers are equal when they describe the same size and pixel type and
/// every scanline holds the same samples. Alignment padding is ignored;
/// U10 samples compare only their 10 significant bits.
impl PartialEq for RawFrameBuffer {
    fn eq(&self, other: &Self) -> bool {
        if self.info.size != other.info.size || self.info.pixel_type != other.info.pixel_type {
            return false;
        }
        let dt = self.info.pixel_type.data_type;
        let same_endian = self.info.layout.endian == other.info.layout.endian;
        (0..self.info.size.h).all(|y| {
            let (a, b) = (self.scanline(y), other.scanline(y));
            if dt != DataType::U10 && same_endian {
                return a == b;
            }
            let bpc = dt.bytes_per_channel();
            a.chunks_exact(bpc).zip(b.chunks_exact(bpc)).all(|(sa, sb)| {
                load_sample(dt, sa, self.info.layout.endian)
                    == load_sample(dt, sb, other.info.layout.endian)
            })
        })
    }
}

impl fmt::Debug for RawFrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFrameBuffer")
            .field("size", &self.info.size)
            .field("pixel_type", &self.info.pixel_type)
            .field("bytes", &self.data_byte_count())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelType;
    use crate::info::{Endian, Size};
    use std::io::Write;

    fn mmap_of(bytes: &[u8]) -> Arc<Mmap> {
        let mut file = tempfile::tempfile().expect("tempfile");
        file.write_all(bytes).expect("write");
        file.flush().expect("flush");
        Arc::new(unsafe { Mmap::map(&file) }.expect("mmap"))
    }

    #[test]
    fn test_new_is_zeroed() {
        let info = PixelDataInfo::new(Size::new(3, 3), PixelType::RGBA_F32);
        let buf = RawFrameBuffer::new(info);
        assert_eq!(buf.as_bytes().len(), 3 * 3 * 16);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
        assert!(!buf.is_mapped());
    }

    #[test]
    fn test_from_vec_size_check() {
        let info = PixelDataInfo::new(Size::new(2, 2), PixelType::L_U8);
        assert!(RawFrameBuffer::from_vec(info, vec![0; 4]).is_ok());
        let err = RawFrameBuffer::from_vec(info, vec![0; 3]).unwrap_err();
        assert!(err.is_size_mismatch());
    }

    #[test]
    fn test_mapped_and_detach() {
        let map = mmap_of(&[9, 9, 1, 2, 3, 4]);
        let info = PixelDataInfo::new(Size::new(2, 2), PixelType::L_U8);
        let mut buf = RawFrameBuffer::mapped(info, Arc::clone(&map), 2).expect("mapped");
        assert!(buf.is_mapped());
        assert_eq!(buf.as_bytes(), &[1, 2, 3, 4]);

        let copy = buf.clone();
        buf.detach();
        assert!(!buf.is_mapped());
        assert_eq!(buf, copy);

        buf.bytes_mut()[0] = 7;
        assert_ne!(buf, copy);
        assert_eq!(copy.as_bytes()[0], 1);
    }

    #[test]
    fn test_mapped_out_of_range() {
        let map = mmap_of(&[0; 8]);
        let info = PixelDataInfo::new(Size::new(4, 2), PixelType::L_U8);
        assert!(RawFrameBuffer::mapped(info, map, 1).is_err());
    }

    #[test]
    fn test_zero_mapped() {
        let map = mmap_of(&[5; 4]);
        let info = PixelDataInfo::new(Size::new(4, 1), PixelType::L_U8);
        let mut buf = RawFrameBuffer::mapped(info, map, 0).expect("mapped");
        buf.zero();
        assert!(!buf.is_mapped());
        assert_eq!(buf.as_bytes(), &[0; 4]);
    }

    #[test]
    fn test_eq_ignores_padding() {
        let mut info = PixelDataInfo::new(Size::new(1, 2), PixelType::RGB_U8);
        info.layout.alignment = 4;
        let a = RawFrameBuffer::from_vec(info, vec![1, 2, 3, 0, 4, 5, 6, 0]).unwrap();
        let b = RawFrameBuffer::from_vec(info, vec![1, 2, 3, 99, 4, 5, 6, 77]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_eq_masks_u10() {
        let info = PixelDataInfo::new(Size::new(1, 1), PixelType::L_U10);
        let a = RawFrameBuffer::from_vec(info, 0x0155u16.to_ne_bytes().to_vec()).unwrap();
        let b = RawFrameBuffer::from_vec(info, 0xfd55u16.to_ne_bytes().to_vec()).unwrap();
        let c = RawFrameBuffer::from_vec(info, 0x0154u16.to_ne_bytes().to_vec()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_eq_across_endian() {
        let mut be = PixelDataInfo::new(Size::new(1, 1), PixelType::L_U16);
        be.layout.endian = Endian::Msb;
        let mut le = be;
        le.layout.endian = Endian::Lsb;
        let a = RawFrameBuffer::from_vec(be, vec![0x12, 0x34]).unwrap();
        let b = RawFrameBuffer::from_vec(le, vec![0x34, 0x12]).unwrap();
        assert_eq!(a, b);
    }
}
