//! File reader with a memory-mapped fast path.
//!
//! [`FileIo`] reads either from a read-only memory map of the whole file or
//! through positioned reads on the file handle. Both paths share one cursor
//! and one byte order for scalar reads, so header parsers do not care which
//! one is active.
//!
//! | Mode | Map created | Map failure |
//! |------|-------------|-------------|
//! | [`MmapMode::Auto`] | on [`FileIo::read_ahead`] | logged, buffered reads |
//! | [`MmapMode::Always`] | on open | open fails |
//! | [`MmapMode::Never`] | never | - |

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use cine_core::Endian;
use memmap2::Mmap;
use tracing::{debug, warn};

use crate::{IoError, IoResult};

/// When to memory-map the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MmapMode {
    /// Map when pixel data is about to be read; fall back to buffered
    /// reads if mapping fails.
    #[default]
    Auto,
    /// Map on open; mapping failure is an error.
    Always,
    /// Never map.
    Never,
}

/// Open file with a read cursor.
#[derive(Debug)]
pub struct FileIo {
    path: PathBuf,
    file: File,
    size: u64,
    pos: u64,
    endian: Endian,
    mode: MmapMode,
    map: Option<Arc<Mmap>>,
}

impl FileIo {
    /// Opens `path` for reading.
    ///
    /// OS errors become [`IoError::NotFound`], [`IoError::AccessDenied`] or
    /// [`IoError::Io`].
    pub fn open(path: impl AsRef<Path>, mode: MmapMode) -> IoResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| IoError::from_os(e, path))?;
        let size = file
            .metadata()
            .map_err(|e| IoError::from_os(e, path))?
            .len();
        let mut io = Self {
            path: path.to_path_buf(),
            file,
            size,
            pos: 0,
            endian: Endian::Msb,
            mode,
            map: None,
        };
        if mode == MmapMode::Always && size > 0 {
            let map = io.map_file().map_err(|e| IoError::from_os(e, path))?;
            io.map = Some(Arc::new(map));
        }
        debug!("opened {} ({} bytes, mmap {:?})", path.display(), size, mode);
        Ok(io)
    }

    fn map_file(&self) -> io::Result<Mmap> {
        // SAFETY: the map is read-only and never outlives the bytes it
        // covers; the file must not be truncated by another process while
        // mapped.
        let map = unsafe { Mmap::map(&self.file) }?;
        #[cfg(unix)]
        if let Err(e) = map.advise(memmap2::Advice::Sequential) {
            debug!("{}: madvise failed: {}", self.path.display(), e);
        }
        Ok(map)
    }

    /// Hints that the rest of the file is about to be read.
    ///
    /// Creates the memory map when the mode allows it. Failures are logged
    /// and reads continue through the file handle.
    pub fn read_ahead(&mut self) {
        if self.map.is_some() || self.mode == MmapMode::Never || self.size == 0 {
            return;
        }
        match self.map_file() {
            Ok(map) => self.map = Some(Arc::new(map)),
            Err(e) => warn!(
                "{}: memory map failed, using buffered reads: {}",
                self.path.display(),
                e
            ),
        }
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mapping policy.
    pub fn mode(&self) -> MmapMode {
        self.mode
    }

    /// Whether reads are served from a memory map.
    pub fn is_mapped(&self) -> bool {
        self.map.is_some()
    }

    /// The whole mapped file.
    pub fn mapped(&self) -> Option<&[u8]> {
        self.map.as_deref().map(|m| &m[..])
    }

    /// Mapped bytes from the cursor to the end of the file.
    pub fn mmap_p(&self) -> Option<&[u8]> {
        let map = self.map.as_deref()?;
        let start = (self.pos as usize).min(map.len());
        Some(&map[start..])
    }

    /// Shared handle to `len` mapped bytes at the cursor, for zero-copy
    /// buffers. `None` when unmapped or when fewer bytes remain.
    pub fn mapped_region(&self, len: usize) -> Option<(Arc<Mmap>, usize)> {
        let map = self.map.as_ref()?;
        let start = usize::try_from(self.pos).ok()?;
        (start.checked_add(len)? <= map.len()).then(|| (Arc::clone(map), start))
    }

    // === Position ===

    /// File size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Cursor position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Bytes between the cursor and the end of the file.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.pos)
    }

    /// Whether the cursor is at the end of the file.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.size
    }

    /// Moves the cursor to `pos`. Positions past the end are rejected.
    pub fn set_pos(&mut self, pos: u64) -> IoResult<()> {
        if pos > self.size {
            return Err(IoError::truncated(pos, self.size));
        }
        self.pos = pos;
        Ok(())
    }

    /// Moves the cursor by `offset` bytes.
    pub fn seek(&mut self, offset: i64) -> IoResult<()> {
        let pos = self
            .pos
            .checked_add_signed(offset)
            .ok_or_else(|| IoError::Parse(format!("seek before start of file: {offset}")))?;
        self.set_pos(pos)
    }

    // === Byte order ===

    /// Byte order used by the scalar and word reads.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Sets the byte order used by the scalar and word reads.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    // === Reads ===

    /// Fills `buf` exactly, or fails with [`IoError::Truncated`] without
    /// moving the cursor.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> IoResult<()> {
        let end = self.pos + buf.len() as u64;
        if end > self.size {
            return Err(IoError::truncated(end, self.size));
        }
        self.read_into(buf)
    }

    /// Reads up to `buf.len()` bytes, returning how many were read.
    pub fn read_available(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        let n = (buf.len() as u64).min(self.remaining()) as usize;
        self.read_into(&mut buf[..n])?;
        Ok(n)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> IoResult<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let end = self.pos + buf.len() as u64;
        match &self.map {
            Some(map) => {
                let src = map
                    .get(self.pos as usize..end as usize)
                    .ok_or_else(|| IoError::truncated(end, map.len() as u64))?;
                buf.copy_from_slice(src);
            }
            None => {
                let path = &self.path;
                self.file
                    .seek(SeekFrom::Start(self.pos))
                    .and_then(|_| self.file.read_exact(buf))
                    .map_err(|e| match e.kind() {
                        io::ErrorKind::UnexpectedEof => IoError::truncated(end, self.size),
                        _ => IoError::from_os(e, path),
                    })?;
            }
        }
        self.pos = end;
        Ok(())
    }

    fn read_scalar<const N: usize, T>(
        &mut self,
        msb: fn(&[u8]) -> T,
        lsb: fn(&[u8]) -> T,
    ) -> IoResult<T> {
        let mut b = [0u8; N];
        self.read_bytes(&mut b)?;
        Ok(match self.endian {
            Endian::Msb => msb(&b),
            Endian::Lsb => lsb(&b),
        })
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> IoResult<u8> {
        let mut b = [0u8; 1];
        self.read_bytes(&mut b)?;
        Ok(b[0])
    }

    /// Reads a u16 in the current byte order.
    pub fn read_u16(&mut self) -> IoResult<u16> {
        self.read_scalar::<2, _>(BigEndian::read_u16, LittleEndian::read_u16)
    }

    /// Reads a u32 in the current byte order.
    pub fn read_u32(&mut self) -> IoResult<u32> {
        self.read_scalar::<4, _>(BigEndian::read_u32, LittleEndian::read_u32)
    }

    /// Reads an i32 in the current byte order.
    pub fn read_i32(&mut self) -> IoResult<i32> {
        self.read_scalar::<4, _>(BigEndian::read_i32, LittleEndian::read_i32)
    }

    /// Reads `out.len()` u32 values in the current byte order.
    pub fn read_u32_into(&mut self, out: &mut [u32]) -> IoResult<()> {
        let mut bytes = vec![0u8; out.len() * 4];
        self.read_bytes(&mut bytes)?;
        match self.endian {
            Endian::Msb => BigEndian::read_u32_into(&bytes, out),
            Endian::Lsb => LittleEndian::read_u32_into(&bytes, out),
        }
        Ok(())
    }
}
