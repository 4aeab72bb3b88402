//! Frame description types.
//!
//! A header parser produces one [`ImageInfo`] per frame. It carries the
//! pixel data description ([`PixelDataInfo`]: size, pixel type and memory
//! layout) plus everything else the header told us: proxy level, sequence
//! range, color profile and tags.
//!
//! # Example
//!
//! ```rust
//! use cine_core::{ImageInfo, PixelType, Size};
//!
//! let info = ImageInfo::new("plate.0001.dpx", Size::new(2048, 1556), PixelType::RGB_U10);
//! assert_eq!(info.pixel_data().scanline_byte_count(), 2048 * 6);
//!
//! let proxy = info.with_proxy(2);
//! assert_eq!(proxy.size, Size::new(512, 389));
//! ```

use crate::convert::proxy_size;
use crate::format::PixelType;
use crate::tags::Tags;

/// Byte order of multi-byte samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    /// Most significant byte first.
    Msb,
    /// Least significant byte first.
    Lsb,
}

impl Endian {
    /// Byte order of the running machine.
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Msb
        } else {
            Self::Lsb
        }
    }

    /// Whether this is the running machine's byte order.
    #[inline]
    pub fn is_native(self) -> bool {
        self == Self::native()
    }

    /// The other byte order.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Msb => Self::Lsb,
            Self::Lsb => Self::Msb,
        }
    }
}

impl Default for Endian {
    fn default() -> Self {
        Self::native()
    }
}

/// Memory layout of pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataLayout {
    /// Byte order of multi-byte samples.
    pub endian: Endian,
    /// Scanline alignment in bytes (1 = tightly packed).
    pub alignment: usize,
    /// Scanlines run right to left.
    pub mirror_x: bool,
    /// Scanlines are stored bottom to top.
    pub mirror_y: bool,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self {
            endian: Endian::native(),
            alignment: 1,
            mirror_x: false,
            mirror_y: false,
        }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl Size {
    /// Creates a size.
    #[inline]
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// Number of pixels.
    #[inline]
    pub const fn area(self) -> usize {
        self.w as usize * self.h as usize
    }

    /// Whether either dimension is zero.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// Inclusive frame number range of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRange {
    /// First frame.
    pub first: i64,
    /// Last frame.
    pub last: i64,
}

impl FrameRange {
    /// Creates a range, ordering the bounds.
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            first: a.min(b),
            last: a.max(b),
        }
    }

    /// Number of frames in the range.
    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    /// Always false; a range holds at least one frame.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `frame` lies within the range.
    pub fn contains(&self, frame: i64) -> bool {
        frame >= self.first && frame <= self.last
    }
}

/// Color transform the presentation layer must apply after decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ColorProfileKind {
    /// Pixel values are already display-referred or linear.
    #[default]
    None,
    /// Pixel values are logarithmic film-print codes, or were converted
    /// from them by the film-print LUT.
    FilmPrint,
}

/// Size, pixel type and layout of a block of pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelDataInfo {
    /// Dimensions.
    pub size: Size,
    /// Pixel type.
    pub pixel_type: PixelType,
    /// Memory layout.
    pub layout: DataLayout,
}

impl PixelDataInfo {
    /// Creates a description with the default (native, unaligned) layout.
    pub fn new(size: Size, pixel_type: PixelType) -> Self {
        Self {
            size,
            pixel_type,
            layout: DataLayout::default(),
        }
    }

    /// Unpadded bytes of one scanline.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.size.w as usize * self.pixel_type.bytes_per_pixel()
    }

    /// Bytes of one scanline including alignment padding.
    #[inline]
    pub fn scanline_byte_count(&self) -> usize {
        align(self.row_bytes(), self.layout.alignment)
    }

    /// Bytes of the whole frame.
    #[inline]
    pub fn data_byte_count(&self) -> usize {
        self.size.h as usize * self.scanline_byte_count()
    }

    /// [`data_byte_count`](Self::data_byte_count), or `None` when the
    /// size does not fit in `usize`. Use this for sizes read from files.
    pub fn checked_data_byte_count(&self) -> Option<usize> {
        let row = (self.size.w as usize).checked_mul(self.pixel_type.bytes_per_pixel())?;
        let scanline = match self.layout.alignment {
            0 | 1 => row,
            a => row.div_ceil(a).checked_mul(a)?,
        };
        (self.size.h as usize).checked_mul(scanline)
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.size.area()
    }
}

/// Rounds `n` up to a multiple of `alignment`. Alignments of 0 and 1 are
/// both treated as unaligned.
#[inline]
pub fn align(n: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        n
    } else {
        n.div_ceil(alignment) * alignment
    }
}

/// Description of one decodable frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// File the frame was read from.
    pub name: String,
    /// Dimensions (after proxy scaling).
    pub size: Size,
    /// Pixel type.
    pub pixel_type: PixelType,
    /// Memory layout.
    pub layout: DataLayout,
    /// Proxy level: 0 = full resolution, N = 1/2^N.
    pub proxy: u32,
    /// Frame range of the sequence this frame belongs to.
    pub sequence: Option<FrameRange>,
    /// Frame rate declared by the header.
    pub frame_rate: Option<f32>,
    /// Color transform to apply.
    pub color_profile: ColorProfileKind,
    /// Header metadata.
    pub tags: Tags,
}

impl ImageInfo {
    /// Creates an info with default layout and no metadata.
    pub fn new(name: impl Into<String>, size: Size, pixel_type: PixelType) -> Self {
        Self {
            name: name.into(),
            size,
            pixel_type,
            layout: DataLayout::default(),
            proxy: 0,
            sequence: None,
            frame_rate: None,
            color_profile: ColorProfileKind::None,
            tags: Tags::new(),
        }
    }

    /// Pixel data description of this frame.
    #[inline]
    pub fn pixel_data(&self) -> PixelDataInfo {
        PixelDataInfo {
            size: self.size,
            pixel_type: self.pixel_type,
            layout: self.layout,
        }
    }

    /// Bytes of one scanline including alignment padding.
    #[inline]
    pub fn scanline_byte_count(&self) -> usize {
        self.pixel_data().scanline_byte_count()
    }

    /// Bytes of the whole frame.
    #[inline]
    pub fn data_byte_count(&self) -> usize {
        self.pixel_data().data_byte_count()
    }

    /// Copy of this info at proxy `level`, with the size scaled down.
    ///
    /// Expects a full resolution info; levels do not accumulate.
    pub fn with_proxy(&self, level: u32) -> Self {
        let mut out = self.clone();
        out.size = proxy_size(self.size, level);
        out.proxy = level;
        out
    }
}
