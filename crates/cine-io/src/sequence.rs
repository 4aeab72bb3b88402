//! Frame file name resolution for numbered sequences.
//!
//! A frame is requested as a path plus an optional frame number. The frame
//! token in the file name is found in one of these forms:
//!
//! - `shot.####.dpx` / `shot.@@@@.dpx` - one digit of padding per character
//! - `shot.%04d.dpx` - printf-style padding
//! - `shot.0001.dpx` - the last digit run before the extension
//!
//! and replaced with the frame number, zero padded to the token width.
//! A pattern with no frame number resolves to the first frame found on
//! disk.
//!
//! # Example
//!
//! ```rust
//! use cine_io::sequence::FramePattern;
//!
//! let p = FramePattern::parse("plates/shot.%04d.dpx").unwrap();
//! assert_eq!(p.padding(), 4);
//! assert_eq!(p.frame_path(42).to_str().unwrap(), "plates/shot.0042.dpx");
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cine_core::FrameRange;
use tracing::debug;

use crate::{IoError, IoResult};

/// A file name split around its frame token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FramePattern {
    dir: PathBuf,
    prefix: String,
    suffix: String,
    padding: usize,
    /// Frame number written in the name, if it had digits rather than a
    /// placeholder.
    frame: Option<i64>,
}

impl FramePattern {
    /// Splits `path` around its frame token.
    ///
    /// Returns `None` when the file name has no placeholder and no digits.
    pub fn parse<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let (start, end, padding) = placeholder(name).or_else(|| digits(name))?;
        let token = &name[start..end];
        let frame = if token.bytes().all(|b| b.is_ascii_digit()) {
            token.parse().ok()
        } else {
            None
        };
        Some(Self {
            dir,
            prefix: name[..start].to_string(),
            suffix: name[end..].to_string(),
            padding,
            frame,
        })
    }

    /// Directory holding the frames.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name text before the frame token.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// File name text after the frame token.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Minimum digit count of frame numbers.
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Frame number written in the file name.
    pub fn frame(&self) -> Option<i64> {
        self.frame
    }

    /// Whether the file name holds a placeholder instead of digits.
    pub fn is_placeholder(&self) -> bool {
        self.frame.is_none()
    }

    /// Path of `frame` in this sequence.
    pub fn frame_path(&self, frame: i64) -> PathBuf {
        let name = format!(
            "{}{:0width$}{}",
            self.prefix,
            frame,
            self.suffix,
            width = self.padding
        );
        self.dir.join(name)
    }

    /// Frame number of a file name in this sequence, if it is one.
    pub fn match_name(&self, name: &str) -> Option<i64> {
        let middle = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        let digits = middle.strip_prefix('-').unwrap_or(middle);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Wider than the padding only when not zero filled.
        if middle.len() < self.padding
            || (middle.len() > self.padding && digits.starts_with('0') && digits.len() > 1)
        {
            return None;
        }
        middle.parse().ok()
    }

    /// Scans the directory for frames of this sequence.
    ///
    /// Returns `None` when no frame is found.
    pub fn scan(&self) -> IoResult<Option<FrameRange>> {
        let dir = if self.dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.dir.as_path()
        };
        let mut range: Option<(i64, i64)> = None;
        for entry in std::fs::read_dir(dir)?.flatten() {
            let name = entry.file_name();
            let Some(frame) = name.to_str().and_then(|n| self.match_name(n)) else {
                continue;
            };
            range = Some(match range {
                Some((first, last)) => (first.min(frame), last.max(frame)),
                None => (frame, frame),
            });
        }
        Ok(range.map(|(first, last)| FrameRange::new(first, last)))
    }
}

/// A frame request resolved to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// File to open.
    pub path: PathBuf,
    /// Range of the sequence on disk, if the name is part of one.
    pub range: Option<FrameRange>,
}

/// Resolves `path` and an optional `frame` number to the file to open.
///
/// - With a frame number, the frame token is replaced by it.
/// - Without one, a placeholder selects the first frame on disk and a
///   concrete file name is used as is.
/// - Names without a frame token are used as is.
///
/// The sequence range is reported when the directory can be scanned.
/// Every call scans the directory; [`SequenceResolver`] scans each
/// sequence once.
pub fn resolve<P: AsRef<Path>>(path: P, frame: Option<i64>) -> IoResult<Resolved> {
    SequenceResolver::new().resolve(path, frame)
}

/// Frame resolution with the range of each sequence cached after its first
/// directory scan.
///
/// A placeholder request with no frame number and no cached frames always
/// rescans, since it cannot resolve without one.
#[derive(Debug, Default)]
pub struct SequenceResolver {
    ranges: HashMap<FramePattern, Option<FrameRange>>,
}

impl SequenceResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every cached range, so frames added on disk are seen.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Number of sequences scanned so far.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether no sequence has been scanned.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Resolves like [`resolve`], scanning a sequence's directory only the
    /// first time it is seen.
    pub fn resolve<P: AsRef<Path>>(&mut self, path: P, frame: Option<i64>) -> IoResult<Resolved> {
        let path = path.as_ref();
        let Some(pattern) = FramePattern::parse(path) else {
            return Ok(Resolved {
                path: path.to_path_buf(),
                range: None,
            });
        };

        let needs_first = pattern.is_placeholder() && frame.is_none();
        let key = FramePattern {
            frame: None,
            ..pattern.clone()
        };
        let cached = self
            .ranges
            .get(&key)
            .copied()
            .filter(|range| range.is_some() || !needs_first);
        let range = match cached {
            Some(range) => range,
            None => {
                let range = match pattern.scan() {
                    Ok(range) => range,
                    Err(e) if needs_first => return Err(e),
                    Err(e) => {
                        debug!("cannot scan {}: {}", pattern.dir().display(), e);
                        None
                    }
                };
                self.ranges.insert(key, range);
                range
            }
        };

        let resolved = match (frame, pattern.is_placeholder()) {
            (Some(f), _) => pattern.frame_path(f),
            (None, false) => path.to_path_buf(),
            (None, true) => match range {
                Some(r) => pattern.frame_path(r.first),
                None => return Err(IoError::NotFound(path.to_path_buf())),
            },
        };
        debug!("resolved {} -> {}", path.display(), resolved.display());
        Ok(Resolved {
            path: resolved,
            range,
        })
    }
}

/// Byte range and padding of a `#`, `@` or `%0Nd` placeholder.
fn placeholder(name: &str) -> Option<(usize, usize, usize)> {
    for mark in ['#', '@'] {
        if let Some(start) = name.find(mark) {
            let end = name[start..]
                .find(|c| c != mark)
                .map(|i| start + i)
                .unwrap_or(name.len());
            return Some((start, end, end - start));
        }
    }

    let start = name.find('%')?;
    let d = name[start..].find('d')?;
    let width = &name[start + 1..start + d];
    if !width.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padding = if width.is_empty() {
        1
    } else {
        width.parse().ok()?
    };
    Some((start, start + d + 1, padding))
}

/// Byte range and width of the last digit run before the extension.
fn digits(name: &str) -> Option<(usize, usize, usize)> {
    let stem_end = name.rfind('.').filter(|&i| i > 0).unwrap_or(name.len());
    let stem = &name[..stem_end];
    let end = stem.rfind(|c: char| c.is_ascii_digit())? + 1;
    let start = stem[..end]
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    Some((start, end, end - start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_parse_forms() {
        let p = FramePattern::parse("a/shot.####.dpx").unwrap();
        assert_eq!((p.prefix(), p.suffix(), p.padding()), ("shot.", ".dpx", 4));
        assert!(p.is_placeholder());

        let p = FramePattern::parse("shot.@@@.cin").unwrap();
        assert_eq!(p.padding(), 3);

        let p = FramePattern::parse("shot.%05d.sgi").unwrap();
        assert_eq!((p.prefix(), p.suffix(), p.padding()), ("shot.", ".sgi", 5));

        let p = FramePattern::parse("shot%d.sgi").unwrap();
        assert_eq!(p.padding(), 1);

        let p = FramePattern::parse("shot_v2.0012.dpx").unwrap();
        assert_eq!((p.prefix(), p.suffix(), p.padding()), ("shot_v2.", ".dpx", 4));
        assert_eq!(p.frame(), Some(12));

        assert!(FramePattern::parse("plate.dpx").is_none());
    }

    #[test]
    fn test_frame_path_padding() {
        let p = FramePattern::parse("shot.0001.dpx").unwrap();
        assert_eq!(p.frame_path(7), PathBuf::from("shot.0007.dpx"));
        assert_eq!(p.frame_path(12345), PathBuf::from("shot.12345.dpx"));

        let p = FramePattern::parse("dir/shot.###.cin").unwrap();
        assert_eq!(p.frame_path(42), PathBuf::from("dir/shot.042.cin"));
    }

    #[test]
    fn test_match_name() {
        let p = FramePattern::parse("shot.####.dpx").unwrap();
        assert_eq!(p.match_name("shot.0010.dpx"), Some(10));
        assert_eq!(p.match_name("shot.10000.dpx"), Some(10000));
        assert_eq!(p.match_name("shot.010.dpx"), None);
        assert_eq!(p.match_name("shot.00010.dpx"), None);
        assert_eq!(p.match_name("shot.abcd.dpx"), None);
        assert_eq!(p.match_name("take.0010.dpx"), None);
    }

    #[test]
    fn test_resolve_first_frame() {
        let dir = TempDir::new().expect("tempdir");
        for f in [1003, 1001, 1002] {
            File::create(dir.path().join(format!("shot.{f:04}.dpx"))).expect("create");
        }
        File::create(dir.path().join("other.0001.dpx")).expect("create");

        let pattern = dir.path().join("shot.####.dpx");
        let r = resolve(&pattern, None).expect("resolve");
        assert_eq!(r.path, dir.path().join("shot.1001.dpx"));
        assert_eq!(r.range, Some(FrameRange::new(1001, 1003)));

        let r = resolve(&pattern, Some(1002)).expect("resolve");
        assert_eq!(r.path, dir.path().join("shot.1002.dpx"));

        let r = resolve(dir.path().join("shot.1003.dpx"), None).expect("resolve");
        assert_eq!(r.path, dir.path().join("shot.1003.dpx"));
        assert_eq!(r.range, Some(FrameRange::new(1001, 1003)));
    }

    #[test]
    fn test_resolve_missing() {
        let dir = TempDir::new().expect("tempdir");
        let err = resolve(dir.path().join("shot.####.dpx"), None).unwrap_err();
        assert!(err.is_not_found());

        let r = resolve(dir.path().join("plate.dpx"), Some(5)).expect("resolve");
        assert_eq!(r.path, dir.path().join("plate.dpx"));
        assert_eq!(r.range, None);
    }

    #[test]
    fn test_resolver_scans_once() {
        let dir = TempDir::new().expect("tempdir");
        for f in [1, 2] {
            File::create(dir.path().join(format!("shot.{f:04}.dpx"))).expect("create");
        }
        let mut resolver = SequenceResolver::new();
        let r = resolver.resolve(dir.path().join("shot.####.dpx"), Some(1)).expect("resolve");
        assert_eq!(r.range, Some(FrameRange::new(1, 2)));

        // A frame added later is not seen until the cache is cleared.
        File::create(dir.path().join("shot.0003.dpx")).expect("create");
        let r = resolver.resolve(dir.path().join("shot.0002.dpx"), None).expect("resolve");
        assert_eq!(r.path, dir.path().join("shot.0002.dpx"));
        assert_eq!(r.range, Some(FrameRange::new(1, 2)));
        assert_eq!(resolver.len(), 1);

        resolver.clear();
        let r = resolver.resolve(dir.path().join("shot.%04d.dpx"), Some(3)).expect("resolve");
        assert_eq!(r.path, dir.path().join("shot.0003.dpx"));
        assert_eq!(r.range, Some(FrameRange::new(1, 3)));
    }

    #[test]
    fn test_resolver_rescans_empty_placeholder() {
        let dir = TempDir::new().expect("tempdir");
        let pattern = dir.path().join("shot.####.dpx");
        let mut resolver = SequenceResolver::new();
        assert!(resolver.resolve(&pattern, Some(7)).expect("resolve").range.is_none());
        assert!(resolver.resolve(&pattern, None).unwrap_err().is_not_found());

        File::create(dir.path().join("shot.0007.dpx")).expect("create");
        let r = resolver.resolve(&pattern, None).expect("resolve");
        assert_eq!(r.path, dir.path().join("shot.0007.dpx"));
    }
}
