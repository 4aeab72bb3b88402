//! Shared film-print tables.
//!
//! Frames of the same scan usually share their film-print parameters, so
//! the table is built once per parameter tuple and handed out as an
//! [`Arc`]. Decoders may run on several threads; the map is guarded by a
//! [`Mutex`] and the process-wide instance is created lazily through
//! [`OnceLock`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::debug;

use crate::{FilmPrintLut, FilmPrintParams, LutResult};

/// Film-print tables keyed by their parameters.
#[derive(Debug, Default)]
pub struct FilmPrintLutCache {
    luts: Mutex<HashMap<[u32; 6], Arc<FilmPrintLut>>>,
}

impl FilmPrintLutCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache.
    pub fn global() -> &'static FilmPrintLutCache {
        static INSTANCE: OnceLock<FilmPrintLutCache> = OnceLock::new();
        INSTANCE.get_or_init(FilmPrintLutCache::new)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<[u32; 6], Arc<FilmPrintLut>>> {
        // Inserts are single calls; the map is never left half-updated.
        self.luts.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the table for `params`, building it on first use.
    ///
    /// The lock is held while building so concurrent callers with the same
    /// parameters build the table once.
    pub fn get_or_build(&self, params: FilmPrintParams) -> LutResult<Arc<FilmPrintLut>> {
        let key = params.key();
        let mut luts = self.lock();
        if let Some(lut) = luts.get(&key) {
            return Ok(Arc::clone(lut));
        }
        let lut = Arc::new(FilmPrintLut::build(params)?);
        debug!(
            "built film-print LUT: black {} white {} gamma {} break {} soft clip {} ({} entries)",
            params.black_point,
            params.white_point,
            params.gamma,
            params.break_point,
            params.soft_clip,
            lut.len()
        );
        luts.insert(key, Arc::clone(&lut));
        Ok(lut)
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops all cached tables. Tables still held by callers stay alive.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_reuses_tables() {
        let cache = FilmPrintLutCache::new();
        let a = cache.get_or_build(FilmPrintParams::default()).unwrap();
        let b = cache.get_or_build(FilmPrintParams::default()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let c = cache
            .get_or_build(FilmPrintParams::default().with_gamma(2.2))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(a.len(), 1024);
    }

    #[test]
    fn test_invalid_params_not_cached() {
        let cache = FilmPrintLutCache::new();
        assert!(cache
            .get_or_build(FilmPrintParams::default().with_gamma(-1.0))
            .is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(FilmPrintLutCache::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_build(FilmPrintParams::default()).unwrap())
            })
            .collect();
        let luts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(luts.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_global_is_shared() {
        let a = FilmPrintLutCache::global() as *const _;
        let b = FilmPrintLutCache::global() as *const _;
        assert_eq!(a, b);
    }
}
