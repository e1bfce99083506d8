//! In-memory decode cache with one lock per path.

use super::{CacheStats, CachedImage, DecodeCache};
use crate::core::hasher::PixelBuffer;
use crate::error::{CacheError, HashError, SimilarImagesError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

type Slot = Arc<Mutex<Option<Arc<CachedImage>>>>;

/// In-memory decode cache
///
/// The map lock is only held long enough to find or create the slot for a
/// path. The slot's own mutex is held across the decode, so a second worker
/// asking for the same image waits for the first instead of decoding again,
/// while workers on other paths are never blocked.
pub struct InMemoryDecodeCache {
    slots: RwLock<HashMap<PathBuf, Slot>>,
    decodes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
    bytes: AtomicU64,
}

impl InMemoryDecodeCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            decodes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    fn poisoned(path: &Path) -> SimilarImagesError {
        CacheError::Poisoned {
            path: path.to_path_buf(),
        }
        .into()
    }

    fn slot(&self, path: &Path) -> Result<Slot, SimilarImagesError> {
        {
            let slots = self.slots.read().map_err(|_| Self::poisoned(path))?;
            if let Some(slot) = slots.get(path) {
                return Ok(Arc::clone(slot));
            }
        }

        let mut slots = self.slots.write().map_err(|_| Self::poisoned(path))?;
        Ok(Arc::clone(slots.entry(path.to_path_buf()).or_default()))
    }
}

impl Default for InMemoryDecodeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeCache for InMemoryDecodeCache {
    fn get_or_decode(
        &self,
        path: &Path,
        decode: &dyn Fn(&Path) -> Result<PixelBuffer, HashError>,
    ) -> Result<Arc<CachedImage>, SimilarImagesError> {
        let slot = self.slot(path)?;
        let mut entry = slot.lock().map_err(|_| Self::poisoned(path))?;

        if let Some(image) = entry.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(image));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let pixels = match decode(path) {
            Ok(pixels) => pixels,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        self.decodes.fetch_add(1, Ordering::Relaxed);
        self.bytes
            .fetch_add(pixels.byte_size() as u64, Ordering::Relaxed);

        let image = Arc::new(CachedImage::new(path.to_path_buf(), pixels));
        *entry = Some(Arc::clone(&image));
        Ok(image)
    }

    fn get(&self, path: &Path) -> Option<Arc<CachedImage>> {
        let slot = {
            let slots = self.slots.read().ok()?;
            Arc::clone(slots.get(path)?)
        };
        let entry = slot.lock().ok()?;
        entry.clone()
    }

    fn clear(&self) {
        if let Ok(mut slots) = self.slots.write() {
            slots.clear();
        }
        self.bytes.store(0, Ordering::Relaxed);
    }

    fn stats(&self) -> CacheStats {
        let entries = self
            .slots
            .read()
            .map(|slots| {
                slots
                    .values()
                    .filter(|slot| slot.lock().map(|e| e.is_some()).unwrap_or(false))
                    .count()
            })
            .unwrap_or(0);

        CacheStats {
            entries,
            decodes: self.decodes.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    fn create_pixels() -> PixelBuffer {
        PixelBuffer::new(2, 2, PixelBuffer::GRAY, vec![1, 2, 3, 4]).unwrap()
    }

    fn decode_ok(_: &Path) -> Result<PixelBuffer, HashError> {
        Ok(create_pixels())
    }

    #[test]
    fn cache_miss_then_hit() {
        let cache = InMemoryDecodeCache::new();
        let path = Path::new("/photos/a.png");
        let first = cache.get_or_decode(path, &decode_ok).unwrap();
        let second = cache.get_or_decode(path, &decode_ok).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.decodes, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.bytes, 4);
    }

    #[test]
    fn get_does_not_decode() {
        let cache = InMemoryDecodeCache::new();
        assert!(cache.get(Path::new("/photos/a.png")).is_none());

        cache
            .get_or_decode(Path::new("/photos/a.png"), &decode_ok)
            .unwrap();
        assert!(cache.get(Path::new("/photos/a.png")).is_some());
    }

    #[test]
    fn failed_decode_is_not_cached() {
        let cache = InMemoryDecodeCache::new();
        let path = Path::new("/photos/broken.jpg");
        let attempts = AtomicUsize::new(0);
        let failing = |p: &Path| -> Result<PixelBuffer, HashError> {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(HashError::DecodeError {
                path: p.to_path_buf(),
                reason: "truncated".to_string(),
            })
        };

        assert!(cache.get_or_decode(path, &failing).is_err());
        assert!(cache.get_or_decode(path, &failing).is_err());

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(cache.get(path).is_none());
        assert_eq!(cache.stats().failures, 2);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn concurrent_first_access_decodes_once() {
        let cache = InMemoryDecodeCache::new();
        let decodes = AtomicUsize::new(0);
        let decode = |_: &Path| -> Result<PixelBuffer, HashError> {
            decodes.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(create_pixels())
        };

        thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    cache
                        .get_or_decode(Path::new("/photos/shared.png"), &decode)
                        .unwrap();
                });
            }
        });

        assert_eq!(decodes.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 15);
    }

    #[test]
    fn different_paths_decode_independently() {
        let cache = InMemoryDecodeCache::new();
        cache.get_or_decode(Path::new("/a.png"), &decode_ok).unwrap();
        cache.get_or_decode(Path::new("/b.png"), &decode_ok).unwrap();

        assert_eq!(cache.stats().decodes, 2);
    }

    #[test]
    fn clear_removes_all_entries() {
        let cache = InMemoryDecodeCache::new();
        cache.get_or_decode(Path::new("/a.png"), &decode_ok).unwrap();

        cache.clear();

        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().bytes, 0);
    }
}
