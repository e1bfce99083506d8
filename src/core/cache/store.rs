//! Image loading through the decode cache.

use super::{CacheStats, CachedImage, DecodeCache, InMemoryDecodeCache};
use crate::core::hasher::{FastDecoder, ImageDecoder};
use crate::error::SimilarImagesError;
use std::path::Path;
use std::sync::Arc;

/// Loads images by path, decoding each one at most once per run.
///
/// One store is shared by reference between all workers.
pub struct ImageStore {
    decoder: Box<dyn ImageDecoder>,
    cache: Box<dyn DecodeCache>,
}

impl ImageStore {
    /// Store using the default decoder and an in-memory cache
    pub fn new() -> Self {
        Self::with_parts(Box::new(FastDecoder), Box::new(InMemoryDecodeCache::new()))
    }

    /// Store using a custom decoder and cache
    pub fn with_parts(decoder: Box<dyn ImageDecoder>, cache: Box<dyn DecodeCache>) -> Self {
        Self { decoder, cache }
    }

    /// Decoded image for `path`.
    ///
    /// Decode failures are returned to the caller and retried on the next
    /// call; they never poison the cache for other workers.
    pub fn load(&self, path: &Path) -> Result<Arc<CachedImage>, SimilarImagesError> {
        self.cache
            .get_or_decode(path, &|p: &Path| self.decoder.decode(p))
    }

    /// Image already in the cache, if any
    pub fn cached(&self, path: &Path) -> Option<Arc<CachedImage>> {
        self.cache.get(path)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Release all decoded images
    pub fn clear(&self) {
        self.cache.clear();
    }
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::PixelBuffer;
    use crate::error::HashError;
    use image::{ImageBuffer, Rgb};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingDecoder {
        calls: Arc<AtomicUsize>,
    }

    impl ImageDecoder for CountingDecoder {
        fn decode(&self, _path: &Path) -> Result<PixelBuffer, HashError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            PixelBuffer::new(1, 1, PixelBuffer::GRAY, vec![42])
        }
    }

    #[test]
    fn loads_real_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("red.png");
        ImageBuffer::from_fn(8, 8, |_, _| Rgb([255u8, 0, 0]))
            .save(&path)
            .unwrap();

        let store = ImageStore::new();
        let image = store.load(&path).unwrap();

        assert_eq!(image.path(), path.as_path());
        assert_eq!(image.pixels().pixel(0, 0), &[255, 0, 0]);
    }

    #[test]
    fn repeated_loads_use_the_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = ImageStore::with_parts(
            Box::new(CountingDecoder {
                calls: Arc::clone(&calls),
            }),
            Box::new(InMemoryDecodeCache::new()),
        );

        for _ in 0..5 {
            store.load(Path::new("/photos/a.png")).unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.stats().hits, 4);
        assert!(store.cached(Path::new("/photos/a.png")).is_some());
    }

    #[test]
    fn missing_file_is_an_error() {
        let store = ImageStore::new();
        let result = store.load(Path::new("/nonexistent/missing.png"));

        assert!(matches!(result, Err(SimilarImagesError::Hash(_))));
    }
}
