//! # Cache Module
//!
//! Keeps decoded images in memory for the length of one run.
//!
//! Every image takes part in n-1 pairs, so without a cache it would be
//! decoded n-1 times. The cache guarantees at most one successful decode
//! per path, even when several workers ask for the same image at once, and
//! memoizes each fingerprint next to the pixels the first time it is needed.
//!
//! ## Pieces
//! - `ImageStore` - the entry point workers use: decoder + cache
//! - `DecodeCache` - storage contract
//! - `InMemoryDecodeCache` - per-key locked map used by the pipeline

mod memory;
mod store;
mod traits;

pub use memory::InMemoryDecodeCache;
pub use store::ImageStore;
pub use traits::DecodeCache;

use crate::core::hasher::{BitHash, ChannelHistogram, HashEngine, Histogram, PixelBuffer, BLUE};
use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// A decoded image plus whatever fingerprints have been computed for it.
///
/// Fingerprints are write-once: if two workers race to compute the same
/// one, the first stored value wins and the other is dropped.
#[derive(Debug)]
pub struct CachedImage {
    path: PathBuf,
    pixels: Arc<PixelBuffer>,
    average: OnceLock<BitHash>,
    difference: OnceLock<BitHash>,
    perceptual: OnceLock<BitHash>,
    channel_histogram: OnceLock<ChannelHistogram>,
    canvas_histogram: OnceLock<ChannelHistogram>,
}

/// Compute a fallible value at most once per cell.
///
/// `OnceLock::get_or_try_init` is unstable, so check first and only then
/// store; a concurrent loser's value is discarded by `get_or_init`.
fn memoize<T>(
    cell: &OnceLock<T>,
    compute: impl FnOnce() -> Result<T, HashError>,
) -> Result<&T, HashError> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = compute()?;
    Ok(cell.get_or_init(|| value))
}

impl CachedImage {
    pub fn new(path: PathBuf, pixels: PixelBuffer) -> Self {
        Self {
            path,
            pixels: Arc::new(pixels),
            average: OnceLock::new(),
            difference: OnceLock::new(),
            perceptual: OnceLock::new(),
            channel_histogram: OnceLock::new(),
            canvas_histogram: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pixels(&self) -> &Arc<PixelBuffer> {
        &self.pixels
    }

    pub fn average_hash(&self, engine: &HashEngine) -> Result<&BitHash, HashError> {
        memoize(&self.average, || engine.average_hash(&self.pixels))
    }

    pub fn difference_hash(&self, engine: &HashEngine) -> Result<&BitHash, HashError> {
        memoize(&self.difference, || engine.difference_hash(&self.pixels))
    }

    pub fn perceptual_hash(&self, engine: &HashEngine) -> Result<&BitHash, HashError> {
        memoize(&self.perceptual, || engine.perceptual_hash(&self.pixels))
    }

    pub fn channel_histogram(&self, engine: &HashEngine) -> &ChannelHistogram {
        self.channel_histogram
            .get_or_init(|| engine.channel_histogram(&self.pixels))
    }

    /// Blue channel of the full-resolution image, the cascade's confirmation signal
    pub fn cascade_histogram(&self, engine: &HashEngine) -> &Histogram {
        self.channel_histogram(engine).channel(BLUE)
    }

    pub fn canvas_histogram(&self, engine: &HashEngine) -> Result<&ChannelHistogram, HashError> {
        memoize(&self.canvas_histogram, || engine.canvas_histogram(&self.pixels))
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Paths with a decoded image
    pub entries: usize,
    /// Successful decodes
    pub decodes: u64,
    /// Lookups served without decoding
    pub hits: u64,
    /// Lookups that had to decode
    pub misses: u64,
    /// Decodes that failed (never cached)
    pub failures: u64,
    /// Pixel bytes held
    pub bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_image() -> CachedImage {
        let data = (0..16 * 16).map(|i| (i % 251) as u8).collect();
        let pixels = PixelBuffer::new(16, 16, PixelBuffer::GRAY, data).unwrap();
        CachedImage::new(PathBuf::from("/photos/a.png"), pixels)
    }

    #[test]
    fn fingerprints_are_memoized() {
        let engine = HashEngine::new();
        let image = create_image();

        let first = image.difference_hash(&engine).unwrap() as *const BitHash;
        let second = image.difference_hash(&engine).unwrap() as *const BitHash;

        assert_eq!(first, second);
    }

    #[test]
    fn memoized_values_match_engine() {
        let engine = HashEngine::new();
        let image = create_image();

        assert_eq!(
            image.perceptual_hash(&engine).unwrap(),
            &engine.perceptual_hash(image.pixels()).unwrap()
        );
        assert_eq!(
            image.cascade_histogram(&engine),
            engine.channel_histogram(image.pixels()).channel(BLUE)
        );
    }

    #[test]
    fn failed_computation_is_not_stored() {
        let cell: OnceLock<u32> = OnceLock::new();

        let failed = memoize(&cell, || Err(HashError::ResizeFailed("boom".to_string())));
        assert!(failed.is_err());
        assert!(cell.get().is_none());

        assert_eq!(*memoize(&cell, || Ok(7)).unwrap(), 7);
        assert_eq!(*memoize(&cell, || Ok(9)).unwrap(), 7);
    }
}
