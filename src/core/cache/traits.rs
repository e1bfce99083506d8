//! Decode cache trait definition.

use super::{CacheStats, CachedImage};
use crate::core::hasher::PixelBuffer;
use crate::error::{HashError, SimilarImagesError};
use std::path::Path;
use std::sync::Arc;

/// Storage for decoded images, shared by every worker of a run.
pub trait DecodeCache: Send + Sync {
    /// Return the cached image for `path`, decoding it with `decode` if absent.
    ///
    /// Implementations must call `decode` at most once per path as long as it
    /// succeeds, no matter how many threads ask concurrently. A failed decode
    /// is returned to the caller and not remembered, so a later call retries.
    fn get_or_decode(
        &self,
        path: &Path,
        decode: &dyn Fn(&Path) -> Result<PixelBuffer, HashError>,
    ) -> Result<Arc<CachedImage>, SimilarImagesError>;

    /// Cached image for `path`, without decoding
    fn get(&self, path: &Path) -> Option<Arc<CachedImage>>;

    /// Drop every cached image
    fn clear(&self);

    /// Get cache statistics
    fn stats(&self) -> CacheStats;
}
