//! # Similar Images
//!
//! Finds near-duplicate images in a directory.
//!
//! Every unordered pair of images is compared with a cascade of perceptual
//! signals: the dHash distance settles clear cases, and a grayscale
//! histogram comparison confirms borderline ones. The pair workload is split
//! into disjoint shards processed by a fixed pool of workers that share one
//! decode cache.
//!
//! ## Architecture
//! - `core` - The similarity engine
//! - `events` - Event-driven progress reporting
//! - `error` - Error types with paths and context

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, SimilarImagesError};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the library
///
/// Logs go to stderr so JSON and path output on stdout stay clean. `RUST_LOG`
/// overrides the level chosen by `verbose`. Calling this twice is harmless.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}
