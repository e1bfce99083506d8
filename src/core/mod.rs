//! # Core Module
//!
//! The terminal-agnostic similarity engine.
//!
//! ## Modules
//! - `scanner` - Lists the images of a directory
//! - `hasher` - Computes aHash, dHash, pHash and histograms
//! - `cache` - Decodes each image once and memoizes its fingerprints
//! - `comparator` - Scores pairs and runs the similarity cascade
//! - `partition` - Splits all pairs into disjoint per-worker shards
//! - `pipeline` - Runs the workers and aggregates their results
//! - `persist` - Stores similarity records in batches
//! - `organize` - Moves duplicates into a separate folder

pub mod cache;
pub mod comparator;
pub mod hasher;
pub mod organize;
pub mod partition;
pub mod persist;
pub mod pipeline;
pub mod scanner;

// Re-export commonly used types
pub use comparator::{CascadeThresholds, SimilarityRecord, Verdict};
pub use hasher::{BitHash, HashAlgorithmKind, HashEngine, PixelBuffer};
pub use partition::{ImageListing, PairPartitioner};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineConfig};
