//! # Pipeline Module
//!
//! Orchestrates a full comparison run.
//!
//! ## Pipeline Stages
//! 1. **List** - Collect the images of the input directory in canonical order
//! 2. **Partition** - Split all unordered pairs into one shard per worker
//! 3. **Compare** - Workers load images through the shared cache and run the cascade
//! 4. **Aggregate** - Sorted duplicate set, or batched records handed to a store
//!
//! ## Parallelism
//! A rayon pool of exactly `worker_count` threads runs one job per shard.
//! In record mode a separate collector thread drains a crossbeam channel and
//! commits batches while the workers are still comparing.

mod aggregator;
mod executor;

pub use aggregator::{DuplicateSet, PersistReport, RecordBatcher, DEFAULT_BATCH_SIZE};
pub use executor::{
    ComparisonWorkerPool, Pipeline, PipelineBuilder, PipelineConfig, PipelineResult,
    RecordRunResult, WorkerReport, DEFAULT_WORKERS,
};
