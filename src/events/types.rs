//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the similarity pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Directory listing events
    Scan(ScanEvent),
    /// Pair partitioning events
    Partition(PartitionEvent),
    /// Pairwise comparison events
    Compare(CompareEvent),
    /// Record persistence events
    Persist(PersistEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events while listing the input directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Listing has started
    Started { path: PathBuf },
    /// An image was found
    ImageFound { path: PathBuf },
    /// An entry could not be read but listing continues
    Error { path: PathBuf, message: String },
    /// Listing completed
    Completed { total_images: usize },
}

/// Events while splitting the pair workload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PartitionEvent {
    /// Shards are ready
    Completed {
        total_pairs: usize,
        shard_sizes: Vec<usize>,
    },
}

/// Events during the comparison phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CompareEvent {
    /// Workers have been started
    Started { total_pairs: usize, workers: usize },
    /// Progress update across all workers
    Progress(CompareProgress),
    /// A pair was skipped because one of its images could not be used
    PairSkipped {
        first: PathBuf,
        second: PathBuf,
        message: String,
    },
    /// A worker drained its shard
    WorkerFinished {
        worker: usize,
        compared: usize,
        skipped: usize,
    },
    /// All workers joined
    Completed {
        compared: usize,
        skipped: usize,
        similar_pairs: usize,
    },
}

/// Progress information during comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareProgress {
    /// Pairs finished so far (compared or skipped)
    pub pairs_completed: usize,
    /// Total pairs across all shards
    pub total_pairs: usize,
}

/// Events from the record collector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PersistEvent {
    /// A batch was committed to the record store
    BatchCommitted { batch: usize, records: usize },
    /// A batch failed and was rolled back
    BatchRolledBack {
        batch: usize,
        records: usize,
        message: String,
    },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Listing,
    Partitioning,
    Comparing,
    Aggregating,
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Images in the listing
    pub total_images: usize,
    /// Pairs in the workload
    pub total_pairs: usize,
    /// Pairs skipped because of decode or fingerprint errors
    pub skipped_pairs: usize,
    /// Images judged to have at least one near-duplicate
    pub duplicate_images: usize,
    /// Records handed to the record store
    pub records_committed: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Listing => write!(f, "Listing"),
            PipelinePhase::Partitioning => write!(f, "Partitioning"),
            PipelinePhase::Comparing => write!(f, "Comparing"),
            PipelinePhase::Aggregating => write!(f, "Aggregating"),
        }
    }
}
