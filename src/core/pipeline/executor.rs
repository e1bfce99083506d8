//! Pipeline execution implementation.

use super::aggregator::{DuplicateSet, PersistReport, RecordBatcher, DEFAULT_BATCH_SIZE};
use crate::core::cache::{CacheStats, ImageStore};
use crate::core::comparator::{
    CascadePolicy, CascadeThresholds, Comparator, SimilarityPolicy, SimilarityRecord,
};
use crate::core::hasher::HashEngine;
use crate::core::partition::{ImageListing, PairKey, PairPartitioner, Shard};
use crate::core::persist::RecordStore;
use crate::core::scanner::{DirectoryLister, ImageLister, ScanConfig};
use crate::error::{CompareError, PersistError, SimilarImagesError};
use crate::events::{
    null_sender, CompareEvent, CompareProgress, Event, EventSender, PartitionEvent,
    PipelineEvent, PipelinePhase, PipelineSummary,
};
use crossbeam_channel::Sender;
use rayon::ThreadPool;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Default number of comparison workers
pub const DEFAULT_WORKERS: usize = 8;

/// Records buffered between the workers and the collector
const RECORD_CHANNEL_CAPACITY: usize = 4096;

/// Pairs between progress events
const PROGRESS_INTERVAL: usize = 256;

/// Result of a duplicate-collection run
#[derive(Debug)]
pub struct PipelineResult {
    /// Every image in at least one similar pair, sorted
    pub duplicates: Vec<PathBuf>,
    /// Images in the listing
    pub total_images: usize,
    /// Pairs in the workload
    pub total_pairs: usize,
    /// Pairs that were fully compared
    pub compared_pairs: usize,
    /// Pairs judged similar
    pub similar_pairs: usize,
    /// Pairs skipped because an image could not be used
    pub skipped_pairs: usize,
    /// Errors that occurred (non-fatal)
    pub errors: Vec<String>,
    /// Decode cache statistics at the end of the run
    pub cache: CacheStats,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Result of a record-generation run
#[derive(Debug)]
pub struct RecordRunResult {
    pub total_images: usize,
    pub total_pairs: usize,
    pub compared_pairs: usize,
    pub skipped_pairs: usize,
    /// Batches committed and rolled back
    pub persist: PersistReport,
    /// Errors that occurred (non-fatal)
    pub errors: Vec<String>,
    pub cache: CacheStats,
    pub duration_ms: u64,
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory to compare
    pub root: PathBuf,
    /// Number of workers, and therefore shards
    pub worker_count: usize,
    /// Records per committed batch in record mode
    pub batch_size: usize,
    /// Cascade cut-offs
    pub thresholds: CascadeThresholds,
    /// Lister configuration
    pub scan_config: ScanConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            worker_count: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            thresholds: CascadeThresholds::default(),
            scan_config: ScanConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), SimilarImagesError> {
        if self.worker_count == 0 {
            return Err(SimilarImagesError::Config(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(SimilarImagesError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }
        self.thresholds
            .validate()
            .map_err(SimilarImagesError::Config)
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    lister: Option<Box<dyn ImageLister>>,
    images: Option<ImageStore>,
    policy: Option<Box<dyn SimilarityPolicy>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            lister: None,
            images: None,
            policy: None,
        }
    }

    /// Directory to compare
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    /// Set the number of workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.worker_count = workers;
        self
    }

    /// Set the record batch size
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Set the cascade thresholds
    pub fn thresholds(mut self, thresholds: CascadeThresholds) -> Self {
        self.config.thresholds = thresholds;
        self
    }

    /// Set lister configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Include hidden files
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.scan_config.include_hidden = include;
        self
    }

    /// Replace the directory lister
    pub fn lister(mut self, lister: Box<dyn ImageLister>) -> Self {
        self.lister = Some(lister);
        self
    }

    /// Replace the image store (decoder and cache)
    pub fn image_store(mut self, images: ImageStore) -> Self {
        self.images = Some(images);
        self
    }

    /// Replace the similarity policy; thresholds are then ignored
    pub fn policy(mut self, policy: Box<dyn SimilarityPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Validate the configuration and build the pipeline
    pub fn build(self) -> Result<Pipeline, SimilarImagesError> {
        self.config.validate()?;

        let lister = self
            .lister
            .unwrap_or_else(|| Box::new(DirectoryLister::new(self.config.scan_config.clone())));
        let policy = self
            .policy
            .unwrap_or_else(|| Box::new(CascadePolicy::new(self.config.thresholds)));
        let workers = ComparisonWorkerPool::new(self.config.worker_count)?;

        Ok(Pipeline {
            lister,
            images: self.images.unwrap_or_default(),
            comparator: Comparator::new(HashEngine::new(), policy),
            workers,
            config: self.config,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-worker outcome, returned from the worker's job
#[derive(Debug, Clone, Default)]
pub struct WorkerReport {
    pub worker: usize,
    pub compared: usize,
    pub skipped: usize,
    pub similar: usize,
    pub errors: Vec<String>,
}

/// Fixed pool of comparison workers, one shard each.
///
/// Every shard is spawned as its own job and runs start to finish on one
/// thread; a shard is never split. Rayon does not pin jobs to threads, so a
/// thread that drains its shard early may pick up a shard no other thread has
/// started yet. All shards are joined before `run` returns.
pub struct ComparisonWorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl ComparisonWorkerPool {
    pub fn new(workers: usize) -> Result<Self, CompareError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("compare-{index}"))
            .build()
            .map_err(|e| CompareError::WorkerPool(e.to_string()))?;

        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `job` once per shard and wait for all of them.
    ///
    /// Reports come back ordered by shard index.
    pub fn run<F>(&self, shards: Vec<Shard>, job: F) -> Vec<WorkerReport>
    where
        F: Fn(&Shard) -> WorkerReport + Sync,
    {
        let reports = Mutex::new(Vec::with_capacity(shards.len()));

        self.pool.scope(|scope| {
            for shard in &shards {
                let job = &job;
                let reports = &reports;
                scope.spawn(move |_| {
                    let report = job(shard);
                    reports
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(report);
                });
            }
        });

        let mut reports = reports.into_inner().unwrap_or_else(PoisonError::into_inner);
        reports.sort_by_key(|report| report.worker);
        reports
    }
}

/// Where a worker puts the outcome of each pair
#[derive(Clone, Copy)]
enum PairSink<'a> {
    Duplicates(&'a DuplicateSet),
    Records(&'a Sender<SimilarityRecord>),
}

/// Totals over every worker report
#[derive(Default)]
struct CompareTotals {
    compared: usize,
    skipped: usize,
    similar: usize,
    errors: Vec<String>,
}

impl CompareTotals {
    fn from_reports(reports: Vec<WorkerReport>) -> Self {
        reports.into_iter().fold(Self::default(), |mut totals, report| {
            totals.compared += report.compared;
            totals.skipped += report.skipped;
            totals.similar += report.similar;
            totals.errors.extend(report.errors);
            totals
        })
    }
}

/// The similar image detection pipeline
pub struct Pipeline {
    config: PipelineConfig,
    lister: Box<dyn ImageLister>,
    images: ImageStore,
    comparator: Comparator,
    workers: ComparisonWorkerPool,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Images decoded so far
    pub fn cache_stats(&self) -> CacheStats {
        self.images.stats()
    }

    /// Find every image with at least one similar partner
    pub fn find_duplicates(&self) -> Result<PipelineResult, SimilarImagesError> {
        self.find_duplicates_with_events(&null_sender())
    }

    /// Find duplicates with event reporting
    pub fn find_duplicates_with_events(
        &self,
        events: &EventSender,
    ) -> Result<PipelineResult, SimilarImagesError> {
        let start_time = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::Started));

        let (listing, mut errors) = self.list(events)?;
        let shards = self.partition(&listing, events)?;

        let duplicates = DuplicateSet::new();
        let totals = self.compare(&listing, shards, PairSink::Duplicates(&duplicates), events);
        errors.extend(totals.errors);

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Aggregating,
        }));
        let duplicates = duplicates.into_sorted();
        let duration_ms = start_time.elapsed().as_millis() as u64;

        tracing::info!(
            images = listing.len(),
            duplicates = duplicates.len(),
            similar_pairs = totals.similar,
            skipped_pairs = totals.skipped,
            duration_ms,
            "Duplicate search finished"
        );

        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                total_images: listing.len(),
                total_pairs: listing.total_pairs(),
                skipped_pairs: totals.skipped,
                duplicate_images: duplicates.len(),
                records_committed: 0,
                duration_ms,
            },
        }));

        Ok(PipelineResult {
            duplicates,
            total_images: listing.len(),
            total_pairs: listing.total_pairs(),
            compared_pairs: totals.compared,
            similar_pairs: totals.similar,
            skipped_pairs: totals.skipped,
            errors,
            cache: self.images.stats(),
            duration_ms,
        })
    }

    /// Compute a record for every pair and write them to `store`
    pub fn generate_records(
        &self,
        store: &dyn RecordStore,
    ) -> Result<RecordRunResult, SimilarImagesError> {
        self.generate_records_with_events(store, &null_sender())
    }

    /// Generate records with event reporting
    pub fn generate_records_with_events(
        &self,
        store: &dyn RecordStore,
        events: &EventSender,
    ) -> Result<RecordRunResult, SimilarImagesError> {
        let start_time = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::Started));

        let (listing, mut errors) = self.list(events)?;
        let shards = self.partition(&listing, events)?;
        let batch_size = self.config.batch_size;

        let (totals, persist) = std::thread::scope(|scope| {
            let (tx, rx) = crossbeam_channel::bounded(RECORD_CHANNEL_CAPACITY);
            let collector =
                scope.spawn(move || RecordBatcher::new(store, batch_size, events).collect(rx));

            let totals = self.compare(&listing, shards, PairSink::Records(&tx), events);
            drop(tx);

            events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
                phase: PipelinePhase::Aggregating,
            }));
            let persist = collector.join().map_err(|_| {
                PersistError::QueryFailed("record collector panicked".to_string())
            })?;

            Ok::<_, SimilarImagesError>((totals, persist))
        })?;

        errors.extend(totals.errors);
        errors.extend(persist.errors.iter().cloned());
        let duration_ms = start_time.elapsed().as_millis() as u64;

        tracing::info!(
            images = listing.len(),
            records = persist.records_committed,
            rolled_back = persist.batches_rolled_back,
            skipped_pairs = totals.skipped,
            duration_ms,
            "Record generation finished"
        );

        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                total_images: listing.len(),
                total_pairs: listing.total_pairs(),
                skipped_pairs: totals.skipped,
                duplicate_images: 0,
                records_committed: persist.records_committed,
                duration_ms,
            },
        }));

        Ok(RecordRunResult {
            total_images: listing.len(),
            total_pairs: listing.total_pairs(),
            compared_pairs: totals.compared,
            skipped_pairs: totals.skipped,
            persist,
            errors,
            cache: self.images.stats(),
            duration_ms,
        })
    }

    fn list(&self, events: &EventSender) -> Result<(ImageListing, Vec<String>), SimilarImagesError> {
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Listing,
        }));

        let result = self.lister.list_with_events(&self.config.root, events)?;
        let errors = result.errors.iter().map(ToString::to_string).collect();
        Ok((result.listing, errors))
    }

    fn partition(
        &self,
        listing: &ImageListing,
        events: &EventSender,
    ) -> Result<Vec<Shard>, SimilarImagesError> {
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Partitioning,
        }));

        let shards = PairPartitioner::new(self.workers.workers())?.partition(listing);
        let shard_sizes: Vec<usize> = shards.iter().map(Shard::pair_count).collect();

        tracing::debug!(
            images = listing.len(),
            pairs = listing.total_pairs(),
            shards = shards.len(),
            "Partitioned pair workload"
        );
        events.send(Event::Partition(PartitionEvent::Completed {
            total_pairs: listing.total_pairs(),
            shard_sizes,
        }));

        Ok(shards)
    }

    fn compare(
        &self,
        listing: &ImageListing,
        shards: Vec<Shard>,
        sink: PairSink<'_>,
        events: &EventSender,
    ) -> CompareTotals {
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Comparing,
        }));

        let total_pairs = listing.total_pairs();
        events.send(Event::Compare(CompareEvent::Started {
            total_pairs,
            workers: self.workers.workers(),
        }));

        let completed = AtomicUsize::new(0);
        let reports = self.workers.run(shards, |shard| {
            self.run_shard(shard, listing, sink, &completed, total_pairs, events)
        });
        let totals = CompareTotals::from_reports(reports);

        events.send(Event::Compare(CompareEvent::Completed {
            compared: totals.compared,
            skipped: totals.skipped,
            similar_pairs: totals.similar,
        }));

        totals
    }

    fn run_shard(
        &self,
        shard: &Shard,
        listing: &ImageListing,
        sink: PairSink<'_>,
        completed: &AtomicUsize,
        total_pairs: usize,
        events: &EventSender,
    ) -> WorkerReport {
        let mut report = WorkerReport {
            worker: shard.index(),
            ..WorkerReport::default()
        };
        tracing::debug!(worker = shard.index(), pairs = shard.pair_count(), "Worker started");

        for pair in shard.pairs() {
            let Some(key) = listing.pair_key(pair) else {
                continue;
            };

            match self.compare_pair(key, sink) {
                Ok(similar) => {
                    report.compared += 1;
                    if similar {
                        report.similar += 1;
                    }
                }
                Err(e) => {
                    report.skipped += 1;
                    tracing::warn!(
                        first = %key.first.display(),
                        second = %key.second.display(),
                        error = %e,
                        "Skipping pair"
                    );
                    events.send(Event::Compare(CompareEvent::PairSkipped {
                        first: key.first.to_path_buf(),
                        second: key.second.to_path_buf(),
                        message: e.to_string(),
                    }));
                    report.errors.push(e.to_string());
                }
            }

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_INTERVAL == 0 || done == total_pairs {
                events.send(Event::Compare(CompareEvent::Progress(CompareProgress {
                    pairs_completed: done,
                    total_pairs,
                })));
            }
        }

        tracing::debug!(
            worker = report.worker,
            compared = report.compared,
            skipped = report.skipped,
            "Worker finished"
        );
        events.send(Event::Compare(CompareEvent::WorkerFinished {
            worker: report.worker,
            compared: report.compared,
            skipped: report.skipped,
        }));

        report
    }

    /// Compare one pair, returning whether it was judged similar
    fn compare_pair(&self, key: PairKey<'_>, sink: PairSink<'_>) -> Result<bool, SimilarImagesError> {
        let first = self.images.load(key.first)?;
        let second = self.images.load(key.second)?;

        match sink {
            PairSink::Duplicates(set) => {
                let verdict = self.comparator.verdict(&first, &second)?;
                if verdict.is_similar() {
                    tracing::debug!(
                        first = %key.first.display(),
                        second = %key.second.display(),
                        %verdict,
                        "Similar pair"
                    );
                    set.insert_pair(key.first, key.second);
                }
                Ok(verdict.is_similar())
            }
            PairSink::Records(records) => {
                let record = self.comparator.record(&first, &second)?;
                let similar = record.similar;
                records.send(record).map_err(|_| {
                    PersistError::QueryFailed("record collector stopped".to_string())
                })?;
                Ok(similar)
            }
        }
    }
}
