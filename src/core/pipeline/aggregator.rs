//! Result aggregation for both pipeline modes.

use crate::core::comparator::SimilarityRecord;
use crate::core::persist::RecordStore;
use crate::error::PersistError;
use crate::events::{Event, EventSender, PersistEvent};
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default number of records per committed batch
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Paths that appeared in at least one similar pair.
///
/// Shared by every worker during a run and read once after they are joined.
#[derive(Debug, Default)]
pub struct DuplicateSet {
    paths: Mutex<BTreeSet<PathBuf>>,
}

impl DuplicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record both images of a similar pair
    pub fn insert_pair(&self, first: &Path, second: &Path) {
        // A worker that panicked mid-insert cannot leave a half-written BTreeSet
        // entry, so a poisoned set is still safe to use
        let mut paths = self
            .paths
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        paths.insert(first.to_path_buf());
        paths.insert(second.to_path_buf());
    }

    pub fn len(&self) -> usize {
        self.paths
            .lock()
            .map(|paths| paths.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted paths, consuming the set
    pub fn into_sorted(self) -> Vec<PathBuf> {
        self.paths
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .into_iter()
            .collect()
    }
}

/// Outcome of persisting a record stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReport {
    /// Records that reached the store
    pub records_committed: usize,
    pub batches_committed: usize,
    pub batches_rolled_back: usize,
    /// Records lost to rolled-back batches
    pub records_rolled_back: usize,
    /// One message per rolled-back batch
    pub errors: Vec<String>,
}

/// Groups records into fixed-size batches and commits each one.
///
/// A failed batch is rolled back by the store, reported, and skipped; later
/// batches are still committed.
pub struct RecordBatcher<'a> {
    store: &'a dyn RecordStore,
    batch_size: usize,
    buffer: Vec<SimilarityRecord>,
    batch_number: usize,
    report: PersistReport,
    events: &'a EventSender,
}

impl<'a> RecordBatcher<'a> {
    pub fn new(store: &'a dyn RecordStore, batch_size: usize, events: &'a EventSender) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            batch_size,
            buffer: Vec::with_capacity(batch_size.min(DEFAULT_BATCH_SIZE)),
            batch_number: 0,
            report: PersistReport::default(),
            events,
        }
    }

    /// Queue a record, committing when the batch is full
    pub fn push(&mut self, record: SimilarityRecord) {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush();
        }
    }

    /// Commit whatever is buffered
    pub fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        self.batch_number += 1;
        let batch = self.batch_number;
        let records = self.buffer.len();

        match self.store.commit_batch(&self.buffer) {
            Ok(()) => {
                tracing::info!(batch, records, "Committed record batch");
                self.report.batches_committed += 1;
                self.report.records_committed += records;
                self.events
                    .send(Event::Persist(PersistEvent::BatchCommitted { batch, records }));
            }
            Err(e) => {
                let error = PersistError::BatchRolledBack {
                    batch,
                    records,
                    reason: e.to_string(),
                };
                tracing::error!(batch, records, error = %e, "Record batch rolled back");
                self.report.batches_rolled_back += 1;
                self.report.records_rolled_back += records;
                self.report.errors.push(error.to_string());
                self.events.send(Event::Persist(PersistEvent::BatchRolledBack {
                    batch,
                    records,
                    message: e.to_string(),
                }));
            }
        }

        self.buffer.clear();
    }

    /// Commit the remainder and return the report
    pub fn finish(mut self) -> PersistReport {
        self.flush();
        self.report
    }

    /// Drain a record channel until every sender is gone
    pub fn collect(mut self, records: Receiver<SimilarityRecord>) -> PersistReport {
        for record in records {
            self.push(record);
        }
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persist::InMemoryRecordStore;
    use crate::events::{null_sender, EventChannel};

    fn create_record(index: usize, grayscale: f64) -> SimilarityRecord {
        SimilarityRecord {
            img1: format!("{index}.jpg"),
            img2: format!("{}.jpg", index + 1000),
            ahash: 1,
            dhash: 1,
            phash: 1,
            grayscale,
            histogram: 0.5,
            similar: true,
        }
    }

    #[test]
    fn duplicate_set_keeps_each_path_once() {
        let set = DuplicateSet::new();
        set.insert_pair(Path::new("/b.png"), Path::new("/a.png"));
        set.insert_pair(Path::new("/a.png"), Path::new("/c.png"));

        assert_eq!(set.len(), 3);
        assert_eq!(
            set.into_sorted(),
            vec![
                PathBuf::from("/a.png"),
                PathBuf::from("/b.png"),
                PathBuf::from("/c.png")
            ]
        );
    }

    #[test]
    fn duplicate_set_is_shared_across_threads() {
        let set = DuplicateSet::new();
        std::thread::scope(|scope| {
            for worker in 0..4 {
                let set = &set;
                scope.spawn(move || {
                    for i in 0..25 {
                        let path = PathBuf::from(format!("/{worker}-{i}.png"));
                        set.insert_pair(&path, Path::new("/shared.png"));
                    }
                });
            }
        });
        assert_eq!(set.len(), 101);
    }

    #[test]
    fn records_are_committed_in_batches() {
        let store = InMemoryRecordStore::new();
        let events = null_sender();
        let mut batcher = RecordBatcher::new(&store, 3, &events);

        for i in 0..7 {
            batcher.push(create_record(i, 0.5));
        }
        let report = batcher.finish();

        assert_eq!(report.batches_committed, 3);
        assert_eq!(report.records_committed, 7);
        assert_eq!(store.count().unwrap(), 7);
    }

    #[test]
    fn failed_batch_is_reported_and_later_batches_continue() {
        let store = InMemoryRecordStore::new();
        let (sender, receiver) = EventChannel::new();
        let mut batcher = RecordBatcher::new(&store, 2, &sender);

        batcher.push(create_record(0, 0.5));
        batcher.push(create_record(1, 0.5));
        batcher.push(create_record(2, 0.5));
        batcher.push(create_record(3, 3.0));
        batcher.push(create_record(4, 0.5));
        let report = batcher.finish();

        assert_eq!(report.batches_committed, 2);
        assert_eq!(report.batches_rolled_back, 1);
        assert_eq!(report.records_rolled_back, 2);
        assert_eq!(report.records_committed, 3);
        assert!(report.errors[0].contains("Batch 2"));
        assert_eq!(store.count().unwrap(), 3);

        drop(sender);
        let rolled_back = receiver
            .iter()
            .filter(|e| matches!(e, Event::Persist(PersistEvent::BatchRolledBack { batch: 2, .. })))
            .count();
        assert_eq!(rolled_back, 1);
    }

    #[test]
    fn collect_drains_channel() {
        let store = InMemoryRecordStore::new();
        let events = null_sender();
        let (tx, rx) = crossbeam_channel::unbounded();

        for i in 0..5 {
            tx.send(create_record(i, 0.5)).unwrap();
        }
        drop(tx);

        let report = RecordBatcher::new(&store, DEFAULT_BATCH_SIZE, &events).collect(rx);
        assert_eq!(report.records_committed, 5);
        assert_eq!(report.batches_committed, 1);
    }
}
