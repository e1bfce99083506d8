//! In-memory record store for testing.

use super::{check_record, RecordStore};
use crate::core::comparator::SimilarityRecord;
use crate::error::PersistError;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-memory record store
///
/// Applies the same range checks as the SQLite schema so rollback behaviour
/// can be exercised without a database.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<BTreeMap<(String, String), SimilarityRecord>>,
}

impl InMemoryRecordStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn commit_batch(&self, batch: &[SimilarityRecord]) -> Result<(), PersistError> {
        batch.iter().try_for_each(check_record)?;

        let mut records = self.records.lock().map_err(|_| PersistError::Poisoned)?;
        for record in batch {
            records.insert((record.img1.clone(), record.img2.clone()), record.clone());
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, PersistError> {
        let records = self.records.lock().map_err(|_| PersistError::Poisoned)?;
        Ok(records.len())
    }

    fn records(&self) -> Result<Vec<SimilarityRecord>, PersistError> {
        let records = self.records.lock().map_err(|_| PersistError::Poisoned)?;
        Ok(records.values().cloned().collect())
    }
}
