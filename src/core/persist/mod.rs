//! # Persist Module
//!
//! Writes similarity records to a relational store in all-or-nothing batches.
//!
//! ## Backends
//! - `SqliteRecordStore` - `all_images` table in a SQLite database
//! - `InMemoryRecordStore` - For testing

mod memory;
mod sqlite;

pub use memory::InMemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use crate::core::comparator::SimilarityRecord;
use crate::error::PersistError;

/// Trait for similarity record stores
pub trait RecordStore: Send + Sync {
    /// Store every record of `batch`, or none of them.
    ///
    /// Records are keyed by `(img1, img2)`; storing a pair again replaces it,
    /// so rerunning over the same directory leaves the store unchanged.
    fn commit_batch(&self, batch: &[SimilarityRecord]) -> Result<(), PersistError>;

    /// Number of stored records
    fn count(&self) -> Result<usize, PersistError>;

    /// All stored records ordered by `(img1, img2)`
    fn records(&self) -> Result<Vec<SimilarityRecord>, PersistError>;
}

/// Check the similarity columns are within `[0, 1]`
pub(crate) fn check_record(record: &SimilarityRecord) -> Result<(), PersistError> {
    for (column, value) in [("grayscale", record.grayscale), ("histogram", record.histogram)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(PersistError::QueryFailed(format!(
                "{column} {value} out of range for pair ({}, {})",
                record.img1, record.img2
            )));
        }
    }
    Ok(())
}
