//! SQLite record store.

use super::RecordStore;
use crate::core::comparator::SimilarityRecord;
use crate::error::PersistError;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS all_images (
        img1 TEXT NOT NULL,
        img2 TEXT NOT NULL,
        aHash INTEGER NOT NULL,
        dHash INTEGER NOT NULL,
        pHash INTEGER NOT NULL,
        grayscale REAL NOT NULL CHECK (grayscale BETWEEN 0.0 AND 1.0),
        histogram REAL NOT NULL CHECK (histogram BETWEEN 0.0 AND 1.0),
        similar INTEGER NOT NULL,
        PRIMARY KEY (img1, img2)
    );
";

/// Record store backed by the `all_images` table
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteRecordStore {
    /// Open or create the record database
    pub fn open(path: &Path) -> Result<Self, PersistError> {
        let open_failed = |reason: String| PersistError::OpenFailed {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| open_failed(e.to_string()))?;
        }

        let conn = Connection::open(path).map_err(|e| open_failed(e.to_string()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| open_failed(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| open_failed(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Open a database that lives only as long as the store
    pub fn in_memory() -> Result<Self, PersistError> {
        let conn = Connection::open_in_memory().map_err(|e| PersistError::OpenFailed {
            path: PathBuf::from(":memory:"),
            reason: e.to_string(),
        })?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| PersistError::QueryFailed(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

impl RecordStore for SqliteRecordStore {
    fn commit_batch(&self, batch: &[SimilarityRecord]) -> Result<(), PersistError> {
        let mut conn = self.conn.lock().map_err(|_| PersistError::Poisoned)?;

        // Dropping the transaction without commit rolls it back
        let tx = conn
            .transaction()
            .map_err(|e| PersistError::QueryFailed(e.to_string()))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO all_images
                     (img1, img2, aHash, dHash, pHash, grayscale, histogram, similar)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .map_err(|e| PersistError::QueryFailed(e.to_string()))?;

            for record in batch {
                stmt.execute(params![
                    record.img1,
                    record.img2,
                    record.ahash,
                    record.dhash,
                    record.phash,
                    record.grayscale,
                    record.histogram,
                    record.similar,
                ])
                .map_err(|e| {
                    PersistError::QueryFailed(format!(
                        "pair ({}, {}): {}",
                        record.img1, record.img2, e
                    ))
                })?;
            }
        }
        tx.commit()
            .map_err(|e| PersistError::QueryFailed(e.to_string()))
    }

    fn count(&self) -> Result<usize, PersistError> {
        let conn = self.conn.lock().map_err(|_| PersistError::Poisoned)?;
        conn.query_row("SELECT COUNT(*) FROM all_images", [], |row| {
            row.get::<_, i64>(0).map(|v| v as usize)
        })
        .map_err(|e| PersistError::QueryFailed(e.to_string()))
    }

    fn records(&self) -> Result<Vec<SimilarityRecord>, PersistError> {
        let conn = self.conn.lock().map_err(|_| PersistError::Poisoned)?;
        let mut stmt = conn
            .prepare(
                "SELECT img1, img2, aHash, dHash, pHash, grayscale, histogram, similar
                 FROM all_images
                 ORDER BY img1, img2",
            )
            .map_err(|e| PersistError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(SimilarityRecord {
                    img1: row.get(0)?,
                    img2: row.get(1)?,
                    ahash: row.get(2)?,
                    dhash: row.get(3)?,
                    phash: row.get(4)?,
                    grayscale: row.get(5)?,
                    histogram: row.get(6)?,
                    similar: row.get(7)?,
                })
            })
            .map_err(|e| PersistError::QueryFailed(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| PersistError::QueryFailed(e.to_string()))
    }
}
