//! # Error Module
//!
//! Error types for the similar image finder.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Pair-local failures stay pair-local** - a broken image skips its pairs, not the run

use std::path::PathBuf;
use thiserror::Error;

use crate::core::hasher::HashAlgorithmKind;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SimilarImagesError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Comparison error: {0}")]
    Compare(#[from] CompareError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Move error: {0}")]
    Move(#[from] MoveError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while listing the input directory
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while decoding or fingerprinting an image
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    #[error("Resize failed: {0}")]
    ResizeFailed(String),

    #[error("Failed to open image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while comparing fingerprints
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Fingerprint length mismatch: {left} bits vs {right} bits")]
    DimensionMismatch { left: u32, right: u32 },

    #[error("Cannot compare a {left} fingerprint with a {right} fingerprint")]
    AlgorithmMismatch {
        left: HashAlgorithmKind,
        right: HashAlgorithmKind,
    },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Errors that occur with the decode cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Decode cache lock poisoned while accessing {path}")]
    Poisoned { path: PathBuf },
}

/// Errors that occur while persisting similarity records
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to open record database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Batch {batch} of {records} records was rolled back: {reason}")]
    BatchRolledBack {
        batch: usize,
        records: usize,
        reason: String,
    },

    #[error("Record store lock poisoned")]
    Poisoned,
}

/// Errors that occur while relocating duplicate images
#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Failed to create target directory {path}: {source}")]
    CreateTarget {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Target {path} is not a directory")]
    TargetNotDirectory { path: PathBuf },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SimilarImagesError>;
