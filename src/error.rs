//! Error types for dataset construction, sample retrieval and batching.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    /// Invalid configuration detected at dataset construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A modality name in `data_to_load` that no dispatch rule recognizes.
    #[error("unknown data key: {0:?}")]
    UnsupportedKey(String),

    /// Sample index outside the metadata table.
    #[error("sample index {idx} out of range, table has {len} rows")]
    IndexOutOfRange { idx: usize, len: usize },

    /// An expected payload file or directory is absent.
    #[error("{what} not found: {path}")]
    NotFound { what: &'static str, path: PathBuf },

    /// A payload file exists but could not be decoded.
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Per-sample tensor shapes disagree within one batch.
    #[error("shape mismatch for {key:?}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        key: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// Batch with an empty sample list.
    #[error("cannot assemble an empty batch")]
    EmptyBatch,

    /// Ragged batch: a sample lacks a key the first sample carries.
    #[error("inconsistent batch: sample {idx} is missing key {key:?}")]
    InconsistentBatch { idx: usize, key: String },

    /// Malformed metadata table contents.
    #[error("metadata table error at row {row}: {message}")]
    Table { row: usize, message: String },

    /// Requested functionality that is recognized but not implemented.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
