//! Crate-wide error type.
//!
//! Configuration problems (bad hyperparameters, empty sequences, an
//! infeasible beam) are rejected before any tensor work starts, so a
//! numeric failure past these checks is a bug rather than an `NmtError`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NmtError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("batch is empty")]
    EmptyBatch,

    #[error("sequence {index} has zero length")]
    EmptySequence { index: usize },

    #[error("length vector has {lengths} entries but the batch has {batch}")]
    LengthMismatch { lengths: usize, batch: usize },

    #[error("sequence {index} has length {length}, longer than the padded length {padded}")]
    LengthOverflow {
        index: usize,
        length: usize,
        padded: usize,
    },

    #[error("target sequence {index} needs at least a start token and one more token")]
    TargetTooShort { index: usize },

    #[error("sequence {index} holds token id {id}, outside a vocabulary of {vocab}")]
    TokenOutOfRange { index: usize, id: i64, vocab: usize },

    #[error("search size {search_size} exceeds the candidate pool of {pool}")]
    SearchSize { search_size: usize, pool: usize },

    #[error("invalid beam configuration: {0}")]
    InvalidBeam(String),

    #[error("tensor readback: {0}")]
    TensorData(String),

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parameter record: {0}")]
    Record(String),

    #[error("checkpoint metadata: {0}")]
    Metadata(String),

    #[error("checkpoint digest mismatch: expected {expected}, found {found}")]
    DigestMismatch { expected: String, found: String },
}

pub type Result<T> = std::result::Result<T, NmtError>;

impl NmtError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
