//! Error types for the card import pipeline.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::store::StoreError;

/// Fatal errors that abort an import run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot open {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read header row: {0}")]
    Header(csv::Error),
    #[error("header is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
    #[error("failed reading import file: {0}")]
    Read(csv::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Recoverable errors scoped to a single row.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("malformed row at line {line}: {reason}")]
    Format { line: u64, reason: String },
    #[error("could not stage card {uuid}: {source}")]
    Persistence {
        uuid: String,
        #[source]
        source: StoreError,
    },
}

impl RowError {
    pub fn format(line: u64, reason: impl Into<String>) -> Self {
        RowError::Format {
            line,
            reason: reason.into(),
        }
    }
}
