//! Environment-driven configuration for the import command.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_IMPORT_FILE: &str = "data/cards.csv";
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

fn parse_usize(value: Option<String>, default: usize) -> usize {
    value
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

/// Parse a row cap. `0`, `none` and `unlimited` disable the cap.
pub fn parse_max_rows(value: &str) -> Option<Option<usize>> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "0" | "none" | "unlimited" => Some(None),
        _ => value.parse::<usize>().ok().map(Some),
    }
}

/// Runtime configuration for a card import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// CSV file read by the run.
    pub file: PathBuf,
    /// Rows processed between two flushes.
    pub batch_size: usize,
    /// Stop after this many rows; `None` reads the whole file.
    pub max_rows: Option<usize>,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Unset or unparsable values fall back to defaults. The row cap defaults
    /// to one batch.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = lookup("CARD_IMPORT_FILE")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IMPORT_FILE));
        let batch_size = parse_usize(lookup("CARD_IMPORT_BATCH_SIZE"), DEFAULT_BATCH_SIZE).max(1);
        let max_rows = lookup("CARD_IMPORT_MAX_ROWS")
            .and_then(|value| parse_max_rows(&value))
            .unwrap_or(Some(batch_size));

        Self {
            file,
            batch_size,
            max_rows,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows.filter(|rows| *rows > 0);
        self
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
