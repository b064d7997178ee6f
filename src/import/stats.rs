//! Per-row outcomes and the run summary they aggregate into.

use std::time::Duration;

use super::error::RowError;

/// Result of processing one row of the import file.
#[derive(Debug)]
pub enum RowOutcome {
    /// A new card was staged.
    Imported(String),
    /// The UUID was already known to the store or earlier in the file.
    Skipped(String),
    /// The row could not be turned into a staged card.
    Failed(RowError),
}

/// Statistics for a single import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows read from the file, whatever their outcome.
    pub processed: usize,
    /// Cards staged and committed.
    pub imported: usize,
    /// Rows whose UUID already existed.
    pub skipped: usize,
    /// Malformed rows or rows rejected while staging.
    pub failed: usize,
    /// Flushes issued to the store.
    pub flushes: usize,
    pub elapsed: Duration,
}

impl ImportSummary {
    /// Count one row outcome.
    pub fn record(&mut self, outcome: &RowOutcome) {
        self.processed += 1;
        match outcome {
            RowOutcome::Imported(_) => self.imported += 1,
            RowOutcome::Skipped(_) => self.skipped += 1,
            RowOutcome::Failed(_) => self.failed += 1,
        }
    }
}
