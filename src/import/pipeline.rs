//! Import coordination for CSV card files.
//!
//! A run opens the file, snapshots the UUIDs already stored, then walks the
//! rows once inside a single store transaction:
//! 1. Map each row through the header
//! 2. Skip UUIDs already known
//! 3. Stage new cards, flushing every `batch_size` rows
//! 4. Final flush and commit, or rollback on any store failure

use csv::StringRecord;
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;

use super::error::{ImportError, RowError};
use super::record::{CardRecord, ColumnIndex};
use super::stats::{ImportSummary, RowOutcome};
use super::store::CardStore;
use crate::config::ImportConfig;

/// Drives one import run against a [`CardStore`].
#[derive(Debug, Clone)]
pub struct CardImporter {
    config: ImportConfig,
}

impl CardImporter {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    /// Import the file named by the configuration.
    pub async fn run<S: CardStore>(
        &self,
        store: &mut S,
        progress: &ProgressBar,
    ) -> Result<ImportSummary, ImportError> {
        self.import_file(&self.config.file, store, progress).await
    }

    /// Import every new card from `path`.
    ///
    /// Fails without touching the store when the file cannot be opened or its
    /// header lacks a required column. Store failures after the transaction
    /// has begun roll the whole run back.
    pub async fn import_file<S: CardStore>(
        &self,
        path: &Path,
        store: &mut S,
        progress: &ProgressBar,
    ) -> Result<ImportSummary, ImportError> {
        let started = Instant::now();

        let file = File::open(path).map_err(|source| {
            log::error!("cannot open import file {}: {}", path.display(), source);
            ImportError::FileAccess {
                path: path.to_path_buf(),
                source,
            }
        })?;
        log::info!("starting card import from {}", path.display());

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(BufReader::new(file));
        let headers = reader.headers().map_err(ImportError::Header)?.clone();
        let columns = ColumnIndex::from_headers(&headers)?;

        let mut known = store.list_all_uuids().await?;
        log::info!("{} cards already present in store", known.len());

        store.begin().await?;

        let result = match self
            .process_rows(&mut reader, &columns, &mut known, store, progress)
            .await
        {
            Ok((summary, pending)) => self.finish(store, summary, pending).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(mut summary) => {
                summary.elapsed = started.elapsed();
                log::info!(
                    "import completed: {} cards in {:.2} seconds ({} processed, {} skipped, {} failed)",
                    summary.imported,
                    summary.elapsed.as_secs_f64(),
                    summary.processed,
                    summary.skipped,
                    summary.failed
                );
                Ok(summary)
            }
            Err(err) => {
                log::error!("card import failed, rolling back: {}", err);
                if let Err(rollback_err) = store.rollback().await {
                    log::error!("rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Walk the rows, returning the running summary and the number of cards
    /// staged since the last flush.
    async fn process_rows<R: Read, S: CardStore>(
        &self,
        reader: &mut csv::Reader<R>,
        columns: &ColumnIndex,
        known: &mut HashSet<String>,
        store: &mut S,
        progress: &ProgressBar,
    ) -> Result<(ImportSummary, usize), ImportError> {
        let batch_size = self.config.batch_size.max(1);
        let mut summary = ImportSummary::default();
        let mut pending = 0usize;

        for result in reader.records() {
            let outcome = match result {
                Ok(row) => stage_row(&row, columns, known, store),
                Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => {
                    return Err(ImportError::Read(err));
                }
                Err(err) => {
                    let line = err.position().map(|pos| pos.line()).unwrap_or(0);
                    RowOutcome::Failed(RowError::format(line, err.to_string()))
                }
            };

            match &outcome {
                RowOutcome::Imported(uuid) => {
                    pending += 1;
                    log::info!("card added: {}", uuid);
                }
                RowOutcome::Skipped(uuid) => log::debug!("card {} already stored, skipping", uuid),
                RowOutcome::Failed(err) => log::error!("error while adding card: {}", err),
            }
            summary.record(&outcome);

            if summary.processed % batch_size == 0 {
                let written = store.flush().await?;
                store.clear();
                summary.flushes += 1;
                pending = 0;
                progress.inc(1);
                progress.set_message(format!("{} cards processed", summary.processed));
                log::info!(
                    "flushed {} cards after processing {} rows",
                    written,
                    summary.processed
                );
            }

            if let Some(max_rows) = self.config.max_rows {
                if summary.processed >= max_rows {
                    log::info!("reached limit of {} rows, stopping import", max_rows);
                    break;
                }
            }
        }

        Ok((summary, pending))
    }

    async fn finish<S: CardStore>(
        &self,
        store: &mut S,
        mut summary: ImportSummary,
        pending: usize,
    ) -> Result<ImportSummary, ImportError> {
        if pending > 0 {
            let written = store.flush().await?;
            summary.flushes += 1;
            log::info!(
                "final flush wrote {} cards after processing {} rows",
                written,
                summary.processed
            );
        }
        store.clear();
        store.commit().await?;
        Ok(summary)
    }
}

/// Map, dedup and stage a single row.
fn stage_row<S: CardStore>(
    row: &StringRecord,
    columns: &ColumnIndex,
    known: &mut HashSet<String>,
    store: &mut S,
) -> RowOutcome {
    let record = match CardRecord::from_row(row, columns) {
        Ok(record) => record,
        Err(err) => return RowOutcome::Failed(err),
    };

    if known.contains(&record.uuid) {
        return RowOutcome::Skipped(record.uuid);
    }

    let card = match record.into_card() {
        Ok(card) => card,
        Err(err) => return RowOutcome::Failed(err),
    };

    let uuid = card.uuid.clone();
    match store.persist(card) {
        Ok(()) => {
            known.insert(uuid.clone());
            RowOutcome::Imported(uuid)
        }
        Err(source) => RowOutcome::Failed(RowError::Persistence { uuid, source }),
    }
}
