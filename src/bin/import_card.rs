use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sqlx::postgres::PgPoolOptions;

use card_api::config::{ImportConfig, parse_max_rows};
use card_api::db::run_migrations;
use card_api::import::{CardImporter, PgCardStore};

#[derive(Parser, Debug)]
#[command(name = "import-card", about = "Import cards from CSV")]
struct Args {
    /// CSV file to import (defaults to `CARD_IMPORT_FILE` or `data/cards.csv`).
    #[arg(long)]
    file: Option<PathBuf>,

    /// Rows processed between flushes (defaults to `CARD_IMPORT_BATCH_SIZE` or 10000).
    #[arg(long)]
    batch_size: Option<usize>,

    /// Stop after this many rows; `0` reads the whole file (defaults to one batch).
    #[arg(long, value_parser = parse_row_limit)]
    max_rows: Option<RowLimit>,
}

/// Parsed `--max-rows` value; `None` means unlimited.
#[derive(Debug, Clone, Copy)]
struct RowLimit(Option<usize>);

fn parse_row_limit(value: &str) -> Result<RowLimit, String> {
    parse_max_rows(value)
        .map(RowLimit)
        .ok_or_else(|| format!("invalid row limit '{value}'"))
}

impl Args {
    fn into_config(self) -> ImportConfig {
        let mut config = ImportConfig::from_env();
        if let Some(file) = self.file {
            config.file = file;
        }
        if let Some(batch_size) = self.batch_size {
            let follows_batch = config.max_rows == Some(config.batch_size);
            config = config.with_batch_size(batch_size);
            if follows_batch {
                config.max_rows = Some(config.batch_size);
            }
        }
        if let Some(RowLimit(max_rows)) = self.max_rows {
            config = config.with_max_rows(max_rows);
        }
        config
    }
}

fn spinner() -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {elapsed} {msg}") {
        progress.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress.set_message("Importing cards...");
    progress
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let config = Args::parse().into_config();

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            log::error!("DATABASE_URL is not set");
            eprintln!("[ERROR] DATABASE_URL is not set");
            return ExitCode::FAILURE;
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
    {
        Ok(pool) => pool,
        Err(err) => {
            log::error!("cannot connect to database: {}", err);
            eprintln!("[ERROR] Cannot connect to database");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = run_migrations(&pool).await {
        log::error!("database migrations failed: {}", err);
        eprintln!("[ERROR] Database migrations failed");
        return ExitCode::FAILURE;
    }

    let importer = CardImporter::new(config);
    let mut store = PgCardStore::new(pool);
    let progress = spinner();

    match importer.run(&mut store, &progress).await {
        Ok(summary) => {
            progress.finish_with_message("Importing cards done.");
            println!(
                "[OK] Imported {} cards in {:.2} seconds ({} skipped, {} failed)",
                summary.imported,
                summary.elapsed.as_secs_f64(),
                summary.skipped,
                summary.failed
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            progress.abandon_with_message("Import aborted.");
            eprintln!("[ERROR] {err}");
            ExitCode::FAILURE
        }
    }
}
