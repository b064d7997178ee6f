//! Bulk card import from CSV.
//!
//! 1. **Records** (`record`) - Header-driven mapping from rows to cards
//! 2. **Store** (`store`) - Persistence collaborator with explicit transactions
//! 3. **Coordination** (`pipeline`) - Dedup, batching, flush and commit
//! 4. **Statistics** (`stats`) - Per-row outcomes and the run summary
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use card_api::config::ImportConfig;
//! use card_api::import::{CardImporter, PgCardStore};
//!
//! let mut store = PgCardStore::new(pool);
//! let importer = CardImporter::new(ImportConfig::from_env());
//! let summary = importer.run(&mut store, &ProgressBar::hidden()).await?;
//!
//! println!("Imported {} cards", summary.imported);
//! ```

pub mod error;
pub mod pipeline;
pub mod record;
pub mod stats;
pub mod store;

pub use error::{ImportError, RowError};
pub use pipeline::CardImporter;
pub use stats::{ImportSummary, RowOutcome};
pub use store::{CardStore, PgCardStore, StoreError};
