//! Persistence collaborator for the import pipeline.
//!
//! The pipeline only talks to a [`CardStore`]: a UUID snapshot, a staging
//! area, and explicit transaction control. [`PgCardStore`] backs it with one
//! PostgreSQL transaction per run and writes each batch with a single UNNEST
//! insert.

use rocket_db_pools::sqlx::{self, PgPool, Postgres, Transaction};
use std::collections::HashSet;
use thiserror::Error;

use crate::models::NewCard;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("no transaction is open")]
    NoTransaction,
    #[error("a transaction is already open")]
    TransactionActive,
    #[error("card {0} is already staged")]
    DuplicateStaged(String),
    #[error("card rejected: {0}")]
    Rejected(String),
}

/// Storage operations consumed by the import pipeline.
#[rocket::async_trait]
pub trait CardStore: Send {
    /// Snapshot of every UUID currently stored.
    async fn list_all_uuids(&mut self) -> Result<HashSet<String>, StoreError>;

    /// Stage a new card for the next flush.
    fn persist(&mut self, card: NewCard) -> Result<(), StoreError>;

    /// Write staged cards inside the open transaction, returning rows written.
    async fn flush(&mut self) -> Result<usize, StoreError>;

    /// Release in-memory state left over from previous flushes.
    fn clear(&mut self);

    async fn begin(&mut self) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard the open transaction. A no-op when none is open.
    async fn rollback(&mut self) -> Result<(), StoreError>;
}

/// PostgreSQL-backed card store.
pub struct PgCardStore {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    staged: Vec<NewCard>,
    staged_uuids: HashSet<String>,
}

impl PgCardStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx: None,
            staged: Vec::new(),
            staged_uuids: HashSet::new(),
        }
    }
}

#[rocket::async_trait]
impl CardStore for PgCardStore {
    async fn list_all_uuids(&mut self) -> Result<HashSet<String>, StoreError> {
        let uuids: Vec<String> = sqlx::query_scalar("SELECT uuid FROM cards")
            .fetch_all(&self.pool)
            .await?;
        Ok(uuids.into_iter().collect())
    }

    fn persist(&mut self, card: NewCard) -> Result<(), StoreError> {
        if !self.staged_uuids.insert(card.uuid.clone()) {
            return Err(StoreError::DuplicateStaged(card.uuid));
        }
        self.staged.push(card);
        Ok(())
    }

    async fn flush(&mut self) -> Result<usize, StoreError> {
        let tx = self.tx.as_mut().ok_or(StoreError::NoTransaction)?;
        if self.staged.is_empty() {
            return Ok(0);
        }

        let cards = std::mem::take(&mut self.staged);
        let count = cards.len();

        let mut uuids = Vec::with_capacity(count);
        let mut names = Vec::with_capacity(count);
        let mut mana_values = Vec::with_capacity(count);
        let mut mana_costs = Vec::with_capacity(count);
        let mut rarities = Vec::with_capacity(count);
        let mut set_codes = Vec::with_capacity(count);
        let mut subtypes = Vec::with_capacity(count);
        let mut texts = Vec::with_capacity(count);
        let mut types = Vec::with_capacity(count);

        for card in cards {
            uuids.push(card.uuid);
            names.push(card.name);
            mana_values.push(card.mana_value);
            mana_costs.push(card.mana_cost);
            rarities.push(card.rarity);
            set_codes.push(card.set_code);
            subtypes.push(card.subtype);
            texts.push(card.text);
            types.push(card.card_type);
        }

        let result = sqlx::query(
            r#"INSERT INTO cards (
                uuid, name, mana_value, mana_cost, rarity, set_code, subtype, text, type
               )
               SELECT * FROM UNNEST(
                   $1::text[],
                   $2::text[],
                   $3::float8[],
                   $4::text[],
                   $5::text[],
                   $6::text[],
                   $7::text[],
                   $8::text[],
                   $9::text[]
               )
               ON CONFLICT (uuid) DO NOTHING"#,
        )
        .bind(&uuids)
        .bind(&names)
        .bind(&mana_values)
        .bind(&mana_costs)
        .bind(&rarities)
        .bind(&set_codes)
        .bind(&subtypes)
        .bind(&texts)
        .bind(&types)
        .execute(&mut **tx)
        .await?;

        let written = result.rows_affected() as usize;
        if written < count {
            log::warn!(
                "flush skipped {} cards that already existed in the store",
                count - written
            );
        }
        log::trace!("bulk inserted {} cards", written);
        Ok(written)
    }

    fn clear(&mut self) {
        self.staged.clear();
        self.staged_uuids.clear();
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.tx.is_some() {
            return Err(StoreError::TransactionActive);
        }
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::NoTransaction)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.clear();
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}
