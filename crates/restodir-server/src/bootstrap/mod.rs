//! First-run population of the directory table
//!
//! ```text
//! count > 0 ──────────────────────────────► AlreadyPopulated
//! count = 0 ─► claim marker ─ lost ───────► ClaimedElsewhere
//!                   │ won
//!                   ├─ recount > 1 ─► release marker ─► AlreadyPopulated
//!                   └─ load seed ─► assign ids ─► insert ─► release marker ─► Seeded
//! ```
//!
//! The marker is a conditional write on a fixed key, so among instances
//! starting concurrently against an empty table at most one seeds it. Any
//! failure after the claim releases the marker so a later start can retry.

use restodir_common::{timestamp, FieldValue, Record};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::store::{Key, SharedStore, StoreError};

pub mod seed;

/// Key field of the directory table
pub const DIRECTORY_KEY_FIELD: &str = "restaurant_id";

/// Key value of the bootstrap marker row
pub const BOOTSTRAP_MARKER_ID: &str = "__bootstrap_marker__";

/// Bootstrap failures. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Failed to count table '{table}': {source}")]
    Count {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to claim bootstrap marker: {0}")]
    Claim(#[source] StoreError),

    #[error("Failed to read seed data from {path}: {source}")]
    SeedRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse seed data from {path}: {source}")]
    SeedParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to insert seed records: {0}")]
    Insert(#[source] StoreError),
}

/// What a bootstrap run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The table already had records, nothing was written
    AlreadyPopulated { count: u64 },
    /// Another instance holds the marker and is seeding
    ClaimedElsewhere,
    /// This instance inserted the seed dataset
    Seeded { inserted: usize },
}

/// Whether a stored row is the bootstrap marker rather than a real record
pub fn is_marker(record: &Record) -> bool {
    record.get(DIRECTORY_KEY_FIELD).and_then(FieldValue::as_str) == Some(BOOTSTRAP_MARKER_ID)
}

fn marker_key() -> Key {
    Key::new(DIRECTORY_KEY_FIELD, BOOTSTRAP_MARKER_ID)
}

fn marker_record() -> Record {
    let mut record = Record::new();
    record.insert(DIRECTORY_KEY_FIELD.to_string(), BOOTSTRAP_MARKER_ID.into());
    record.insert("claimed_at".to_string(), timestamp::now().into());
    record
}

/// Seeds the directory table exactly once per table lifetime
pub struct Bootstrapper {
    store: SharedStore,
    table: String,
    seed_path: PathBuf,
}

impl Bootstrapper {
    pub fn new(store: SharedStore, table: impl Into<String>, seed_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            table: table.into(),
            seed_path: seed_path.into(),
        }
    }

    /// True iff the table holds at least one row
    pub async fn is_populated(&self) -> Result<bool, BootstrapError> {
        Ok(self.count().await? > 0)
    }

    async fn count(&self) -> Result<u64, BootstrapError> {
        self.store
            .count(&self.table)
            .await
            .map_err(|source| BootstrapError::Count {
                table: self.table.clone(),
                source,
            })
    }

    #[instrument(skip(self), fields(table = %self.table, seed = %self.seed_path.display()))]
    pub async fn run(&self) -> Result<BootstrapOutcome, BootstrapError> {
        let count = self.count().await?;
        if count > 0 {
            info!(count, "Table is already populated, skipping initialization");
            return Ok(BootstrapOutcome::AlreadyPopulated { count });
        }

        let claimed = self
            .store
            .put_if_absent(&self.table, &marker_key(), marker_record())
            .await
            .map_err(BootstrapError::Claim)?;
        if !claimed {
            info!("Bootstrap marker held by another instance, skipping initialization");
            return Ok(BootstrapOutcome::ClaimedElsewhere);
        }

        // An instance that finished between our count and our claim
        let count = match self.count().await {
            Ok(count) => count,
            Err(e) => {
                self.release_marker().await;
                return Err(e);
            },
        };
        if count > 1 {
            self.release_marker().await;
            info!(count = count - 1, "Table was populated concurrently, skipping initialization");
            return Ok(BootstrapOutcome::AlreadyPopulated { count: count - 1 });
        }

        info!("Table is empty, initializing with seed data");
        let result = self.seed().await;
        self.release_marker().await;

        let inserted = result?;
        info!(inserted, "Populated table with seed data");
        Ok(BootstrapOutcome::Seeded { inserted })
    }

    async fn seed(&self) -> Result<usize, BootstrapError> {
        let mut records = seed::load_seed(&self.seed_path).await?;
        let generated = seed::assign_ids(&mut records, DIRECTORY_KEY_FIELD);
        info!(records = records.len(), generated, "Loaded seed data");

        self.store
            .put_many(&self.table, records)
            .await
            .map_err(BootstrapError::Insert)
    }

    async fn release_marker(&self) {
        if let Err(e) = self.store.delete(&self.table, &marker_key()).await {
            warn!(error = %e, "Failed to release bootstrap marker");
        }
    }
}
