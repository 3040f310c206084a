//! Time-windowed audit retrieval

use chrono::{DateTime, Utc};
use restodir_common::{record::get_str, timestamp, Record};
use tracing::{debug, instrument};

use super::models::effective_minutes;
use super::AuditError;
use crate::store::{Condition, SharedStore, StoreError};

/// Read side of the audit table
#[derive(Clone)]
pub struct AuditLog {
    store: SharedStore,
    table: String,
}

impl AuditLog {
    pub fn new(store: SharedStore, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    /// Entries recorded in the last `minutes` minutes, newest first.
    ///
    /// `minutes <= 0` selects the default 24 hour window.
    pub async fn filtered_logs(&self, minutes: i64) -> Result<Vec<Record>, AuditError> {
        self.filtered_logs_at(Utc::now(), minutes).await
    }

    /// Same as [`AuditLog::filtered_logs`] with an explicit reference instant.
    ///
    /// Entries are returned as open records so that rows written with a
    /// different set of fields still come back intact.
    #[instrument(skip(self, now), fields(table = %self.table))]
    pub async fn filtered_logs_at(
        &self,
        now: DateTime<Utc>,
        minutes: i64,
    ) -> Result<Vec<Record>, AuditError> {
        let since = timestamp::horizon(now, effective_minutes(minutes));
        debug!(since = %since, "Fetching audit logs");

        let mut rows = self
            .store
            .scan(&self.table, &[Condition::ge("timestamp", since.as_str())])
            .await
            .map_err(|e| match e {
                StoreError::Decode { .. } | StoreError::Encode(_) => AuditError::Decode(e),
                other => AuditError::Scan(other),
            })?;

        rows.sort_by(|a, b| get_str(b, "timestamp").cmp(&get_str(a, "timestamp")));

        debug!(count = rows.len(), since = %since, "Fetched audit logs");
        Ok(rows)
    }
}
