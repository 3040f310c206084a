//! Audit entry persistence

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::models::AuditEntry;
use super::AuditError;
use crate::store::SharedStore;

/// Destination for audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Build an entry stamped with the current time and persist it once
    async fn record(
        &self,
        query: &str,
        client_address: &str,
        country: &str,
    ) -> Result<AuditEntry, AuditError>;
}

/// Writes audit entries into the audit table
#[derive(Clone)]
pub struct AuditRecorder {
    store: SharedStore,
    table: String,
}

impl AuditRecorder {
    pub fn new(store: SharedStore, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl AuditSink for AuditRecorder {
    #[instrument(skip(self), fields(table = %self.table))]
    async fn record(
        &self,
        query: &str,
        client_address: &str,
        country: &str,
    ) -> Result<AuditEntry, AuditError> {
        let entry = AuditEntry::new(query, client_address, country);
        let record = entry.to_record().map_err(AuditError::Encode)?;

        self.store
            .put(&self.table, record)
            .await
            .map_err(AuditError::Write)?;

        debug!(log_id = %entry.log_id, "Created audit log entry");
        Ok(entry)
    }
}
