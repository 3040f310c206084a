//! Audit data models

use chrono::{DateTime, Utc};
use restodir_common::{record, timestamp, Record, RecordError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Horizon used when the caller asks for a non-positive window (24 hours)
pub const DEFAULT_HORIZON_MINUTES: i64 = 1440;

/// Key field of the audit table
pub const AUDIT_KEY_FIELD: &str = "log_id";

/// Audit log entry as written to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub log_id: String,
    /// Sortable UTC timestamp, see [`restodir_common::timestamp`]
    pub timestamp: String,
    /// Canonical form-encoded query string
    pub query: String,
    #[serde(rename = "ip")]
    pub client_address: String,
    pub country: String,
}

impl AuditEntry {
    pub fn new(
        query: impl Into<String>,
        client_address: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self::at(Utc::now(), query, client_address, country)
    }

    pub fn at(
        instant: DateTime<Utc>,
        query: impl Into<String>,
        client_address: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            log_id: Uuid::new_v4().to_string(),
            timestamp: timestamp::format(instant),
            query: query.into(),
            client_address: client_address.into(),
            country: country.into(),
        }
    }

    pub fn to_record(&self) -> Result<Record, RecordError> {
        record::to_record(self)
    }
}

/// Normalize a requested window: anything non-positive means the default
pub fn effective_minutes(minutes: i64) -> i64 {
    if minutes > 0 {
        minutes
    } else {
        DEFAULT_HORIZON_MINUTES
    }
}
