//! Audit trail of public queries
//!
//! # Architecture
//!
//! - [`AuditLayer`] intercepts every request, skips health probes and the
//!   log-retrieval endpoint, and hands one entry per remaining request to an
//!   [`AuditSink`]
//! - [`AuditRecorder`] is the store-backed sink (append-only table)
//! - [`AuditLog`] reads back entries newer than a horizon in minutes
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use axum::Router;
//! use tokio_util::task::TaskTracker;
//! use restodir_server::audit::{AuditLayer, AuditRecorder};
//! use restodir_server::geo::HttpGeoResolver;
//! use restodir_server::store::MemoryStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let recorder = Arc::new(AuditRecorder::new(store, "audit_logs"));
//! let resolver = Arc::new(HttpGeoResolver::new("https://ipinfo.io", Duration::from_secs(5))?);
//!
//! let app: Router = Router::new().layer(AuditLayer::new(recorder, resolver, TaskTracker::new()));
//! # Ok(())
//! # }
//! ```

mod client_addr;
mod middleware;
mod models;
mod queries;
mod recorder;


use thiserror::Error;

use crate::store::StoreError;

pub use client_addr::{ClientAddressPolicy, UNKNOWN_ADDRESS};
pub use middleware::{canonical_query, AuditLayer, AuditMiddleware, SkipRules};
pub use models::{effective_minutes, AuditEntry, AUDIT_KEY_FIELD, DEFAULT_HORIZON_MINUTES};
pub use queries::AuditLog;
pub use recorder::{AuditRecorder, AuditSink};

/// Audit pipeline errors
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Failed to write audit entry: {0}")]
    Write(#[source] StoreError),

    #[error("Failed to scan audit logs: {0}")]
    Scan(#[source] StoreError),

    #[error("Failed to decode audit logs: {0}")]
    Decode(#[source] StoreError),

    #[error("Failed to encode audit entry: {0}")]
    Encode(#[source] restodir_common::RecordError),
}
