//! Restodir Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared building blocks for the restaurant directory service.
//!
//! # Overview
//!
//! - **Logging**: `tracing` subscriber setup driven by environment variables
//! - **Records**: the open-schema item model exchanged with the key-value store
//! - **Timestamps**: the fixed-width UTC encoding that sorts lexicographically
//!
//! # Example
//!
//! ```no_run
//! use restodir_common::record::{FieldValue, Record};
//! use restodir_common::timestamp;
//!
//! let mut record = Record::new();
//! record.insert("timestamp".to_string(), FieldValue::from(timestamp::now()));
//! ```

pub mod logging;
pub mod record;
pub mod timestamp;

pub use record::{FieldValue, Record, RecordError};
