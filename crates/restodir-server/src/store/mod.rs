//! Key-value store adapter
//!
//! The service treats its backing store as an opaque durable map of tables.
//! Every component talks to it through the object-safe [`Store`] trait and
//! holds it as `Arc<dyn Store>`, so the DynamoDB backend used in production
//! and the in-memory backend used by tests and local runs are
//! interchangeable.

use async_trait::async_trait;
use restodir_common::record::{FieldValue, Record, RecordError};
use std::sync::Arc;
use thiserror::Error;

pub mod dynamo;
pub mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Shared store handle
pub type SharedStore = Arc<dyn Store>;

/// Store operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend rejected the call or could not be reached
    #[error("Store backend error on table '{table}': {message}")]
    Backend { table: String, message: String },

    /// The filter could not be expressed against the backend
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// A stored item could not be decoded into a record
    #[error("Failed to decode item from table '{table}': {message}")]
    Decode { table: String, message: String },

    /// A record could not be encoded for the backend
    #[error("Failed to encode record: {0}")]
    Encode(#[from] RecordError),
}

impl StoreError {
    pub fn backend(table: &str, message: impl std::fmt::Display) -> Self {
        StoreError::Backend {
            table: table.to_string(),
            message: message.to_string(),
        }
    }

    pub fn decode(table: &str, message: impl std::fmt::Display) -> Self {
        StoreError::Decode {
            table: table.to_string(),
            message: message.to_string(),
        }
    }
}

/// Primary key of an item: a single string attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub field: String,
    pub value: String,
}

impl Key {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Comparison operator for scan filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ge,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ge => ">=",
        }
    }
}

/// A single `field <op> value` scan predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: FieldValue,
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            operator: Operator::Eq,
            value: value.into(),
        }
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            operator: Operator::Ge,
            value: value.into(),
        }
    }

    /// Ordered comparisons are only defined for strings and numbers
    pub fn validate(&self) -> StoreResult<()> {
        if self.field.is_empty() {
            return Err(StoreError::InvalidFilter("field name cannot be empty".to_string()));
        }
        match (self.operator, &self.value) {
            (Operator::Eq, _) => Ok(()),
            (Operator::Ge, FieldValue::String(_) | FieldValue::Number(_)) => Ok(()),
            (Operator::Ge, other) => Err(StoreError::InvalidFilter(format!(
                "'{}' cannot be compared with {} against a {} value",
                self.field,
                self.operator.as_str(),
                other.kind()
            ))),
        }
    }

    /// Evaluate the predicate against a record. Missing fields never match.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(&self.field) else {
            return false;
        };
        match self.operator {
            Operator::Eq => actual == &self.value,
            Operator::Ge => match (actual, &self.value) {
                (FieldValue::String(a), FieldValue::String(b)) => a.as_str() >= b.as_str(),
                (FieldValue::Number(a), FieldValue::Number(b)) => a >= b,
                _ => false,
            },
        }
    }
}

/// Durable table-oriented key-value store
#[async_trait]
pub trait Store: Send + Sync {
    /// Write an item, replacing any item with the same key
    async fn put(&self, table: &str, record: Record) -> StoreResult<()>;

    /// Write an item only if no item with `key` exists.
    ///
    /// Returns `false` when the key was already taken.
    async fn put_if_absent(&self, table: &str, key: &Key, record: Record) -> StoreResult<bool>;

    /// Fetch an item by key
    async fn get(&self, table: &str, key: &Key) -> StoreResult<Option<Record>>;

    /// Remove an item by key. Returns whether an item was removed.
    async fn delete(&self, table: &str, key: &Key) -> StoreResult<bool>;

    /// Full scan returning items that satisfy every condition
    async fn scan(&self, table: &str, conditions: &[Condition]) -> StoreResult<Vec<Record>>;

    /// Number of items in the table
    async fn count(&self, table: &str) -> StoreResult<u64>;

    /// Write several items. Stops at the first failure.
    async fn put_many(&self, table: &str, records: Vec<Record>) -> StoreResult<usize> {
        let mut written = 0;
        for record in records {
            self.put(table, record).await?;
            written += 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_ge_compares_strings_lexicographically() {
        let condition = Condition::ge("timestamp", "2024-01-01T10:00:00Z");

        let newer = record(&[("timestamp", "2024-01-01T10:00:01Z".into())]);
        let equal = record(&[("timestamp", "2024-01-01T10:00:00Z".into())]);
        let older = record(&[("timestamp", "2024-01-01T09:59:59Z".into())]);

        assert!(condition.matches(&newer));
        assert!(condition.matches(&equal));
        assert!(!condition.matches(&older));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let condition = Condition::eq("cuisine_type", "Thai");
        assert!(!condition.matches(&Record::new()));
    }

    #[test]
    fn test_eq_on_bool() {
        let condition = Condition::eq("is_kosher", true);
        assert!(condition.matches(&record(&[("is_kosher", FieldValue::Bool(true))])));
        assert!(!condition.matches(&record(&[("is_kosher", FieldValue::Bool(false))])));
    }

    #[test]
    fn test_validate_rejects_ordered_bool() {
        assert!(Condition::ge("is_kosher", true).validate().is_err());
        assert!(Condition::ge("", "x").validate().is_err());
        assert!(Condition::ge("timestamp", "x").validate().is_ok());
        assert!(Condition::eq("flag", true).validate().is_ok());
    }
}
