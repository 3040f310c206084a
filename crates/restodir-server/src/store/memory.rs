//! In-memory store
//!
//! Backs `STORE_BACKEND=memory` and the test suite. Each table may declare a
//! key field; puts replace the item with the same key, tables without one
//! behave as append-only logs. Individual calls are serialized by a single
//! `RwLock`, matching the per-call atomicity of the real backend.

use async_trait::async_trait;
use restodir_common::record::Record;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

use super::{Condition, Key, Store, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Table {
    key_field: Option<String>,
    rows: Vec<Record>,
}

impl Table {
    fn position(&self, key: &Key) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.get(&key.field).and_then(|v| v.as_str()) == Some(key.value.as_str())
        })
    }

    fn key_of(&self, record: &Record) -> Option<Key> {
        let field = self.key_field.as_ref()?;
        let value = record.get(field)?.as_str()?;
        Some(Key::new(field.clone(), value))
    }
}

#[derive(Debug, Default)]
struct Faults {
    puts: HashSet<String>,
    scans: HashSet<String>,
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    faults: RwLock<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table and its key field
    pub async fn create_table(&self, name: &str, key_field: &str) {
        let mut tables = self.tables.write().await;
        let table = tables.entry(name.to_string()).or_default();
        table.key_field = Some(key_field.to_string());
    }

    /// Make every `put` on `table` fail until cleared
    pub async fn fail_puts(&self, table: &str, failing: bool) {
        let mut faults = self.faults.write().await;
        if failing {
            faults.puts.insert(table.to_string());
        } else {
            faults.puts.remove(table);
        }
    }

    /// Make every `scan` on `table` fail until cleared
    pub async fn fail_scans(&self, table: &str, failing: bool) {
        let mut faults = self.faults.write().await;
        if failing {
            faults.scans.insert(table.to_string());
        } else {
            faults.scans.remove(table);
        }
    }

    /// Snapshot of every item in a table, in insertion order
    pub async fn dump(&self, table: &str) -> Vec<Record> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, table: &str, record: Record) -> StoreResult<()> {
        if self.faults.read().await.puts.contains(table) {
            return Err(StoreError::backend(table, "injected put failure"));
        }

        let mut tables = self.tables.write().await;
        let entry = tables.entry(table.to_string()).or_default();

        match entry.key_of(&record).and_then(|key| entry.position(&key)) {
            Some(index) => entry.rows[index] = record,
            None => entry.rows.push(record),
        }

        debug!(table = %table, rows = entry.rows.len(), "Stored item");
        Ok(())
    }

    async fn put_if_absent(&self, table: &str, key: &Key, record: Record) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let entry = tables.entry(table.to_string()).or_default();

        if entry.position(key).is_some() {
            return Ok(false);
        }

        entry.rows.push(record);
        Ok(true)
    }

    async fn get(&self, table: &str, key: &Key) -> StoreResult<Option<Record>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|t| t.position(key).map(|i| t.rows[i].clone())))
    }

    async fn delete(&self, table: &str, key: &Key) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(entry) = tables.get_mut(table) else {
            return Ok(false);
        };
        match entry.position(key) {
            Some(index) => {
                entry.rows.remove(index);
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn scan(&self, table: &str, conditions: &[Condition]) -> StoreResult<Vec<Record>> {
        for condition in conditions {
            condition.validate()?;
        }
        if self.faults.read().await.scans.contains(table) {
            return Err(StoreError::backend(table, "injected scan failure"));
        }

        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|row| conditions.iter().all(|c| c.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, table: &str) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).map(|t| t.rows.len() as u64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restodir_common::record::FieldValue;

    fn item(id: &str, name: &str) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), FieldValue::from(id));
        record.insert("name".to_string(), FieldValue::from(name));
        record
    }

    #[tokio::test]
    async fn test_put_replaces_same_key() {
        let store = MemoryStore::new();
        store.create_table("things", "id").await;

        store.put("things", item("1", "first")).await.unwrap();
        store.put("things", item("1", "second")).await.unwrap();
        store.put("things", item("2", "other")).await.unwrap();

        assert_eq!(store.count("things").await.unwrap(), 2);
        let got = store.get("things", &Key::new("id", "1")).await.unwrap().unwrap();
        assert_eq!(got["name"], FieldValue::from("second"));
    }

    #[tokio::test]
    async fn test_keyless_table_appends() {
        let store = MemoryStore::new();
        store.put("log", item("1", "a")).await.unwrap();
        store.put("log", item("1", "a")).await.unwrap();
        assert_eq!(store.count("log").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_put_if_absent() {
        let store = MemoryStore::new();
        let key = Key::new("id", "marker");

        assert!(store.put_if_absent("t", &key, item("marker", "x")).await.unwrap());
        assert!(!store.put_if_absent("t", &key, item("marker", "y")).await.unwrap());
        assert_eq!(store.count("t").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.create_table("t", "id").await;
        store.put("t", item("1", "a")).await.unwrap();

        assert!(store.delete("t", &Key::new("id", "1")).await.unwrap());
        assert!(!store.delete("t", &Key::new("id", "1")).await.unwrap());
        assert!(!store.delete("missing", &Key::new("id", "1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_filters_and_faults() {
        let store = MemoryStore::new();
        store.put("t", item("1", "alpha")).await.unwrap();
        store.put("t", item("2", "beta")).await.unwrap();

        let rows = store.scan("t", &[Condition::ge("name", "b")]).await.unwrap();
        assert_eq!(rows.len(), 1);

        store.fail_scans("t", true).await;
        assert!(store.scan("t", &[]).await.is_err());
        store.fail_scans("t", false).await;
        assert_eq!(store.scan("t", &[]).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_scan_rejects_invalid_filter() {
        let store = MemoryStore::new();
        let err = store.scan("t", &[Condition::ge("flag", true)]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn test_injected_put_failure() {
        let store = MemoryStore::new();
        store.fail_puts("t", true).await;
        assert!(store.put("t", item("1", "a")).await.is_err());
        assert_eq!(store.count("t").await.unwrap(), 0);
    }
}
