//! Open-schema records
//!
//! Items read from and written to the key-value store are modelled as a map
//! from field name to a small closed set of value kinds. Nothing here knows
//! about restaurants or audit entries: typed structs convert through
//! [`to_record`] and [`from_record`], and readers that must tolerate schema
//! drift (the audit log) keep the raw [`Record`].

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A store item: field name to value
pub type Record = BTreeMap<String, FieldValue>;

/// Errors converting between typed values and records
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Value is not an object: {0}")]
    NotAnObject(String),

    #[error("Unsupported value for field '{field}': {reason}")]
    Unsupported { field: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Name of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Number(_) => "number",
            FieldValue::String(_) => "string",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

/// Convert any serializable struct into a record.
///
/// The value must serialize to a JSON object.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, RecordError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => {
            Ok(serde_json::from_value(serde_json::Value::Object(map))?)
        },
        other => Err(RecordError::NotAnObject(other.to_string())),
    }
}

/// Decode a record into a typed struct
pub fn from_record<T: DeserializeOwned>(record: &Record) -> Result<T, RecordError> {
    let value = serde_json::to_value(record)?;
    Ok(serde_json::from_value(value)?)
}

/// Read a string field, if present and a string
pub fn get_str<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(FieldValue::as_str)
}
