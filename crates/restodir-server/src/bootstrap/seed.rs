//! Seed dataset loading

use restodir_common::{FieldValue, Record};
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

use super::BootstrapError;

/// Read a JSON array of directory records
pub async fn load_seed(path: &Path) -> Result<Vec<Record>, BootstrapError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BootstrapError::SeedRead {
            path: path.display().to_string(),
            source,
        })?;

    parse_seed(&raw).map_err(|source| BootstrapError::SeedParse {
        path: path.display().to_string(),
        source,
    })
}

pub fn parse_seed(raw: &str) -> Result<Vec<Record>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Give every record without a usable key a fresh UUID. Returns how many
/// ids were generated.
pub fn assign_ids(records: &mut [Record], key_field: &str) -> usize {
    let mut generated = 0;
    for record in records.iter_mut() {
        match record.get(key_field) {
            Some(FieldValue::String(id)) if !id.trim().is_empty() => continue,
            None | Some(FieldValue::Null) | Some(FieldValue::String(_)) => {},
            Some(other) => {
                warn!(field = %key_field, kind = other.kind(), "Replacing non-string record id");
            },
        }
        record.insert(
            key_field.to_string(),
            FieldValue::String(Uuid::new_v4().to_string()),
        );
        generated += 1;
    }
    generated
}
