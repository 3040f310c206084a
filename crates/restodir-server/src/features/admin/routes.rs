use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use restodir_common::Record;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::audit::AuditLog;
use crate::error::{AppError, AppResult};

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub minutes: Option<String>,
}

impl LogsQuery {
    /// Missing or empty means the default window (0). Negative or
    /// non-integer values are rejected.
    pub fn minutes(&self) -> Result<i64, AppError> {
        let raw = match self.minutes.as_deref().map(str::trim) {
            None | Some("") => return Ok(0),
            Some(raw) => raw,
        };
        match raw.parse::<i64>() {
            Ok(minutes) if minutes >= 0 => Ok(minutes),
            _ => Err(AppError::BadRequest(
                "Invalid 'minutes' parameter. It must be a non-negative integer.".to_string(),
            )),
        }
    }
}

/// Routes needing only the admin gate and the audit log
pub fn admin_routes() -> Router<AuditLog> {
    Router::new()
        .route("/validate", get(validate))
        .route("/logs", get(get_logs))
}

async fn validate() -> Json<Value> {
    Json(json!({"message": "Password is valid"}))
}

#[tracing::instrument(skip(audit_log, query))]
async fn get_logs(
    State(audit_log): State<AuditLog>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Record>>> {
    let Query(query) = query?;
    let minutes = query.minutes()?;
    let logs = audit_log.filtered_logs(minutes).await?;
    tracing::debug!(count = logs.len(), minutes, "Fetched audit logs");
    Ok(Json(logs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(raw: Option<&str>) -> LogsQuery {
        LogsQuery {
            minutes: raw.map(str::to_string),
        }
    }

    #[test]
    fn test_minutes_parsing() {
        assert_eq!(query(None).minutes().unwrap(), 0);
        assert_eq!(query(Some("")).minutes().unwrap(), 0);
        assert_eq!(query(Some("0")).minutes().unwrap(), 0);
        assert_eq!(query(Some("60")).minutes().unwrap(), 60);
        assert!(query(Some("-5")).minutes().is_err());
        assert!(query(Some("1.5")).minutes().is_err());
        assert!(query(Some("ten")).minutes().is_err());
    }
}
