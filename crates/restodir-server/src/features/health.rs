use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

/// Liveness and readiness probes. Neither touches the store.
pub fn health_routes() -> Router {
    Router::new()
        .route("/readiness", get(healthy))
        .route("/liveness", get(healthy))
}

async fn healthy() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}
