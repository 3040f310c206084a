//! Feature modules implementing the HTTP surface
//!
//! # Features
//!
//! - **restaurants**: public search and admin CRUD over the directory table
//! - **admin**: password gate, password check and audit log retrieval
//! - **health**: readiness and liveness probes
//!
//! Each feature follows the structure:
//! - `commands/` - write operations
//! - `queries/` - read operations
//! - `routes.rs` - HTTP route definitions

pub mod admin;
pub mod health;
pub mod restaurants;

use axum::Router;

use crate::audit::AuditLog;
use crate::store::SharedStore;
use admin::AdminAuthLayer;
use restaurants::DirectoryState;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub store: SharedStore,
    /// Directory table name
    pub restaurants_table: String,
    /// Audit table name
    pub audit_logs_table: String,
    pub admin_password: String,
}

/// Creates the router with all feature routes mounted:
/// - `/readiness`, `/liveness` - health probes
/// - `/restaurants` - public search
/// - `/admin` - gated operator routes
pub fn router(state: FeatureState) -> Router<()> {
    let directory = DirectoryState::new(state.store.clone(), state.restaurants_table);
    let audit_log = AuditLog::new(state.store, state.audit_logs_table);

    let admin = admin::admin_routes()
        .with_state(audit_log)
        .merge(restaurants::admin_restaurant_routes().with_state(directory.clone()))
        .layer(AdminAuthLayer::new(&state.admin_password));

    Router::new()
        .merge(health::health_routes())
        .nest("/restaurants", restaurants::restaurants_routes().with_state(directory))
        .nest("/admin", admin)
}
