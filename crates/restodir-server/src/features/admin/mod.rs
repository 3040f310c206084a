//! Operator surface: password check, audit log retrieval and directory
//! maintenance. Everything here sits behind [`AdminAuthLayer`].

pub mod auth;
pub mod routes;

pub use auth::AdminAuthLayer;
pub use routes::admin_routes;
