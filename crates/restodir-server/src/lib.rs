//! Restodir Server Library
//!
//! HTTP service for a small restaurant directory.
//!
//! # Overview
//!
//! - **Directory**: public search plus admin-gated CRUD over a key-value table
//! - **Audit trail**: every non-probe request is recorded with the client's
//!   address and resolved country, and can be queried by time window
//! - **Bootstrap**: an empty directory is seeded once from a JSON file, even
//!   when several replicas start together
//! - **Store**: DynamoDB in production, an in-memory backend for local runs
//!   and tests
//!
//! # Request pipeline
//!
//! ```text
//! TraceLayer -> CorsLayer -> AuditLayer -> router
//!                                           |- /readiness, /liveness
//!                                           |- /restaurants/search
//!                                           `- /admin/* (AdminAuthLayer)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use restodir_server::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     server::run(config).await
//! }
//! ```

pub mod audit;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod features;
pub mod geo;
pub mod middleware;
pub mod server;
pub mod store;

pub use error::{AppError, AppResult};
