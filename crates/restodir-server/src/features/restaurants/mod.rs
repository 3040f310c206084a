//! Restaurant directory
//!
//! - `queries/` - search and lookup by id
//! - `commands/` - admin create, update and delete
//! - `routes.rs` - public and admin route tables

pub mod commands;
pub mod hours;
pub mod models;
pub mod queries;
pub mod routes;

use restodir_common::RecordError;
use thiserror::Error;

use crate::error::AppError;
use crate::store::{SharedStore, StoreError};

pub use models::Restaurant;
pub use routes::{admin_restaurant_routes, restaurants_routes};

/// Store handle and table shared by directory handlers
#[derive(Clone)]
pub struct DirectoryState {
    pub store: SharedStore,
    pub table: String,
}

impl DirectoryState {
    pub fn new(store: SharedStore, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Invalid value for '{0}'. Must be 'true' or 'false'.")]
    InvalidFlag(&'static str),

    #[error("restaurant_name is required")]
    NameRequired,

    #[error("Restaurant id '{0}' is reserved")]
    ReservedId(String),

    #[error("Restaurant not found")]
    NotFound,

    #[error("No restaurants match the given criteria.")]
    NoMatches,

    #[error("Failed to encode restaurant: {0}")]
    Encode(#[from] RecordError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::InvalidFlag(_)
            | DirectoryError::NameRequired
            | DirectoryError::ReservedId(_) => AppError::BadRequest(err.to_string()),
            DirectoryError::NotFound | DirectoryError::NoMatches => {
                AppError::NotFound(err.to_string())
            },
            DirectoryError::Encode(e) => AppError::Internal(e.to_string()),
            DirectoryError::Store(e) => AppError::Store(e),
        }
    }
}
