//! Create restaurant command
//!
//! The caller may supply `restaurant_id`; when it is absent or blank a UUID
//! is generated. Writing an existing id replaces that record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::restaurants::{DirectoryError, DirectoryState, Restaurant};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRestaurantResponse {
    pub message: String,
    pub restaurant_id: String,
}

#[tracing::instrument(skip(state, restaurant), fields(table = %state.table))]
pub async fn handle(
    state: &DirectoryState,
    mut restaurant: Restaurant,
) -> Result<CreateRestaurantResponse, DirectoryError> {
    restaurant.validate()?;

    if restaurant.restaurant_id.trim().is_empty() {
        restaurant.restaurant_id = Uuid::new_v4().to_string();
    }

    state.store.put(&state.table, restaurant.to_record()?).await?;
    tracing::info!(restaurant_id = %restaurant.restaurant_id, "Restaurant added");

    Ok(CreateRestaurantResponse {
        message: "Restaurant added successfully".to_string(),
        restaurant_id: restaurant.restaurant_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::DIRECTORY_KEY_FIELD;
    use crate::features::restaurants::queries;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    async fn state() -> DirectoryState {
        let store = Arc::new(MemoryStore::new());
        store.create_table("restaurants", DIRECTORY_KEY_FIELD).await;
        DirectoryState::new(store, "restaurants")
    }

    #[tokio::test]
    async fn test_generates_id_when_absent() {
        let state = state().await;
        let response = handle(
            &state,
            Restaurant {
                restaurant_name: "Hummus Bar".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(Uuid::parse_str(&response.restaurant_id).is_ok());
        let stored = queries::get::handle(&state, &response.restaurant_id).await.unwrap();
        assert_eq!(stored.restaurant_name, "Hummus Bar");
    }

    #[tokio::test]
    async fn test_keeps_caller_id() {
        let state = state().await;
        let response = handle(
            &state,
            Restaurant {
                restaurant_id: "custom-1".into(),
                restaurant_name: "Deli".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(response.restaurant_id, "custom-1");
    }

    #[tokio::test]
    async fn test_rejects_missing_name() {
        let state = state().await;
        let err = handle(&state, Restaurant::default()).await.unwrap_err();
        assert!(matches!(err, DirectoryError::NameRequired));
    }
}
