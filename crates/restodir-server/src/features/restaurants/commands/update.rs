use serde::{Deserialize, Serialize};

use crate::features::restaurants::{DirectoryError, DirectoryState, Restaurant};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRestaurantResponse {
    pub message: String,
    pub restaurant_id: String,
}

/// Replace the record stored under `restaurant_id`. The id in the path wins
/// over any id in the body.
#[tracing::instrument(skip(state, restaurant), fields(table = %state.table))]
pub async fn handle(
    state: &DirectoryState,
    restaurant_id: String,
    mut restaurant: Restaurant,
) -> Result<UpdateRestaurantResponse, DirectoryError> {
    restaurant.restaurant_id = restaurant_id;
    restaurant.validate()?;

    state.store.put(&state.table, restaurant.to_record()?).await?;
    tracing::info!(restaurant_id = %restaurant.restaurant_id, "Restaurant updated");

    Ok(UpdateRestaurantResponse {
        message: "Restaurant updated successfully".to_string(),
        restaurant_id: restaurant.restaurant_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{BOOTSTRAP_MARKER_ID, DIRECTORY_KEY_FIELD};
    use crate::features::restaurants::queries;
    use crate::store::{MemoryStore, Store};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_path_id_wins() {
        let store = Arc::new(MemoryStore::new());
        store.create_table("restaurants", DIRECTORY_KEY_FIELD).await;
        let state = DirectoryState::new(store.clone(), "restaurants");

        let original = Restaurant {
            restaurant_id: "r1".into(),
            restaurant_name: "Old".into(),
            ..Default::default()
        };
        store
            .put("restaurants", original.to_record().unwrap())
            .await
            .unwrap();

        let body = Restaurant {
            restaurant_id: "someone-else".into(),
            restaurant_name: "New".into(),
            ..Default::default()
        };
        handle(&state, "r1".into(), body).await.unwrap();

        assert_eq!(store.count("restaurants").await.unwrap(), 1);
        let stored = queries::get::handle(&state, "r1").await.unwrap();
        assert_eq!(stored.restaurant_name, "New");
    }

    #[tokio::test]
    async fn test_rejects_marker_id() {
        let store = Arc::new(MemoryStore::new());
        let state = DirectoryState::new(store, "restaurants");
        let body = Restaurant {
            restaurant_name: "Sneaky".into(),
            ..Default::default()
        };

        let err = handle(&state, BOOTSTRAP_MARKER_ID.into(), body).await.unwrap_err();
        assert!(matches!(err, DirectoryError::ReservedId(_)));
    }
}
