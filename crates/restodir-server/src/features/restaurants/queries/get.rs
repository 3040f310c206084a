use crate::bootstrap::{is_marker, DIRECTORY_KEY_FIELD};
use crate::features::restaurants::{DirectoryError, DirectoryState, Restaurant};
use crate::store::{Key, StoreError};

#[tracing::instrument(skip(state), fields(table = %state.table))]
pub async fn handle(state: &DirectoryState, restaurant_id: &str) -> Result<Restaurant, DirectoryError> {
    let record = state
        .store
        .get(&state.table, &Key::new(DIRECTORY_KEY_FIELD, restaurant_id))
        .await?
        .filter(|record| !is_marker(record))
        .ok_or(DirectoryError::NotFound)?;

    Restaurant::from_record(&record)
        .map_err(|e| DirectoryError::Store(StoreError::decode(&state.table, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::BOOTSTRAP_MARKER_ID;
    use crate::store::{MemoryStore, Store};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_existing_and_missing() {
        let store = Arc::new(MemoryStore::new());
        store.create_table("restaurants", DIRECTORY_KEY_FIELD).await;
        let restaurant = Restaurant {
            restaurant_id: "r1".into(),
            restaurant_name: "Bagel Shop".into(),
            ..Default::default()
        };
        store
            .put("restaurants", restaurant.to_record().unwrap())
            .await
            .unwrap();
        let state = DirectoryState::new(store, "restaurants");

        assert_eq!(handle(&state, "r1").await.unwrap(), restaurant);
        assert!(matches!(
            handle(&state, "nope").await,
            Err(DirectoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_marker_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        store.create_table("restaurants", DIRECTORY_KEY_FIELD).await;
        let mut marker = restodir_common::Record::new();
        marker.insert(DIRECTORY_KEY_FIELD.into(), BOOTSTRAP_MARKER_ID.into());
        store.put("restaurants", marker).await.unwrap();
        let state = DirectoryState::new(store, "restaurants");

        assert!(matches!(
            handle(&state, BOOTSTRAP_MARKER_ID).await,
            Err(DirectoryError::NotFound)
        ));
    }
}
