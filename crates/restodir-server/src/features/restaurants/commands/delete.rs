use serde::{Deserialize, Serialize};

use crate::bootstrap::{BOOTSTRAP_MARKER_ID, DIRECTORY_KEY_FIELD};
use crate::features::restaurants::{DirectoryError, DirectoryState};
use crate::store::Key;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRestaurantResponse {
    pub message: String,
}

#[tracing::instrument(skip(state), fields(table = %state.table))]
pub async fn handle(
    state: &DirectoryState,
    restaurant_id: &str,
) -> Result<DeleteRestaurantResponse, DirectoryError> {
    if restaurant_id == BOOTSTRAP_MARKER_ID {
        return Err(DirectoryError::NotFound);
    }

    let removed = state
        .store
        .delete(&state.table, &Key::new(DIRECTORY_KEY_FIELD, restaurant_id))
        .await?;
    if !removed {
        return Err(DirectoryError::NotFound);
    }

    tracing::info!(restaurant_id = %restaurant_id, "Restaurant removed");
    Ok(DeleteRestaurantResponse {
        message: "Restaurant removed successfully".to_string(),
    })
}
