use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use super::commands::{
    self, CreateRestaurantResponse, DeleteRestaurantResponse, UpdateRestaurantResponse,
};
use super::queries::{self, SearchRestaurantsQuery};
use super::{DirectoryState, Restaurant};
use crate::error::AppResult;

/// Public routes, mounted under `/restaurants`
pub fn restaurants_routes() -> Router<DirectoryState> {
    Router::new().route("/search", get(search_restaurants))
}

/// Admin routes, mounted under `/admin` behind the admin gate
pub fn admin_restaurant_routes() -> Router<DirectoryState> {
    Router::new()
        .route("/restaurants", post(create_restaurant))
        .route(
            "/restaurants/:id",
            get(get_restaurant)
                .put(update_restaurant)
                .delete(delete_restaurant),
        )
}

#[tracing::instrument(skip(state, query))]
async fn search_restaurants(
    State(state): State<DirectoryState>,
    query: Result<Query<SearchRestaurantsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Restaurant>>> {
    let Query(query) = query?;
    let restaurants = queries::search::handle(&state, query, Utc::now()).await?;
    Ok(Json(restaurants))
}

async fn get_restaurant(
    State(state): State<DirectoryState>,
    Path(id): Path<String>,
) -> AppResult<Json<Restaurant>> {
    Ok(Json(queries::get::handle(&state, &id).await?))
}

async fn create_restaurant(
    State(state): State<DirectoryState>,
    payload: Result<Json<Restaurant>, JsonRejection>,
) -> AppResult<Json<CreateRestaurantResponse>> {
    let Json(restaurant) = payload?;
    Ok(Json(commands::create::handle(&state, restaurant).await?))
}

async fn update_restaurant(
    State(state): State<DirectoryState>,
    Path(id): Path<String>,
    payload: Result<Json<Restaurant>, JsonRejection>,
) -> AppResult<Json<UpdateRestaurantResponse>> {
    let Json(restaurant) = payload?;
    Ok(Json(commands::update::handle(&state, id, restaurant).await?))
}

async fn delete_restaurant(
    State(state): State<DirectoryState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteRestaurantResponse>> {
    Ok(Json(commands::delete::handle(&state, &id).await?))
}
