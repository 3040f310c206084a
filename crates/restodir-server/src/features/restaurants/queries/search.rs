use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bootstrap::is_marker;
use crate::features::restaurants::{hours::is_open_at, DirectoryError, DirectoryState, Restaurant};
use crate::store::Condition;

/// Raw search parameters as received on the query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRestaurantsQuery {
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub is_kosher: Option<String>,
    #[serde(default)]
    pub is_open: Option<String>,
}

/// Validated search filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub cuisine: Option<String>,
    pub is_kosher: Option<bool>,
    pub is_open: Option<bool>,
}

fn parse_flag(name: &'static str, raw: Option<&str>) -> Result<Option<bool>, DirectoryError> {
    match raw {
        None | Some("") => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(_) => Err(DirectoryError::InvalidFlag(name)),
    }
}

impl SearchRestaurantsQuery {
    pub fn validate(&self) -> Result<SearchFilters, DirectoryError> {
        Ok(SearchFilters {
            cuisine: self
                .cuisine
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            is_kosher: parse_flag("is_kosher", self.is_kosher.as_deref())?,
            is_open: parse_flag("is_open", self.is_open.as_deref())?,
        })
    }
}

impl SearchFilters {
    fn matches(&self, restaurant: &Restaurant, now: DateTime<Utc>) -> bool {
        let cuisine_ok = self
            .cuisine
            .as_ref()
            .map_or(true, |c| restaurant.cuisine_type.trim().eq_ignore_ascii_case(c));
        let open_ok = self
            .is_open
            .map_or(true, |wanted| is_open_at(&restaurant.opening_hours, now) == wanted);
        cuisine_ok && open_ok
    }
}

/// Search the directory. An empty result is reported as
/// [`DirectoryError::NoMatches`].
#[tracing::instrument(skip(state, query), fields(table = %state.table))]
pub async fn handle(
    state: &DirectoryState,
    query: SearchRestaurantsQuery,
    now: DateTime<Utc>,
) -> Result<Vec<Restaurant>, DirectoryError> {
    let filters = query.validate()?;

    let conditions: Vec<Condition> = filters
        .is_kosher
        .map(|k| Condition::eq("is_kosher", k))
        .into_iter()
        .collect();

    let rows = state.store.scan(&state.table, &conditions).await?;

    let mut restaurants: Vec<Restaurant> = rows
        .iter()
        .filter(|row| !is_marker(row))
        .filter_map(|row| match Restaurant::from_record(row) {
            Ok(restaurant) => Some(restaurant),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable restaurant record");
                None
            },
        })
        .filter(|restaurant| filters.matches(restaurant, now))
        .collect();

    if restaurants.is_empty() {
        return Err(DirectoryError::NoMatches);
    }

    restaurants.sort_by(|a, b| a.restaurant_name.cmp(&b.restaurant_name));
    tracing::debug!(count = restaurants.len(), "Search completed");
    Ok(restaurants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::DIRECTORY_KEY_FIELD;
    use crate::store::{MemoryStore, Store};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn query(cuisine: Option<&str>, kosher: Option<&str>, open: Option<&str>) -> SearchRestaurantsQuery {
        SearchRestaurantsQuery {
            cuisine: cuisine.map(str::to_string),
            is_kosher: kosher.map(str::to_string),
            is_open: open.map(str::to_string),
        }
    }

    // Monday noon
    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
    }

    async fn state() -> DirectoryState {
        let store = Arc::new(MemoryStore::new());
        store.create_table("restaurants", DIRECTORY_KEY_FIELD).await;

        let entries = [
            ("1", "Shawarma King", "Middle Eastern", true, "10:00-22:00"),
            ("2", "Sushi Go", "Japanese", false, "17:00-23:00"),
            ("3", "Kosher Sushi", "japanese", true, "11:00-15:00"),
        ];
        for (id, name, cuisine, kosher, monday) in entries {
            let mut restaurant = Restaurant {
                restaurant_id: id.into(),
                restaurant_name: name.into(),
                cuisine_type: cuisine.into(),
                is_kosher: kosher,
                ..Default::default()
            };
            restaurant.opening_hours.insert("Monday".into(), monday.into());
            store
                .put("restaurants", restaurant.to_record().unwrap())
                .await
                .unwrap();
        }

        DirectoryState::new(store, "restaurants")
    }

    fn names(restaurants: &[Restaurant]) -> Vec<&str> {
        restaurants.iter().map(|r| r.restaurant_name.as_str()).collect()
    }

    #[test]
    fn test_validate_flags() {
        assert!(matches!(
            query(None, Some("maybe"), None).validate(),
            Err(DirectoryError::InvalidFlag("is_kosher"))
        ));
        assert!(matches!(
            query(None, None, Some("TRUE")).validate(),
            Err(DirectoryError::InvalidFlag("is_open"))
        ));
        let filters = query(Some(" Thai "), Some(""), Some("false")).validate().unwrap();
        assert_eq!(
            filters,
            SearchFilters {
                cuisine: Some("Thai".into()),
                is_kosher: None,
                is_open: Some(false),
            }
        );
    }

    #[tokio::test]
    async fn test_no_filters_returns_everything() {
        let state = state().await;
        let all = handle(&state, query(None, None, None), noon()).await.unwrap();
        assert_eq!(names(&all), vec!["Kosher Sushi", "Shawarma King", "Sushi Go"]);
    }

    #[tokio::test]
    async fn test_cuisine_is_case_insensitive() {
        let state = state().await;
        let found = handle(&state, query(Some("JAPANESE"), None, None), noon())
            .await
            .unwrap();
        assert_eq!(names(&found), vec!["Kosher Sushi", "Sushi Go"]);
    }

    #[tokio::test]
    async fn test_combined_filters() {
        let state = state().await;
        let found = handle(&state, query(Some("japanese"), Some("true"), Some("true")), noon())
            .await
            .unwrap();
        assert_eq!(names(&found), vec!["Kosher Sushi"]);

        let closed = handle(&state, query(None, None, Some("false")), noon())
            .await
            .unwrap();
        assert_eq!(names(&closed), vec!["Sushi Go"]);
    }

    #[tokio::test]
    async fn test_no_matches() {
        let state = state().await;
        let err = handle(&state, query(Some("Thai"), None, None), noon())
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::NoMatches));
    }

    #[tokio::test]
    async fn test_marker_rows_are_hidden() {
        let store = Arc::new(MemoryStore::new());
        let mut marker = restodir_common::Record::new();
        marker.insert(DIRECTORY_KEY_FIELD.into(), crate::bootstrap::BOOTSTRAP_MARKER_ID.into());
        store.put("restaurants", marker).await.unwrap();

        let state = DirectoryState::new(store, "restaurants");
        let err = handle(&state, query(None, None, None), noon()).await.unwrap_err();
        assert!(matches!(err, DirectoryError::NoMatches));
    }
}
