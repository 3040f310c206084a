pub mod get;
pub mod search;

pub use search::{SearchFilters, SearchRestaurantsQuery};
