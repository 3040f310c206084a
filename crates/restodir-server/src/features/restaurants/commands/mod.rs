pub mod create;
pub mod delete;
pub mod update;

pub use create::CreateRestaurantResponse;
pub use delete::DeleteRestaurantResponse;
pub use update::UpdateRestaurantResponse;
