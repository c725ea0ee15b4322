pub mod dto;
pub mod list;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use dto::{ImagePicked, SortKey, SortOrder};
pub use list::{ListDataSource, MealList, MealSnapshot, RefreshOutcome};
pub use repo::MealRepo;
pub use repo_types::Meal;
