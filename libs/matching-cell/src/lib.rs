pub mod catalog;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use catalog::{CatalogError, MatchingCatalog};
pub use models::*;
pub use services::MatchingService;
