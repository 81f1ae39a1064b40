//! HTTP API endpoints

pub mod auth;
pub mod health;
pub mod recipes;

pub use auth::{auth_routes, AuthUser};
pub use health::health_routes;
pub use recipes::recipe_routes;
