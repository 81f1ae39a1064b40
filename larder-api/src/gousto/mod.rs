//! Gousto upstream integration
//!
//! Everything that talks to or interprets the upstream recipe API lives
//! here: the HTTP client, the payload parser that produces canonical
//! recipe values, and slug discovery over the paginated listing endpoint.
//! The parser is a pure transform; only the client performs I/O.

pub mod client;
pub mod error;
pub mod models;
pub mod parser;
pub mod slugs;

pub use client::GoustoClient;
pub use error::GoustoError;
pub use models::{ImageRef, Ingredient, InstructionStep, Recipe};
pub use parser::parse_recipe;
pub use slugs::{discover_all_slugs, strip_recipes_prefix};
