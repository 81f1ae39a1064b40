//! Database access for the recipe catalogue
//!
//! Schema creation lives in `larder-common`; these modules hold the
//! operations the service performs against it.

pub mod bad_slugs;
pub mod ingredients;
pub mod recipes;
