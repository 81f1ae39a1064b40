//! # Larder Common Library
//!
//! Shared code for the Larder recipe service:
//! - Error type used across crates
//! - Configuration loading (TOML file + environment + defaults)
//! - SQLite schema creation and pool initialization
//! - Authentication primitives (password hashing, bearer tokens)

pub mod auth;
pub mod config;
pub mod db;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
