//! Configuration loading and resolution
//!
//! Resolution priority follows the usual order:
//! 1. Explicit path passed on the command line (highest priority)
//! 2. `LARDER_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/larder/config.toml` on Linux)
//! 4. Compiled defaults (fallback)
//!
//! Individual settings may additionally be overridden through
//! `LARDER_DATABASE` and `LARDER_BIND` after the file is loaded.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Upstream (Gousto) API settings
///
/// The endpoints and page limit are explicit configuration rather than
/// compiled-in globals so tests can point the client at a stub server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Listing endpoint; `limit` and `offset` query parameters are appended
    pub listing_endpoint: String,
    /// Per-recipe endpoint; the slug is appended as a path segment
    pub recipe_endpoint: String,
    /// Entries per listing page
    pub page_limit: u32,
    /// Timeout applied to every upstream request, in seconds
    pub request_timeout_secs: u64,
    /// Number of listing pages fetched concurrently during discovery
    pub discovery_concurrency: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            listing_endpoint: "https://production-api.gousto.co.uk/cmsreadbroker/v1/recipes"
                .to_string(),
            recipe_endpoint: "https://production-api.gousto.co.uk/cmsreadbroker/v1/recipe"
                .to_string(),
            page_limit: 20,
            request_timeout_secs: 20,
            discovery_concurrency: 5,
        }
    }
}

impl UpstreamConfig {
    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// SQLite database file path
    pub database_path: PathBuf,
    /// Lifetime of issued bearer tokens, in minutes
    pub token_ttl_minutes: i64,
    /// Bounded worker count for batch ingestion
    pub ingest_workers: usize,
    /// Upstream API settings
    pub upstream: UpstreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
            database_path: default_database_path(),
            token_ttl_minutes: 30,
            ingest_workers: 2,
            upstream: UpstreamConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration, resolving the file location by priority order
    pub fn load(cli_path: Option<&Path>) -> Result<Config> {
        let mut config = match resolve_config_file(cli_path) {
            Some(path) => {
                info!("Loading configuration: {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?
            }
            None => {
                info!("No configuration file found, using defaults");
                Config::default()
            }
        };

        // Environment overrides
        if let Ok(db) = std::env::var("LARDER_DATABASE") {
            config.database_path = PathBuf::from(db);
        }
        if let Ok(bind) = std::env::var("LARDER_BIND") {
            config.bind_address = bind;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate settings that would otherwise fail far from their source
    fn validate(&self) -> Result<()> {
        if self.upstream.page_limit == 0 {
            return Err(Error::Config("upstream.page_limit must be > 0".to_string()));
        }
        if self.upstream.discovery_concurrency == 0 {
            return Err(Error::Config(
                "upstream.discovery_concurrency must be > 0".to_string(),
            ));
        }
        if self.ingest_workers == 0 {
            return Err(Error::Config("ingest_workers must be > 0".to_string()));
        }
        if self.token_ttl_minutes <= 0 {
            return Err(Error::Config("token_ttl_minutes must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Locate the configuration file, or None to use compiled defaults
fn resolve_config_file(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("LARDER_CONFIG") {
        return Some(PathBuf::from(path));
    }

    // Priority 3: Platform config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("larder").join("config.toml")) {
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("larder").join("larder.db"))
        .unwrap_or_else(|| PathBuf::from("./larder.db"))
}
