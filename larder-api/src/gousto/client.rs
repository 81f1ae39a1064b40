//! Gousto API client
//!
//! Thin HTTP wrapper over the upstream endpoints. Surfaces transport and
//! pagination conditions as typed errors and performs no retries or
//! business logic; retry policy belongs to the caller.

use larder_common::config::UpstreamConfig;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::gousto::error::GoustoError;

/// User-Agent header sent with every upstream request
const USER_AGENT: &str = concat!("larder/", env!("CARGO_PKG_VERSION"));

/// Client for the upstream recipe API
///
/// Every request carries the configured timeout; a timeout surfaces as
/// `GoustoError::Transport` like any other network failure.
#[derive(Debug, Clone)]
pub struct GoustoClient {
    http: Client,
    listing_endpoint: String,
    recipe_endpoint: String,
    page_limit: u32,
}

impl GoustoClient {
    /// Create a client from upstream configuration
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            http: Client::builder()
                .timeout(config.request_timeout())
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            listing_endpoint: config.listing_endpoint.clone(),
            recipe_endpoint: config.recipe_endpoint.clone(),
            page_limit: config.page_limit,
        }
    }

    /// Fetch one listing page and return the raw entry URLs
    ///
    /// A page with zero entries signals pagination exhaustion and returns
    /// `GoustoError::EndOfListing`.
    pub async fn fetch_listing_page(&self, page: u32) -> Result<Vec<String>, GoustoError> {
        let offset = page * self.page_limit;
        let url = format!(
            "{}?limit={}&offset={}",
            self.listing_endpoint, self.page_limit, offset
        );
        debug!(page, offset, "Fetching listing page");

        let body = self.get_json(&url).await?;

        let entries = body
            .pointer("/data/entries")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                GoustoError::MalformedPayload("listing response missing data.entries".to_string())
            })?;

        if entries.is_empty() {
            return Err(GoustoError::EndOfListing);
        }

        entries
            .iter()
            .map(|entry| {
                entry
                    .get("url")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or_else(|| {
                        GoustoError::MalformedPayload(
                            "listing entry missing url field".to_string(),
                        )
                    })
            })
            .collect()
    }

    /// Fetch the raw payload for a single recipe slug
    pub async fn fetch_recipe(&self, slug: &str) -> Result<Value, GoustoError> {
        let url = format!("{}/{}", self.recipe_endpoint, slug);
        debug!(slug = %slug, "Fetching recipe");
        self.get_json(&url).await
    }

    async fn get_json(&self, url: &str) -> Result<Value, GoustoError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GoustoError::Transport(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GoustoError::Transport(format!(
                "HTTP {} from {}",
                status.as_u16(),
                url
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GoustoError::Transport(format!("Invalid JSON from {}: {}", url, e)))
    }
}
