//! Error types for the upstream integration

use thiserror::Error;

/// Failures observed while fetching or interpreting upstream data
///
/// `EndOfListing` is a pagination sentinel, not a fault: discovery relies
/// on it to terminate and it must never be folded into `Transport`.
#[derive(Debug, Error)]
pub enum GoustoError {
    /// Network failure, timeout, or non-2xx response from upstream
    #[error("Upstream request failed: {0}")]
    Transport(String),

    /// Listing page returned zero entries; pagination is exhausted
    #[error("No more recipes in upstream listing")]
    EndOfListing,

    /// Upstream payload shape the parser cannot reconcile
    #[error("Malformed upstream payload: {0}")]
    MalformedPayload(String),

    /// Listing entry URL does not carry the expected recipes prefix
    #[error("Invalid recipe url: {0}")]
    InvalidSlug(String),
}

impl GoustoError {
    /// True for failures the route layer should surface as upstream
    /// unavailability (5xx) rather than bad input (4xx)
    pub fn is_transport(&self) -> bool {
        matches!(self, GoustoError::Transport(_) | GoustoError::EndOfListing)
    }
}
