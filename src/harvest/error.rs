//! Shared error type for the harvest stages (catalog walk and detail fetch).

use thiserror::Error;

/// Covers client construction, HTTP, and listing-parse failures.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Failed to create HTTP client: {reason}")]
    ClientBuild { reason: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus {
        status: u16,
        url: String,
        /// Optional context (e.g. "listing page 3") for programmatic use.
        context: Option<String>,
    },

    #[error("Failed to read response body: {source}")]
    BodyRead {
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not parse listing page {page}: {source}")]
    ListingParse {
        page: u32,
        #[source]
        source: serde_json::Error,
    },
}
