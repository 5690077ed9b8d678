//! Acquisition stages: catalog walk over the listing API and resumable
//! per-post detail fetch. Shared client and the page-source seam live here.

mod client;
mod error;

pub mod catalog;
pub mod detail;

pub use client::{SessionClient, SessionClientBuilder};
pub use error::HarvestError;

/// Transport seam between the pipeline and the network.
///
/// [SessionClient] is the production implementation; tests supply in-memory
/// sources with injected failures. A non-success HTTP status is reported as
/// [HarvestError::HttpStatus], not as a body.
pub trait PageSource {
    fn fetch(&mut self, url: &str) -> Result<String, HarvestError>;
}
