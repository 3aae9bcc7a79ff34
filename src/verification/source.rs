//! Range source client.
//!
//! # Responsibilities
//! - Fetch the provider metadata document over HTTP with a bounded timeout
//! - Parse the `hooks` field into network ranges, all-or-nothing
//!
//! # Design Decisions
//! - One unparsable CIDR rejects the entire fetch: a truncated or malformed
//!   list must never be partially adopted
//! - No internal retries; retry policy belongs to the caller (the periodic
//!   refresher just waits for the next tick, the lazy path gives up)

use ipnet::IpNet;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors from a single metadata fetch. Each failure mode is distinct so
/// the refresh boundaries can log what actually went wrong.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network or timeout error reaching the metadata endpoint.
    #[error("transport error reaching range source: {0}")]
    Transport(#[source] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("range source returned status {0}")]
    Status(StatusCode),

    /// The response body could not be read.
    #[error("failed reading range source body: {0}")]
    Body(#[source] reqwest::Error),

    /// The body is not the expected JSON shape.
    #[error("malformed range source body: {0}")]
    Json(#[from] serde_json::Error),

    /// One of the published entries is not valid CIDR notation.
    #[error("invalid CIDR entry {entry:?} in range source: {source}")]
    Cidr {
        entry: String,
        source: ipnet::AddrParseError,
    },
}

/// Relevant slice of the provider metadata document. The provider publishes
/// several other range categories (git, pages, importer, ...) which are
/// ignored here.
#[derive(Debug, Deserialize)]
struct MetaResponse {
    hooks: Vec<String>,
}

/// Client for the provider metadata endpoint.
pub struct RangeSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl RangeSource {
    /// Build a client with the given per-request timeout.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// Fetch and parse the current set of trusted ranges.
    pub async fn fetch(&self) -> Result<Vec<IpNet>, FetchError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await.map_err(FetchError::Body)?;
        parse_ranges(&body)
    }

    /// The endpoint this client fetches from.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Parse a metadata document into trusted ranges.
///
/// Rejects the whole document if any single entry fails to parse.
pub fn parse_ranges(body: &[u8]) -> Result<Vec<IpNet>, FetchError> {
    let meta: MetaResponse = serde_json::from_slice(body)?;

    meta.hooks
        .into_iter()
        .map(|entry| {
            entry
                .parse::<IpNet>()
                .map_err(|source| FetchError::Cidr { entry, source })
        })
        .collect()
}
