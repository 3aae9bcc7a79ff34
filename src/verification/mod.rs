//! Origin-trust subsystem.
//!
//! # Data Flow
//! ```text
//! Provider metadata endpoint
//!     → source.rs (bounded-timeout fetch, all-or-nothing CIDR parse)
//!     → allowlist.rs (atomic snapshot replace)
//!     ← verifier.rs (per-request containment test, lazy refresh on miss)
//!     ← refresher.rs (periodic replace, independent of traffic)
//! ```
//!
//! # Design Decisions
//! - The allowlist is constructed once and shared via Arc; both writers
//!   (refresher and verifier) go through its synchronized replace
//! - Fetch failures never evict the last good snapshot (stale beats empty)
//! - A miss that cannot be re-validated is untrusted, never an error

pub mod allowlist;
pub mod refresher;
pub mod source;
pub mod verifier;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::TrustConfig;
use allowlist::Allowlist;
use source::{FetchError, RangeSource};

/// Shared handles of the origin-trust subsystem.
#[derive(Clone)]
pub struct TrustState {
    pub allowlist: Arc<Allowlist>,
    pub source: Arc<RangeSource>,
}

/// Errors that can occur while bringing the trust subsystem up.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The configured metadata URL does not parse.
    #[error("invalid metadata URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build range source client: {0}")]
    Client(#[from] reqwest::Error),

    /// The initial snapshot could not be fetched. Fatal: the service must
    /// not report ready without a populated allowlist.
    #[error("initial range fetch failed: {0}")]
    InitialFetch(#[from] FetchError),
}

/// Construct the range source and allowlist, and load the initial snapshot.
///
/// This is the only place a fetch failure is fatal; once the first snapshot
/// is in place, later failures degrade to serving stale trust data.
pub async fn bootstrap(config: &TrustConfig) -> Result<TrustState, BootstrapError> {
    let endpoint = Url::parse(&config.meta_url).map_err(|source| BootstrapError::InvalidUrl {
        url: config.meta_url.clone(),
        source,
    })?;

    let source = Arc::new(RangeSource::new(
        endpoint,
        Duration::from_secs(config.fetch_timeout_secs),
    )?);
    let allowlist = Arc::new(Allowlist::new());

    let ranges = source.fetch().await?;
    allowlist.replace(ranges);

    Ok(TrustState { allowlist, source })
}
