//! Per-request origin verification.
//!
//! # Responsibilities
//! - Extract the candidate source address from forwarding headers or the
//!   transport peer
//! - Test it against the current allowlist snapshot
//! - On a miss, re-fetch once and retest before concluding untrusted
//!
//! # Design Decisions
//! - A miss is treated as a possible staleness event: the provider may have
//!   rotated its ranges since the last periodic refresh. The re-fetch runs
//!   inline with the request, so a genuine miss pays one fetch of latency
//! - If the re-fetch fails the verdict is untrusted, never an error:
//!   inability to confirm trust is not trust
//! - The lazy path mutates the shared allowlist, so `verify` is not pure;
//!   that self-healing side effect is the point

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::http::HeaderMap;
use thiserror::Error;

use crate::observability::metrics;
use crate::verification::allowlist::Allowlist;
use crate::verification::source::RangeSource;

/// Forwarding header consulted before the transport peer address.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Errors surfaced by verification. Fetch failures are absorbed into an
/// untrusted verdict and never appear here.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The candidate source address does not parse as an IP address.
    #[error("unparsable source address {0:?}")]
    BadAddress(String),
}

pub struct OriginVerifier {
    allowlist: Arc<Allowlist>,
    source: Arc<RangeSource>,
}

impl OriginVerifier {
    pub fn new(allowlist: Arc<Allowlist>, source: Arc<RangeSource>) -> Self {
        Self { allowlist, source }
    }

    /// Decide whether a request with the given headers and transport peer
    /// originates from a trusted range.
    pub async fn verify(&self, headers: &HeaderMap, peer: SocketAddr) -> Result<bool, VerifyError> {
        let candidate = extract_candidate(headers, peer)?;

        if self.allowlist.contains(candidate) {
            metrics::record_verification(true);
            return Ok(true);
        }

        // Miss: the snapshot may be stale. Re-fetch once and retest.
        tracing::debug!(candidate = %candidate, "Origin not in snapshot, refreshing");
        match self.source.fetch().await {
            Ok(ranges) => {
                self.allowlist.replace(ranges);
                metrics::record_refresh("on_miss", true);
            }
            Err(e) => {
                tracing::error!(
                    candidate = %candidate,
                    error = %e,
                    "On-miss refresh failed, treating origin as untrusted"
                );
                metrics::record_refresh("on_miss", false);
                metrics::record_verification(false);
                return Ok(false);
            }
        }

        let trusted = self.allowlist.contains(candidate);
        metrics::record_verification(trusted);
        Ok(trusted)
    }
}

/// Extract the candidate source address for one verification call.
///
/// Prefers the first entry of the forwarding header chain (the immediate
/// proxy is trusted to prepend correctly); falls back to the transport
/// peer, which carries no port by construction.
pub fn extract_candidate(headers: &HeaderMap, peer: SocketAddr) -> Result<IpAddr, VerifyError> {
    if let Some(forwarded) = headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        let first = forwarded.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return first
                .parse()
                .map_err(|_| VerifyError::BadAddress(first.to_string()));
        }
    }
    Ok(peer.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer(addr: &str) -> SocketAddr {
        addr.parse().unwrap()
    }

    #[test]
    fn test_extract_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );

        let candidate = extract_candidate(&headers, peer("10.0.0.2:80")).unwrap();
        assert_eq!(candidate, "203.0.113.5".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_extract_falls_back_to_peer_without_port() {
        let headers = HeaderMap::new();

        let candidate = extract_candidate(&headers, peer("203.0.113.5:443")).unwrap();
        assert_eq!(candidate, "203.0.113.5".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_extract_empty_header_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static(""));

        let candidate = extract_candidate(&headers, peer("192.30.252.1:8080")).unwrap();
        assert_eq!(candidate, "192.30.252.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_extract_rejects_garbage_header() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("not-an-ip"));

        let err = extract_candidate(&headers, peer("10.0.0.2:80")).unwrap_err();
        assert!(matches!(err, VerifyError::BadAddress(s) if s == "not-an-ip"));
    }
}
