//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the webhook guard.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// Origin-trust settings (metadata endpoint, refresh cadence).
    pub trust: TrustConfig,

    /// Downstream forwarding settings.
    pub forward: ForwardConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Origin-trust configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Provider metadata endpoint publishing the hook IP ranges.
    pub meta_url: String,

    /// Interval between background refreshes of the range snapshot.
    pub refresh_interval_secs: u64,

    /// Client-side timeout for a single metadata fetch.
    pub fetch_timeout_secs: u64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            meta_url: "https://api.github.com/meta".to_string(),
            refresh_interval_secs: 15 * 60,
            fetch_timeout_secs: 10,
        }
    }
}

/// Downstream forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// URL the verified webhook request is relayed to.
    pub proxy_url: String,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            proxy_url: "http://localhost:9091".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Overall inbound request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Emit logs as JSON (production) instead of human-readable lines.
    pub log_json: bool,

    /// Whether the Prometheus exposition endpoint is enabled.
    pub metrics_enabled: bool,

    /// Address the metrics endpoint binds to.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_json: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
