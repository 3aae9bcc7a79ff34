//! Periodic background refresh of the trusted range snapshot.
//!
//! # Responsibilities
//! - Re-fetch the provider ranges on a fixed interval
//! - Push successful results into the allowlist
//! - Keep the previous snapshot on any failure

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::verification::allowlist::Allowlist;
use crate::verification::source::RangeSource;

pub struct Refresher {
    allowlist: Arc<Allowlist>,
    source: Arc<RangeSource>,
    interval: Duration,
}

impl Refresher {
    pub fn new(allowlist: Arc<Allowlist>, source: Arc<RangeSource>, interval: Duration) -> Self {
        Self {
            allowlist,
            source,
            interval,
        }
    }

    /// Run the refresh loop until the shutdown signal fires.
    ///
    /// Runs independently of request traffic; a failed refresh never
    /// shortens the next interval.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            endpoint = %self.source.endpoint(),
            "Range refresher starting"
        );

        let mut ticker = time::interval(self.interval);
        // The first tick fires immediately; bootstrap already fetched the
        // initial snapshot, so consume it before entering the loop.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Range refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn refresh(&self) {
        match self.source.fetch().await {
            Ok(ranges) => {
                tracing::info!(ranges = ranges.len(), "Refreshed trusted range snapshot");
                self.allowlist.replace(ranges);
                metrics::record_refresh("periodic", true);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    ranges = self.allowlist.len(),
                    "Range refresh failed, keeping previous snapshot"
                );
                metrics::record_refresh("periodic", false);
            }
        }
    }
}
