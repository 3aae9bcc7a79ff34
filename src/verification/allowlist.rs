//! Shared allowlist of trusted source ranges.
//!
//! # Responsibilities
//! - Hold the current snapshot of provider-published CIDR ranges
//! - Atomic wholesale replacement from either refresh path
//! - Parallel membership tests on the request path
//!
//! # Design Decisions
//! - Reader/writer lock: many concurrent `contains` calls, exclusive
//!   access only for the instant of the snapshot swap
//! - The lock is never held across I/O; fetches complete before `replace`
//! - Snapshots are replaced wholesale, never edited in place

use std::net::IpAddr;
use std::sync::RwLock;

use ipnet::IpNet;

/// The current set of trusted network ranges.
///
/// Constructed once at startup and shared via `Arc` with the background
/// refresher and the origin verifier. Both submit replacement snapshots
/// through [`replace`](Allowlist::replace); neither holds the snapshot.
pub struct Allowlist {
    ranges: RwLock<Vec<IpNet>>,
}

impl Allowlist {
    /// Create an empty allowlist. Nothing is trusted until the first
    /// successful `replace`.
    pub fn new() -> Self {
        Self {
            ranges: RwLock::new(Vec::new()),
        }
    }

    /// Atomically swap in a new snapshot.
    ///
    /// Concurrent calls serialize on the write lock; last writer wins.
    pub fn replace(&self, next: Vec<IpNet>) {
        let mut guard = self.ranges.write().unwrap_or_else(|e| e.into_inner());
        *guard = next;
    }

    /// Test whether any trusted range contains the candidate address.
    ///
    /// Returns false for an empty snapshot. Ranges from one provider are
    /// assumed non-overlapping, so the first hit decides.
    pub fn contains(&self, addr: IpAddr) -> bool {
        let guard = self.ranges.read().unwrap_or_else(|e| e.into_inner());
        guard.iter().any(|range| range.contains(&addr))
    }

    /// Number of ranges in the current snapshot.
    pub fn len(&self) -> usize {
        let guard = self.ranges.read().unwrap_or_else(|e| e.into_inner());
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of the current snapshot, for logging and tests.
    pub fn snapshot(&self) -> Vec<IpNet> {
        let guard = self.ranges.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }
}

impl Default for Allowlist {
    fn default() -> Self {
        Self::new()
    }
}
