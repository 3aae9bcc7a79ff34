//! Destination classification for verified webhooks.
//!
//! Maps the webhook payload's declared repository source onto one of a
//! small fixed set of destination kinds. Effectively static today: every
//! hosted repository lands on the shared downstream proxy.

use serde::Deserialize;
use thiserror::Error;

/// Simplified view of the provider webhook payload; everything except the
/// repository block is ignored.
#[derive(Debug, Deserialize)]
pub struct HookPayload {
    pub repository: Repository,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub git_url: String,
    pub clone_url: String,
}

/// Where a verified webhook should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The shared downstream proxy.
    Shared,
    /// A dedicated per-tenant deployment. Recognized but not yet routable.
    Dedicated,
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The payload names no repository source to classify.
    #[error("payload declares no repository source")]
    MissingSource,
}

/// Classifies repository sources into destinations.
pub struct SourceClassifier;

impl SourceClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Decide the destination kind for the given repository git URL.
    pub fn destination_for(&self, git_url: &str) -> Result<Destination, ClassifyError> {
        if git_url.trim().is_empty() {
            return Err(ClassifyError::MissingSource);
        }
        Ok(Destination::Shared)
    }
}

impl Default for SourceClassifier {
    fn default() -> Self {
        Self::new()
    }
}
