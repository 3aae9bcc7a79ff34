//! Post-verification dispatch.
//!
//! # Data Flow
//! ```text
//! verified request
//!     → classify.rs (payload repository URL → destination kind)
//!     → forward.rs (verbatim single-host relay for the shared kind)
//!     → downstream response returned unmodified
//! ```
//!
//! Only ever entered after the origin verifier has said yes; an untrusted
//! request is rejected before classification.

pub mod classify;
pub mod forward;

pub use classify::{ClassifyError, Destination, SourceClassifier};
pub use forward::{ForwardError, Forwarder};
