//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Bootstrap trust snapshot → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Refresher exits → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, including the initial fetch
//! - The listener starts last (traffic only once the snapshot is loaded)

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
