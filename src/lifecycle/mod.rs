//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging/metrics → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → trigger → server stops accepting and drains → sweeper exits
//!     Server error before Ctrl+C → process exits with that error
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - One broadcast channel reaches every long-running task

pub mod shutdown;

pub use shutdown::{supervise, Shutdown};
