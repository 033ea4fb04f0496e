//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (client, window, id) rather than formatted strings
//! - Request ID from the HTTP layer appears in the request span
//! - Metrics are cheap and become no-ops when no exporter is installed

pub mod logging;
pub mod metrics;
