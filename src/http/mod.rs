//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, CORS, request ID, tracing, limits)
//!     → middleware/rate_limit.rs (admit client, else 429)
//!     → handlers.rs (sanitize, store, list)
//!     → error.rs (map failures to JSON error bodies)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use request::{ClientId, UNKNOWN_CLIENT};
pub use server::{AppState, HttpServer};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";
