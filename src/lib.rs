//! Guestbook message-submission service.
//!
//! Clients post short text messages that are kept in a bounded in-memory log
//! and listed back. Two abuse controls sit in front of storage: a per-client
//! sliding-window rate limiter and a text sanitizer.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod store;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::{RateLimitExceeded, RateLimiter, Sanitizer};
