//! Abuse-control subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming guestbook request:
//!     → rate_limit.rs (admit or deny per client identifier)
//!     → handler reads the body
//!     → sanitize.rs (bound, escape and filter message text)
//!     → message log
//! ```
//!
//! # Design Decisions
//! - Both checks return ordinary values; the HTTP layer maps them to status codes
//! - Fail closed: empty sanitized text is a rejection, never an empty message
//! - No trust in client input

pub mod rate_limit;
pub mod sanitize;

pub use rate_limit::{RateLimitExceeded, RateLimiter};
pub use sanitize::{Sanitizer, MAX_MESSAGE_CHARS};
