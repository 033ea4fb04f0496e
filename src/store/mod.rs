//! Message storage.
//!
//! Holds sanitized messages in memory only; nothing survives a restart.

pub mod messages;

pub use messages::{Message, MessageLog};
