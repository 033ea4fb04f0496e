//! Bounded in-memory message log.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin recorded for messages posted through the HTTP API.
pub const WEB_ORIGIN: &str = "web";

/// A stored guestbook message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    /// Sanitized message text.
    pub msg: String,
    pub from: String,
    pub timestamp: DateTime<Utc>,
}

struct LogState {
    messages: VecDeque<Message>,
    next_id: u64,
}

/// Append-only FIFO log; once `capacity` is exceeded the oldest message is dropped.
pub struct MessageLog {
    state: Mutex<LogState>,
    capacity: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LogState {
                messages: VecDeque::with_capacity(capacity.min(1024)),
                next_id: 1,
            }),
            capacity,
        }
    }

    // A panic while holding the lock cannot leave the log half-updated.
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store already-sanitized text and return the stored message.
    pub fn append(&self, text: String) -> Message {
        let mut state = self.lock();
        let message = Message {
            id: state.next_id,
            msg: text,
            from: WEB_ORIGIN.to_string(),
            timestamp: Utc::now(),
        };
        state.next_id += 1;
        state.messages.push_back(message.clone());
        while state.messages.len() > self.capacity {
            state.messages.pop_front();
        }
        message
    }

    /// All retained messages, oldest first.
    pub fn list(&self) -> Vec<Message> {
        self.lock().messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(1000)
    }
}
