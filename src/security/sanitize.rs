//! Message text sanitization.
//!
//! # Responsibilities
//! - Reject absent, non-text and empty input
//! - Bound input length, escape markup, filter to an allow-set, trim
//!
//! # Design Decisions
//! - Truncation happens before escaping, so the cap bounds raw input
//! - Escaping happens before filtering so entity references survive it
//! - The allow-set is an explicit character membership test, not a regex

use serde_json::Value;

/// Maximum number of characters kept from the raw input.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Punctuation kept by the filter. `/`, `:` and `;` are needed by escaped
/// entities and closing tags; `<` and `>` are never allowed.
const ALLOWED_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', '@', '#', '$', '%', '^', '&', '*', '(', ')', '_', '+', '-', '=', '/',
    ':', ';',
];

/// Converts untrusted input into text that is safe to store.
///
/// An empty result means the input was invalid; callers must reject it
/// rather than store an empty message.
#[derive(Debug, Clone, Copy)]
pub struct Sanitizer {
    max_chars: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            max_chars: MAX_MESSAGE_CHARS,
        }
    }
}

impl Sanitizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Sanitize text input.
    pub fn sanitize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let escaped = escape_markup(text.chars().take(self.max_chars));
        let filtered: String = escaped.chars().filter(|&c| is_allowed(c)).collect();

        filtered.trim().to_string()
    }

    /// Sanitize an arbitrary JSON value. Anything but a string yields `""`.
    pub fn sanitize_value(&self, value: Option<&Value>) -> String {
        match value {
            Some(Value::String(text)) => self.sanitize(text),
            _ => String::new(),
        }
    }
}

fn escape_markup(chars: impl Iterator<Item = char>) -> String {
    let mut out = String::new();
    for c in chars {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(&c)
}
