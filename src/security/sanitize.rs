//! Input sanitization.
//!
//! # Responsibilities
//! - Strip tag-like, `javascript:` and inline event-handler substrings
//! - Trim surrounding whitespace
//! - Enforce a length ceiling
//!
//! Removal repeats until nothing matches, so stripping one fragment can never
//! splice a new one together (`javajavascript:script:`). Truncation only drops
//! a suffix and cannot create a match, which keeps the transform idempotent.

use serde_json::Value;
use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of a sanitized string, in characters.
pub const MAX_SANITIZED_LEN: usize = 1000;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static JAVASCRIPT_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").unwrap());
static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+\s*=").unwrap());

/// Sanitize a string.
pub fn sanitize(input: &str) -> String {
    let mut out = input.to_string();
    loop {
        let before = out.len();
        for pattern in [&*TAG, &*JAVASCRIPT_URI, &*EVENT_HANDLER] {
            if pattern.is_match(&out) {
                out = pattern.replace_all(&out, "").into_owned();
            }
        }
        if out.len() == before {
            break;
        }
    }

    let trimmed = out.trim();
    if trimmed.chars().count() <= MAX_SANITIZED_LEN {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(MAX_SANITIZED_LEN).collect();
    truncated.trim_end().to_string()
}

/// Sanitize an arbitrary JSON value. Anything but a string becomes `""`.
pub fn sanitize_value(value: &Value) -> String {
    match value {
        Value::String(s) => sanitize(s),
        _ => String::new(),
    }
}

/// Sanitize the top-level string fields of a JSON object body.
///
/// Nested objects and arrays are left as they are.
pub fn sanitize_body(body: &mut Value) {
    if let Value::Object(map) = body {
        for value in map.values_mut() {
            if let Value::String(s) = value {
                *s = sanitize(s);
            }
        }
    }
}
