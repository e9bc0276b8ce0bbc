//! Redaction helpers for keeping credentials out of logs.
//!
//! Provider configs carry passwords and API keys. Anything derived from a
//! config or from a provider error goes through here before it is logged.

use crate::schema::Block;
use serde_json::Value;
use std::borrow::Cow;

pub const REDACTED: &str = "[REDACTED]";

/// Keys whose values are scrubbed from free-form text.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "passwd",
    "api_key",
    "apikey",
    "token",
    "secret",
];

/// Replace the values of sensitive attributes in a config object.
///
/// Unset or null attributes stay as they are so logs still show what was missing.
pub fn redact_config(block: &Block, config: &Value) -> Value {
    let mut redacted = config.clone();
    if let Value::Object(object) = &mut redacted {
        for name in block.sensitive_attributes() {
            if let Some(value) = object.get_mut(name) {
                if !value.is_null() {
                    *value = Value::String(REDACTED.to_string());
                }
            }
        }
    }
    redacted
}

/// Redact `key=value` and JSON `"key":"value"` pairs for known sensitive keys.
///
/// # Examples
/// ```
/// use provider_core::redact::redact_secrets;
///
/// let output = redact_secrets(r#"{"user":"ops","password":"hunter2"}"#);
/// assert!(!output.contains("hunter2"));
/// assert!(output.contains("[REDACTED]"));
/// ```
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let mut result = Cow::Borrowed(input);

    for key in SENSITIVE_KEYS {
        for pattern in [format!("{key}="), format!("\"{key}\":\""), format!("\"{key}\": \"")] {
            if result.contains(pattern.as_str()) {
                let redacted = redact_pattern_value(&result, &pattern);
                result = Cow::Owned(redacted);
            }
        }
    }

    result
}

/// Redact the value following a pattern.
///
/// JSON patterns end in an opening quote and the value runs to the matching
/// unescaped quote. `key=value` pairs end at whitespace, `&` or a quote.
fn redact_pattern_value(input: &str, pattern: &str) -> String {
    let quoted = pattern.ends_with('"');
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;

    while let Some(pos) = remaining.find(pattern) {
        result.push_str(&remaining[..pos]);
        result.push_str(pattern);
        result.push_str(REDACTED);

        let after_pattern = &remaining[pos + pattern.len()..];
        let end = if quoted {
            closing_quote(after_pattern)
        } else {
            after_pattern
                .find(|c: char| c.is_whitespace() || c == '&' || c == '"' || c == '\'')
                .unwrap_or(after_pattern.len())
        };

        remaining = &after_pattern[end..];
    }

    result.push_str(remaining);
    result
}

/// Byte offset of the first quote not preceded by a backslash escape.
fn closing_quote(value: &str) -> usize {
    let mut escaped = false;
    for (idx, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return idx,
            _ => {}
        }
    }
    value.len()
}
