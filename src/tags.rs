//! Extraction of `key=value` tags from free text.
//!
//! Values may be quoted and span several whitespace tokens
//! (`ua="Mozilla 5.0 (X11)"`), `-` marks an absent value, and
//! `<decimal>/<integer>` values such as `db=0.013/4` expand into
//! `db_time` and `db_calls`.

use crate::models::{remove_quotes, TagMap, TagValue};
use once_cell::sync::Lazy;
use regex::Regex;

static VALID_KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z]+(?:_[a-z]+)*$").unwrap_or_else(|_| unreachable!()));

static CALLS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9.]+)/([0-9]+)$").unwrap_or_else(|_| unreachable!()));

/// Literal used by emitters for "no value"
pub const ABSENT_VALUE: &str = "-";

enum State {
    Scanning,
    InQuotedValue { key: String, parts: Vec<String> },
}

/// Whether `key` is acceptable as a tag name
pub fn is_valid_key(key: &str) -> bool {
    VALID_KEY_REGEX.is_match(key)
}

/// Tokenize `raw` and collect every well-formed tag.
///
/// Later occurrences of a key overwrite earlier ones. A quoted value still
/// open at the end of the input is dropped.
pub fn parse_tags(raw: &str) -> TagMap {
    let mut tags = TagMap::new();
    let mut state = State::Scanning;

    for token in raw.split_whitespace() {
        state = match state {
            State::InQuotedValue { key, mut parts } => {
                parts.push(token.to_string());
                if token.contains('"') {
                    let joined = parts.join(" ");
                    tags.insert(key, TagValue::Str(remove_quotes(&joined).to_string()));
                    State::Scanning
                } else {
                    State::InQuotedValue { key, parts }
                }
            }
            State::Scanning => scan_token(token, &mut tags),
        };
    }

    tags
}

fn scan_token(token: &str, tags: &mut TagMap) -> State {
    let Some((key, value)) = token.split_once('=') else {
        return State::Scanning;
    };
    if !is_valid_key(key) {
        return State::Scanning;
    }

    if value.contains('"') && !value.ends_with('"') {
        return State::InQuotedValue {
            key: key.to_string(),
            parts: vec![value.to_string()],
        };
    }

    if value == ABSENT_VALUE {
        return State::Scanning;
    }

    if let Some(caps) = CALLS_REGEX.captures(value) {
        // A composite that fails numeric conversion is dropped entirely
        match (caps[1].parse::<f64>(), caps[2].parse::<i64>()) {
            (Ok(total), Ok(calls)) => {
                tags.insert(format!("{}_time", key), TagValue::Float(total));
                tags.insert(format!("{}_calls", key), TagValue::Int(calls));
            }
            _ => tracing::trace!(key, value, "dropping malformed composite tag"),
        }
        return State::Scanning;
    }

    tags.insert(key.to_string(), TagValue::coerce(value));
    State::Scanning
}
