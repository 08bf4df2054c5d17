use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard failures of line parsing.
///
/// Everything else that can go wrong inside a line (bad integers, truncated
/// positional fields, malformed composite values) is swallowed and shows up
/// only as a zero-valued field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ParseError {
    /// The first token matched none of the accepted timestamp layouts
    #[error("failed to parse timestamp '{input}', tried formats: {attempted_formats:?}")]
    TimestampFormat {
        input: String,
        attempted_formats: Vec<String>,
    },
    /// The envelope tag is not the program name an adapter expects
    #[error("tag {tag:?} not supported")]
    UnsupportedTag { tag: String },
}

impl ParseError {
    /// Stable name of the error kind, used as a statistics key
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::TimestampFormat { .. } => "TimestampFormat",
            ParseError::UnsupportedTag { .. } => "UnsupportedTag",
        }
    }

    /// The observed tag when this is a tag mismatch
    pub fn unsupported_tag(&self) -> Option<&str> {
        match self {
            ParseError::UnsupportedTag { tag } => Some(tag),
            _ => None,
        }
    }
}

/// Errors raised while loading a dispatcher configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("configuration error for '{parameter}': {message}")]
    Invalid { parameter: String, message: String },
}
