use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar value of an extracted `key=value` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Int(i64),
    Float(f64),
    Str(String),
}

/// Tag key -> scalar value, ordered by key
pub type TagMap = BTreeMap<String, TagValue>;

impl TagValue {
    /// Coerce a raw value: integer first, then float, else the string with
    /// surrounding quotes removed
    pub fn coerce(raw: &str) -> TagValue {
        if let Ok(i) = raw.parse::<i64>() {
            TagValue::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            TagValue::Float(f)
        } else {
            TagValue::Str(remove_quotes(raw).to_string())
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TagValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Int(i) => Some(*i as f64),
            TagValue::Float(f) => Some(*f),
            TagValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Int(i) => write!(f, "{}", i),
            TagValue::Float(v) => write!(f, "{}", v),
            TagValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        TagValue::Int(v)
    }
}

impl From<f64> for TagValue {
    fn from(v: f64) -> Self {
        TagValue::Float(v)
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        TagValue::Str(v.to_string())
    }
}

/// Strip one pair of enclosing double quotes, if both are present
pub(crate) fn remove_quotes(raw: &str) -> &str {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

/// Line families understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineFormat {
    /// Generic envelope only
    Syslog,
    Unicorn,
    Nginx,
    HAProxy,
}

impl LineFormat {
    /// Adapter families, in dispatch order
    pub const ADAPTERS: [LineFormat; 3] = [LineFormat::Unicorn, LineFormat::Nginx, LineFormat::HAProxy];

    pub fn name(&self) -> &'static str {
        match self {
            LineFormat::Syslog => "syslog",
            LineFormat::Unicorn => "unicorn",
            LineFormat::Nginx => "nginx",
            LineFormat::HAProxy => "haproxy",
        }
    }

    pub fn from_name(s: &str) -> Option<LineFormat> {
        match s.to_lowercase().as_str() {
            "syslog" => Some(LineFormat::Syslog),
            "unicorn" => Some(LineFormat::Unicorn),
            "nginx" | "ssl_endpoint" => Some(LineFormat::Nginx),
            "haproxy" => Some(LineFormat::HAProxy),
            _ => None,
        }
    }
}

impl fmt::Display for LineFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
