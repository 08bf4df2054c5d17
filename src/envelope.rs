//! The syslog envelope shared by every line family:
//!
//! ```text
//! 2014-03-12T10:00:00.123456+00:00 web1 nginx.info[3120]: method=GET status=200 ...
//! ^ timestamp                      ^ host ^ tag.severity[pid]
//! ```

use crate::error::ParseError;
use crate::models::{TagMap, TagValue};
use crate::tags::parse_tags;
use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// High-precision layout: microseconds and a UTC offset
pub const TIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";
/// Fallback layout: whole seconds, or a fraction of any length
pub const TIME_LAYOUT_WITHOUT_MICRO: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

static PID_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.*?)\[(\d*)\]").unwrap_or_else(|_| unreachable!()));

static EMPTY_TAGS: TagMap = TagMap::new();

/// Base record: one raw line and its envelope.
///
/// A record consumes raw text exactly once. After a successful parse, further
/// calls to [`SyslogLine::parse`] report success and leave the record as it
/// is, even when given different text.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyslogLine {
    pub raw: String,
    pub time: Option<DateTime<FixedOffset>>,
    pub host: String,
    pub tag: String,
    pub severity: Option<String>,
    /// Process id from `tag[pid]`, zero when absent
    pub pid: i64,
    #[serde(skip)]
    fields: Vec<String>,
    #[serde(skip)]
    parsed: bool,
    #[serde(skip)]
    tags: OnceLock<TagMap>,
}

impl SyslogLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a fresh record from `raw`
    pub fn from_line(raw: &str) -> Result<Self, ParseError> {
        let mut line = Self::new();
        line.parse(raw)?;
        Ok(line)
    }

    /// Consume `raw`. Lines with fewer than three tokens succeed with an
    /// empty envelope; an unparseable first token is the only failure.
    pub fn parse(&mut self, raw: &str) -> Result<(), ParseError> {
        self.consume(raw).map(|_| ())
    }

    /// Like [`SyslogLine::parse`], but reports whether this call actually
    /// consumed `raw` (false when the record was already parsed)
    pub(crate) fn consume(&mut self, raw: &str) -> Result<bool, ParseError> {
        if self.parsed {
            return Ok(false);
        }

        let fields: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
        if fields.len() >= 3 {
            let time = parse_time(&fields[0])?;
            let (tag, severity, pid) = parse_tag(&fields[2]);
            self.time = Some(time);
            self.host = fields[1].clone();
            self.tag = tag;
            self.severity = severity;
            self.pid = pid;
        }

        self.raw = raw.to_string();
        self.fields = fields;
        self.parsed = true;
        Ok(true)
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    /// Whitespace tokens of the raw line
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Tags found anywhere in the line, computed on first access.
    ///
    /// The memo is a `OnceLock`, so first access from several threads is
    /// safe. Before a successful parse this is always empty and nothing is
    /// cached.
    pub fn tags(&self) -> &TagMap {
        if !self.parsed {
            return &EMPTY_TAGS;
        }
        self.tags.get_or_init(|| parse_tags(&self.raw))
    }

    /// Single tag lookup
    pub fn tag_value(&self, key: &str) -> Option<&TagValue> {
        self.tags().get(key)
    }

    /// Timestamp in UTC
    pub fn time_utc(&self) -> Option<DateTime<chrono::Utc>> {
        self.time.map(|t| t.with_timezone(&chrono::Utc))
    }
}

/// Parse a timestamp with the high-precision layout, then the whole-second one
pub fn parse_time(raw: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    DateTime::parse_from_str(raw, TIME_LAYOUT)
        .or_else(|_| DateTime::parse_from_str(raw, TIME_LAYOUT_WITHOUT_MICRO))
        .map_err(|_| ParseError::TimestampFormat {
            input: raw.to_string(),
            attempted_formats: vec![TIME_LAYOUT.to_string(), TIME_LAYOUT_WITHOUT_MICRO.to_string()],
        })
}

/// Render a timestamp in the high-precision layout
pub fn format_time(time: &DateTime<FixedOffset>) -> String {
    time.format(TIME_LAYOUT).to_string()
}

/// Split `tag.severity[pid]:` into its parts
fn parse_tag(raw: &str) -> (String, Option<String>, i64) {
    let (tag_and_severity, pid) = split_tag_and_pid(raw);
    let (tag, severity) = split_tag_and_severity(tag_and_severity);
    (tag.to_string(), severity.map(str::to_string), pid)
}

fn split_tag_and_pid(raw: &str) -> (&str, i64) {
    match PID_TAG_REGEX.captures(raw) {
        Some(caps) => {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let pid = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
            (name, pid)
        }
        None => (raw.strip_suffix(':').unwrap_or(raw), 0),
    }
}

fn split_tag_and_severity(raw: &str) -> (&str, Option<&str>) {
    let mut parts = raw.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(tag), Some(severity), None) => (tag, Some(severity)),
        _ => (raw, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use quickcheck_macros::quickcheck;

    const LINE: &str = "2014-03-12T10:00:00.123456+01:00 web1 unicorn.info[3120]: rid=1 status=200";

    #[test]
    fn test_envelope_fields() {
        let line = SyslogLine::from_line(LINE).unwrap();
        let time = line.time.unwrap();
        assert_eq!(time.offset().local_minus_utc(), 3600);
        assert_eq!(time.nanosecond(), 123_456_000);
        assert_eq!(line.host, "web1");
        assert_eq!(line.tag, "unicorn");
        assert_eq!(line.severity.as_deref(), Some("info"));
        assert_eq!(line.pid, 3120);
        assert_eq!(line.fields().len(), 5);
        assert_eq!(line.raw, LINE);
    }

    #[test]
    fn test_whole_second_timestamp() {
        let line = SyslogLine::from_line("2014-03-12T10:00:00+00:00 db2 postgres: ready").unwrap();
        let expected = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2014, 3, 12, 10, 0, 0).unwrap();
        assert_eq!(line.time, Some(expected));
        assert_eq!(line.tag, "postgres");
        assert_eq!(line.severity, None);
        assert_eq!(line.pid, 0);
    }

    #[test]
    fn test_fraction_of_any_length() {
        let millis = SyslogLine::from_line("2014-03-12T10:00:00.123+00:00 web1 nginx: status=200").unwrap();
        assert_eq!(millis.time.unwrap().nanosecond(), 123_000_000);
        assert_eq!(millis.tag, "nginx");

        let nanos = SyslogLine::from_line("2014-03-12T10:00:00.123456789-02:00 web1 nginx: status=200").unwrap();
        let time = nanos.time.unwrap();
        assert_eq!(time.nanosecond(), 123_456_789);
        assert_eq!(time.offset().local_minus_utc(), -7200);
    }

    #[test]
    fn test_bad_timestamp_is_fatal() {
        let err = SyslogLine::from_line("Mar 12 10:00:00 web1 nginx: hi").unwrap_err();
        match err {
            ParseError::TimestampFormat { input, attempted_formats } => {
                assert_eq!(input, "Mar");
                assert_eq!(attempted_formats.len(), 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_failed_parse_leaves_record_unparsed() {
        let mut line = SyslogLine::new();
        assert!(line.parse("garbage host tag").is_err());
        assert!(!line.is_parsed());
        assert!(line.raw.is_empty());
        line.parse(LINE).unwrap();
        assert_eq!(line.tag, "unicorn");
    }

    #[test]
    fn test_short_line_is_permissive() {
        for raw in ["", "one", "2014-03-12T10:00:00+00:00 host"] {
            let line = SyslogLine::from_line(raw).unwrap();
            assert!(line.time.is_none());
            assert!(line.host.is_empty());
            assert!(line.tag.is_empty());
            assert!(line.is_parsed());
        }
    }

    #[test]
    fn test_second_parse_is_noop() {
        let mut line = SyslogLine::from_line(LINE).unwrap();
        let before = serde_json::to_value(&line).unwrap();
        line.parse("2020-01-01T00:00:00+00:00 other haproxy[1]: x=1").unwrap();
        assert_eq!(serde_json::to_value(&line).unwrap(), before);
        assert_eq!(line.fields().len(), 5);
        assert!(line.tag_value("x").is_none());
    }

    #[test]
    fn test_tag_variants() {
        assert_eq!(parse_tag("nginx:"), ("nginx".to_string(), None, 0));
        assert_eq!(parse_tag("nginx.err:"), ("nginx".to_string(), Some("err".to_string()), 0));
        assert_eq!(parse_tag("haproxy[42]:"), ("haproxy".to_string(), None, 42));
        assert_eq!(parse_tag("app[]:"), ("app".to_string(), None, 0));
        assert_eq!(parse_tag("a.b.c"), ("a.b.c".to_string(), None, 0));
        assert_eq!(parse_tag("kernel"), ("kernel".to_string(), None, 0));
        assert_eq!(parse_tag("big[99999999999]"), ("big".to_string(), None, 99_999_999_999));
        assert_eq!(parse_tag("huge[99999999999999999999]"), ("huge".to_string(), None, 0));
    }

    #[test]
    fn test_tags_are_lazy_and_cached() {
        let line = SyslogLine::from_line(LINE).unwrap();
        let first = line.tags() as *const TagMap;
        assert_eq!(line.tag_value("status"), Some(&TagValue::Int(200)));
        assert_eq!(line.tags() as *const TagMap, first);
    }

    #[test]
    fn test_tags_before_parse_are_not_cached() {
        let mut line = SyslogLine::new();
        assert!(line.tags().is_empty());
        line.parse(LINE).unwrap();
        assert_eq!(line.tag_value("rid"), Some(&TagValue::Int(1)));
    }

    #[quickcheck]
    fn prop_timestamp_round_trip(micros: i64, offset_minutes: i16) -> bool {
        // keep within chrono's representable range
        let micros = micros.rem_euclid(4_000_000_000_000_000);
        let offset = FixedOffset::east_opt((offset_minutes as i32 % (24 * 60)) * 60).unwrap();
        let time = match chrono::Utc.timestamp_micros(micros).single() {
            Some(t) => t.with_timezone(&offset),
            None => return true,
        };
        parse_time(&format_time(&time)) == Ok(time)
    }

    #[quickcheck]
    fn prop_short_lines_never_fail(a: String, b: String) -> bool {
        let raw = format!("{} {}", a.replace(char::is_whitespace, ""), b.replace(char::is_whitespace, ""));
        SyslogLine::from_line(&raw).is_ok()
    }
}
