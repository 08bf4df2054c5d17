use crate::envelope::SyslogLine;
use crate::models::LineFormat;
use crate::parsers::LineParser;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Program name of the application server
pub const UNICORN_TAG: &str = "unicorn";

static UUID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9\-]{36})").unwrap_or_else(|_| unreachable!()));

/// Application server line, optionally carrying a request id
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnicornLine {
    #[serde(flatten)]
    pub line: SyslogLine,
    pub uuid: Option<String>,
}

impl LineParser for UnicornLine {
    const FORMAT: LineFormat = LineFormat::Unicorn;

    fn envelope(&self) -> &SyslogLine {
        &self.line
    }

    fn envelope_mut(&mut self) -> &mut SyslogLine {
        &mut self.line
    }

    fn supports_tag(tag: &str) -> bool {
        tag == UNICORN_TAG
    }

    fn parse_body(&mut self) {
        if self.line.fields().len() >= 4 {
            self.uuid = UUID_REGEX
                .captures(&self.line.raw)
                .map(|caps| caps[1].to_string());
        }
    }
}
