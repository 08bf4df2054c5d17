use crate::envelope::SyslogLine;
use crate::error::ParseError;
use crate::models::{LineFormat, TagMap};
use crate::parsers::{HAProxyLine, LineParser, NginxLine, UnicornLine};
use serde::Serialize;

/// A parsed line of any supported family
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ParsedLine {
    Syslog(SyslogLine),
    Unicorn(UnicornLine),
    Nginx(NginxLine),
    HAProxy(HAProxyLine),
}

impl ParsedLine {
    pub fn format(&self) -> LineFormat {
        match self {
            ParsedLine::Syslog(_) => LineFormat::Syslog,
            ParsedLine::Unicorn(_) => UnicornLine::FORMAT,
            ParsedLine::Nginx(_) => NginxLine::FORMAT,
            ParsedLine::HAProxy(_) => HAProxyLine::FORMAT,
        }
    }

    pub fn envelope(&self) -> &SyslogLine {
        match self {
            ParsedLine::Syslog(line) => line,
            ParsedLine::Unicorn(line) => line.envelope(),
            ParsedLine::Nginx(line) => line.envelope(),
            ParsedLine::HAProxy(line) => line.envelope(),
        }
    }

    pub fn tags(&self) -> &TagMap {
        self.envelope().tags()
    }
}

/// Outcome of dispatching one raw line
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub success: bool,
    pub raw: String,
    pub line: Option<ParsedLine>,
    pub error: Option<ParseError>,
    pub line_number: Option<usize>,
    pub processing_time_micros: Option<u64>,
}

impl ParseResult {
    pub fn success(line: ParsedLine) -> Self {
        Self {
            success: true,
            raw: line.envelope().raw.clone(),
            line: Some(line),
            error: None,
            line_number: None,
            processing_time_micros: None,
        }
    }

    pub fn failure(raw: String, error: ParseError) -> Self {
        Self {
            success: false,
            raw,
            line: None,
            error: Some(error),
            line_number: None,
            processing_time_micros: None,
        }
    }

    pub fn with_line_number(mut self, line_number: usize) -> Self {
        self.line_number = Some(line_number);
        self
    }

    pub fn with_processing_time(mut self, processing_time_micros: u64) -> Self {
        self.processing_time_micros = Some(processing_time_micros);
        self
    }

    /// Family of the parsed line, if parsing succeeded
    pub fn format(&self) -> Option<LineFormat> {
        self.line.as_ref().map(ParsedLine::format)
    }

    /// Error description prefixed with the line number when known
    pub fn detailed_error_description(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        Some(match self.line_number {
            Some(n) => format!("Line {}: {}", n, error),
            None => error.to_string(),
        })
    }
}
