use crate::envelope::SyslogLine;
use crate::models::LineFormat;
use crate::parsers::{float_or_zero, int_or_zero, LineParser};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Program name of the TLS terminator
pub const SSL_ENDPOINT_TAG: &str = "ssl_endpoint";
/// Program name of the plain web server
pub const NGINX_TAG: &str = "nginx";

// Multi-word quoted values the whitespace split would truncate. Unanchored,
// so a later `xref="..."` also lands in `referer`.
static QUOTED_FIELDS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(ua|uri|ref)="(.*?)""#).unwrap_or_else(|_| unreachable!()));

/// Web server access line in `key=value` form
#[derive(Debug, Clone, Default, Serialize)]
pub struct NginxLine {
    #[serde(flatten)]
    pub line: SyslogLine,
    pub method: String,
    pub status: String,
    pub length: i64,
    pub total_time: f64,
    pub unicorn_time: f64,
    pub http_host: String,
    pub user_agent_name: String,
    pub uri: String,
    pub referer: String,
}

impl LineParser for NginxLine {
    const FORMAT: LineFormat = LineFormat::Nginx;

    fn envelope(&self) -> &SyslogLine {
        &self.line
    }

    fn envelope_mut(&mut self) -> &mut SyslogLine {
        &mut self.line
    }

    fn supports_tag(tag: &str) -> bool {
        tag == SSL_ENDPOINT_TAG || tag == NGINX_TAG
    }

    fn parse_body(&mut self) {
        for field in self.line.fields() {
            let Some((key, value)) = field.split_once('=') else {
                continue;
            };
            match key {
                "method" => self.method = value.to_string(),
                "status" => self.status = value.to_string(),
                "host" => self.http_host = value.to_string(),
                "length" => self.length = int_or_zero(value),
                "total" => self.total_time = float_or_zero(value),
                "unicorn_time" => self.unicorn_time = float_or_zero(value),
                _ => {}
            }
        }

        for caps in QUOTED_FIELDS_REGEX.captures_iter(&self.line.raw) {
            let value = caps[2].to_string();
            match &caps[1] {
                "ua" => self.user_agent_name = value,
                "uri" => self.uri = value,
                "ref" => self.referer = value,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    const LINE: &str = r#"2014-03-12T10:00:00.123456+00:00 web1 nginx.info[3120]: method=GET host=a.com status=200 length=5120 total=0.12 unicorn_time=0.101 ua="Mozilla 5" uri="/x" ref="-""#;

    #[test]
    fn test_nginx_fields() {
        let line = NginxLine::from_line(LINE).unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.http_host, "a.com");
        assert_eq!(line.status, "200");
        assert_eq!(line.length, 5120);
        assert_eq!(line.total_time, 0.12);
        assert_eq!(line.unicorn_time, 0.101);
        assert_eq!(line.user_agent_name, "Mozilla 5");
        assert_eq!(line.uri, "/x");
        assert_eq!(line.referer, "-");
        assert_eq!(line.line.tag, "nginx");
    }

    #[test]
    fn test_ssl_endpoint_tag_is_accepted() {
        let line = NginxLine::from_line(
            "2014-03-12T10:00:00+00:00 lb2 ssl_endpoint: host=b.com status=301 uri=\"/a b/c\"",
        )
        .unwrap();
        assert_eq!(line.http_host, "b.com");
        assert_eq!(line.status, "301");
        assert_eq!(line.uri, "/a b/c");
    }

    #[test]
    fn test_malformed_numbers_default_to_zero() {
        let line = NginxLine::from_line(
            "2014-03-12T10:00:00+00:00 web1 nginx: length=huge total=- unicorn_time=1.2.3 status=",
        )
        .unwrap();
        assert_eq!(line.length, 0);
        assert_eq!(line.total_time, 0.0);
        assert_eq!(line.unicorn_time, 0.0);
        assert_eq!(line.status, "");
    }

    #[test]
    fn test_absent_keys_stay_empty() {
        let line = NginxLine::from_line("2014-03-12T10:00:00+00:00 web1 nginx: hello").unwrap();
        assert!(line.method.is_empty());
        assert!(line.user_agent_name.is_empty());
        assert_eq!(line.length, 0);
    }

    #[test]
    fn test_quoted_keys_last_match_wins() {
        let line = NginxLine::from_line(
            "2014-03-12T10:00:00+00:00 web1 nginx: ref=\"a\" ua=\"good agent\" xref=\"b\"",
        )
        .unwrap();
        assert_eq!(line.user_agent_name, "good agent");
        assert_eq!(line.referer, "b");
    }

    #[test]
    fn test_second_parse_keeps_fields() {
        let mut line = NginxLine::from_line(LINE).unwrap();
        line.parse("2020-01-01T00:00:00+00:00 web9 nginx: method=POST host=z.com status=500 ua=\"other\"")
            .unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.http_host, "a.com");
        assert_eq!(line.status, "200");
        assert_eq!(line.user_agent_name, "Mozilla 5");
        assert_eq!(line.line.host, "web1");
    }

    #[test]
    fn test_nginx_rejects_unicorn() {
        let err = NginxLine::from_line("2014-03-12T10:00:00+00:00 app1 unicorn: status=200").unwrap_err();
        assert_eq!(err, ParseError::UnsupportedTag { tag: "unicorn".to_string() });
    }
}
