use crate::envelope::SyslogLine;
use crate::error::ParseError;
use crate::models::{LineFormat, TagMap};

/// Capability shared by every format adapter.
///
/// An adapter embeds a [`SyslogLine`] and adds a body parser gated on the
/// envelope tag.
pub trait LineParser: Default + Sized {
    const FORMAT: LineFormat;

    fn envelope(&self) -> &SyslogLine;
    fn envelope_mut(&mut self) -> &mut SyslogLine;

    /// Whether `tag` is a program name this adapter handles
    fn supports_tag(tag: &str) -> bool;

    /// Extract body fields from the already-parsed envelope. Never fails:
    /// malformed fields stay at their zero value.
    fn parse_body(&mut self);

    /// Parse `raw` into this record.
    ///
    /// Once a record holds a parsed envelope, later calls only re-check the
    /// tag; the body is never re-extracted.
    fn parse(&mut self, raw: &str) -> Result<(), ParseError> {
        let fresh = self.envelope_mut().consume(raw)?;
        check_tag::<Self>(self.envelope())?;
        if fresh {
            self.parse_body();
        }
        Ok(())
    }

    fn from_line(raw: &str) -> Result<Self, ParseError> {
        let mut line = Self::default();
        line.parse(raw)?;
        Ok(line)
    }

    /// Specialize an envelope that has already been parsed
    fn from_envelope(envelope: SyslogLine) -> Result<Self, ParseError> {
        check_tag::<Self>(&envelope)?;
        let mut line = Self::default();
        *line.envelope_mut() = envelope;
        line.parse_body();
        Ok(line)
    }

    fn tags(&self) -> &TagMap {
        self.envelope().tags()
    }
}

fn check_tag<P: LineParser>(envelope: &SyslogLine) -> Result<(), ParseError> {
    if P::supports_tag(&envelope.tag) {
        Ok(())
    } else {
        Err(ParseError::UnsupportedTag { tag: envelope.tag.clone() })
    }
}

/// Best-effort integer: zero when `raw` is not a number
pub(crate) fn int_or_zero(raw: &str) -> i64 {
    raw.parse().unwrap_or(0)
}

/// Best-effort float: zero when `raw` is not a number
pub(crate) fn float_or_zero(raw: &str) -> f64 {
    raw.parse().unwrap_or(0.0)
}

pub mod haproxy;
pub mod nginx;
pub mod unicorn;

pub use haproxy::HAProxyLine;
pub use nginx::NginxLine;
pub use unicorn::UnicornLine;
