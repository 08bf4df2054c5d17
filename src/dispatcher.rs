use crate::envelope::SyslogLine;
use crate::error::{ConfigError, ParseError};
use crate::models::LineFormat;
use crate::parallel_parser::ParallelConfig;
use crate::parse_result::{ParseResult, ParsedLine};
use crate::parsers::{HAProxyLine, LineParser, NginxLine, UnicornLine};
use crate::statistics::{ParsingStatistics, StatisticsMonitor};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::time::Instant;

/// Configuration for the line dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Adapter families tried after the envelope, in order
    pub formats: Vec<LineFormat>,

    /// Compute each line's tag map during parse instead of on first access
    pub eager_tags: bool,

    /// Enable statistics collection
    pub enable_statistics: bool,

    /// Log a status line every `report_interval` lines (0 disables)
    pub report_interval: usize,

    /// Parallel processing configuration
    pub parallel_config: ParallelConfig,

    /// Source name used when none is given
    pub default_source: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            formats: LineFormat::ADAPTERS.to_vec(),
            eager_tags: false,
            enable_statistics: true,
            report_interval: 0,
            parallel_config: ParallelConfig::default(),
            default_source: "unknown".to_string(),
        }
    }
}

impl DispatchConfig {
    /// Load a configuration from a JSON file; absent keys take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: DispatchConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.formats.is_empty() {
            return Err(ConfigError::Invalid {
                parameter: "formats".to_string(),
                message: "at least one line format must be enabled".to_string(),
            });
        }

        if self.formats.contains(&LineFormat::Syslog) {
            return Err(ConfigError::Invalid {
                parameter: "formats".to_string(),
                message: "syslog is the fallback family and cannot be listed as an adapter".to_string(),
            });
        }

        if self.parallel_config.batch_size == 0 {
            return Err(ConfigError::Invalid {
                parameter: "parallel_config.batch_size".to_string(),
                message: "Parallel batch size must be greater than 0".to_string(),
            });
        }

        if self.parallel_config.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                parameter: "parallel_config.queue_capacity".to_string(),
                message: "Queue capacity must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Parses raw lines and routes them to the adapter matching their tag
pub struct LineDispatcher {
    config: DispatchConfig,
    statistics_monitor: Option<StatisticsMonitor>,
}

impl LineDispatcher {
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        let statistics_monitor = if config.enable_statistics {
            Some(StatisticsMonitor::with_settings(config.report_interval > 0, config.report_interval))
        } else {
            None
        };

        Self {
            config,
            statistics_monitor,
        }
    }

    /// Parse one line without touching statistics.
    ///
    /// Lines whose tag no enabled adapter accepts come back as
    /// [`ParsedLine::Syslog`].
    pub fn dispatch(&self, raw: &str) -> ParseResult {
        let start_time = Instant::now();

        let result = match SyslogLine::from_line(raw) {
            Ok(envelope) => match self.specialize(envelope) {
                Ok(line) => {
                    if self.config.eager_tags {
                        line.tags();
                    }
                    ParseResult::success(line)
                }
                Err(error) => ParseResult::failure(raw.to_string(), error),
            },
            Err(error) => ParseResult::failure(raw.to_string(), error),
        };

        result.with_processing_time(start_time.elapsed().as_micros() as u64)
    }

    fn specialize(&self, envelope: SyslogLine) -> Result<ParsedLine, ParseError> {
        let format = self.config.formats.iter().copied().find(|format| match format {
            LineFormat::Unicorn => UnicornLine::supports_tag(&envelope.tag),
            LineFormat::Nginx => NginxLine::supports_tag(&envelope.tag),
            LineFormat::HAProxy => HAProxyLine::supports_tag(&envelope.tag),
            LineFormat::Syslog => false,
        });

        Ok(match format {
            Some(LineFormat::Unicorn) => ParsedLine::Unicorn(UnicornLine::from_envelope(envelope)?),
            Some(LineFormat::Nginx) => ParsedLine::Nginx(NginxLine::from_envelope(envelope)?),
            Some(LineFormat::HAProxy) => ParsedLine::HAProxy(HAProxyLine::from_envelope(envelope)?),
            Some(LineFormat::Syslog) | None => ParsedLine::Syslog(envelope),
        })
    }

    /// Parse one line and record it in the statistics
    pub fn parse_line(&mut self, raw: &str) -> ParseResult {
        let result = self.dispatch(raw);
        self.record_statistics(&result);
        result
    }

    /// Parse multiple lines
    pub fn parse_lines<I>(&mut self, lines: I) -> Vec<ParseResult>
    where
        I: IntoIterator<Item = String>,
    {
        lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| self.parse_line(&line).with_line_number(i + 1))
            .collect()
    }

    /// Parse every non-empty line of a reader; line numbers count from 1
    pub fn parse_reader<R: Read>(&mut self, reader: R, source: &str) -> Result<Vec<ParseResult>, std::io::Error> {
        let buf_reader = BufReader::new(reader);
        let mut results = Vec::new();

        for (i, line) in buf_reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            results.push(self.parse_line(&line).with_line_number(i + 1));
        }

        tracing::debug!(source, lines = results.len(), "reader parsed");
        Ok(results)
    }

    /// Fold externally gathered statistics (e.g. from a parallel run) in
    pub fn merge_statistics(&mut self, stats: &ParsingStatistics) {
        if let Some(ref mut monitor) = self.statistics_monitor {
            monitor.merge(stats);
        }
    }

    fn record_statistics(&mut self, result: &ParseResult) {
        let Some(ref mut monitor) = self.statistics_monitor else {
            return;
        };
        let processing_time = result.processing_time_micros.unwrap_or(0);
        match (&result.line, &result.error) {
            (Some(line), _) => monitor.record_success(line.format(), processing_time),
            (None, Some(error)) => monitor.record_failure(error, processing_time),
            (None, None) => {}
        }
    }

    pub fn get_statistics(&self) -> Option<&ParsingStatistics> {
        self.statistics_monitor.as_ref().map(|monitor| monitor.get_statistics())
    }

    pub fn statistics_report(&self) -> Option<String> {
        self.statistics_monitor.as_ref().map(|monitor| monitor.generate_report())
    }

    pub fn get_config(&self) -> &DispatchConfig {
        &self.config
    }
}

impl Default for LineDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
