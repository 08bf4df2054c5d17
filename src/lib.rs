pub mod models;
pub mod error;
pub mod envelope;
pub mod tags;
pub mod parsers;
pub mod parse_result;
pub mod statistics;
pub mod dispatcher;
pub mod parallel_parser;
pub mod logging;
pub mod cli;
pub mod commands;

#[cfg(test)]
mod parallel_tests;

pub use models::{LineFormat, TagMap, TagValue};
pub use error::{ConfigError, ParseError};
pub use envelope::SyslogLine;
pub use tags::parse_tags;
pub use parsers::{HAProxyLine, LineParser, NginxLine, UnicornLine};
pub use parse_result::{ParseResult, ParsedLine};
pub use statistics::{ParsingStatistics, StatisticsMonitor};
pub use dispatcher::{DispatchConfig, LineDispatcher};
pub use parallel_parser::{ParallelConfig, ParallelParser, ParallelResult, WorkItem};
