use crate::logging::LogFormat;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "syslines")]
#[command(author, version, about = "Parse syslog-collected unicorn, nginx and haproxy lines into structured records")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Dispatcher configuration file (JSON)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Number of parallel threads (0 = auto-detect)
    #[arg(long, short = 'j', global = true, default_value = "0")]
    pub parallel: usize,

    /// Diagnostic log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Diagnostic log format
    #[arg(long, global = true, value_enum, default_value = "compact")]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse log files and output structured records
    Parse(ParseArgs),

    /// Show statistics and summaries
    Stats(StatsArgs),

    /// Print the key=value tags found in each line
    Tags(TagsArgs),

    /// Live tail a log file with parsing
    Tail(TailArgs),
}

/// Record filters shared by several commands
#[derive(Args, Clone, Default)]
pub struct FilterArgs {
    /// Only lines of these families (syslog, unicorn, nginx, haproxy)
    #[arg(long)]
    pub format: Option<Vec<String>>,

    /// Only lines from this host
    #[arg(long)]
    pub host: Option<String>,

    /// Only lines with this program tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Filter by time - start (e.g., "1h ago", "2025-01-01")
    #[arg(long)]
    pub since: Option<String>,

    /// Filter by time - end
    #[arg(long)]
    pub until: Option<String>,

    /// Filter by tag value (format: key=value)
    #[arg(long, short = 'F')]
    pub field: Option<Vec<String>>,
}

#[derive(Args)]
pub struct ParseArgs {
    /// Log files to parse (supports glob patterns, "-" reads stdin)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "table")]
    pub output: OutputFormat,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Include lines that failed to parse
    #[arg(long)]
    pub show_errors: bool,

    /// Maximum number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Parse each file as one parallel batch
    #[arg(long)]
    pub batch: bool,

    /// Output file (default: stdout)
    #[arg(long = "output-file")]
    pub output_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Log files to analyze
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Count lines by tag value
    #[arg(long)]
    pub count_by: Option<String>,

    /// Show top N entries
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Show time histogram
    #[arg(long)]
    pub histogram: bool,

    /// Time bucket for histogram (hour, day, minute)
    #[arg(long, default_value = "hour")]
    pub bucket: String,
}

#[derive(Args)]
pub struct TagsArgs {
    /// Log files to query
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Print only this tag's value
    #[arg(long, short)]
    pub key: Option<String>,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Emit one JSON object per line
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct TailArgs {
    /// Log file to tail
    #[arg(required = true)]
    pub file: PathBuf,

    /// Follow file changes (like tail -f)
    #[arg(long, short)]
    pub follow: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Number of lines to show initially
    #[arg(long, short = 'n', default_value = "10")]
    pub lines: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// Pretty JSON array
    Json,
    /// Newline-delimited JSON
    Ndjson,
    /// CSV format
    Csv,
    /// Raw input line
    Raw,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Ndjson => write!(f, "ndjson"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Raw => write!(f, "raw"),
        }
    }
}
