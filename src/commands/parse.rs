use crate::cli::{FilterArgs, OutputFormat, ParseArgs};
use crate::commands::output::{print_stats_summary, OutputFormatter};
use crate::dispatcher::{DispatchConfig, LineDispatcher};
use crate::models::LineFormat;
use crate::parallel_parser::{ParallelParser, WorkItem};
use crate::parse_result::{ParseResult, ParsedLine};
use chrono::{DateTime, Utc};
use glob::glob;
use std::collections::HashMap;
use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

/// Path naming standard input
pub const STDIN_PATH: &str = "-";

pub fn run_parse(args: ParseArgs, config: DispatchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let formatter = OutputFormatter::new(args.output);
    let filter = RecordFilter::from_args(&args.filters);

    let files = expand_globs(&args.files)?;
    if files.is_empty() {
        eprintln!("No files matched the given patterns");
        return Ok(());
    }

    let mut output: Box<dyn Write> = if let Some(ref path) = args.output_file {
        Box::new(File::create(path)?)
    } else {
        Box::new(stdout())
    };

    let mut dispatcher = LineDispatcher::with_config(config.clone());
    let parallel = args.batch.then(|| ParallelParser::with_dispatch_config(config));

    formatter.print_header(&mut output)?;
    let mut output_count = 0;

    'files: for file_path in &files {
        tracing::debug!(file = %file_path.display(), "parsing file");
        let results = match &parallel {
            Some(parallel) => {
                let items = read_lines(file_path)?;
                let result = parallel.parse_items_parallel(items);
                dispatcher.merge_statistics(&result.statistics);
                result.results
            }
            None => {
                let source = source_name(file_path, dispatcher.get_config());
                dispatcher.parse_reader(open_input(file_path)?, &source)?
            }
        };

        for result in &results {
            if args.limit.is_some_and(|limit| output_count >= limit) {
                break 'files;
            }
            match &result.line {
                Some(line) if filter.matches(line) => {
                    formatter.write_line(&mut output, line, output_count == 0)?;
                    output_count += 1;
                }
                None if args.show_errors && args.output == OutputFormat::Table => {
                    writeln!(output, "{}", formatter.format_failure(result))?;
                }
                None => log_failure(result),
                Some(_) => {}
            }
        }
    }

    formatter.print_footer(&mut output)?;

    // Summary goes to the terminal only when records went to a file
    if args.output_file.is_some() {
        if let Some(stats) = dispatcher.get_statistics() {
            print_stats_summary(stats);
        }
    }
    if let Some(report) = dispatcher.statistics_report() {
        tracing::info!("{}", report);
    }

    Ok(())
}

fn log_failure(result: &ParseResult) {
    if let Some(description) = result.detailed_error_description() {
        tracing::debug!(error = %description, "skipping line");
    }
}

/// File at `path`, or standard input for `-`
pub fn open_input(path: &Path) -> Result<Box<dyn Read>, std::io::Error> {
    if path == Path::new(STDIN_PATH) {
        Ok(Box::new(stdin()))
    } else {
        Ok(Box::new(File::open(path)?))
    }
}

/// Name recorded for lines read from `path`
pub fn source_name(path: &Path, config: &DispatchConfig) -> String {
    if path == Path::new(STDIN_PATH) {
        config.default_source.clone()
    } else {
        path.to_string_lossy().into_owned()
    }
}

/// Non-empty lines of a file, numbered by their position in it
pub fn read_lines(path: &Path) -> Result<Vec<WorkItem>, std::io::Error> {
    let reader = BufReader::new(open_input(path)?);
    let mut items = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if !line.trim().is_empty() {
            items.push(WorkItem { line, line_number: i + 1 });
        }
    }
    Ok(items)
}

pub fn expand_globs(patterns: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern_str = pattern.to_string_lossy();
        if pattern_str.contains('*') || pattern_str.contains('?') {
            for entry in glob(&pattern_str)? {
                files.push(entry?);
            }
        } else {
            files.push(pattern.clone());
        }
    }
    Ok(files)
}

pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
    }
    if let Ok(dt) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(DateTime::from_naive_utc_and_offset(dt.and_hms_opt(0, 0, 0)?, Utc));
    }

    // Relative, e.g. "1h ago"
    if let Ok(duration) = humantime::parse_duration(s.trim_end_matches(" ago")) {
        let now = Utc::now();
        return Some(now - chrono::Duration::from_std(duration).ok()?);
    }

    None
}

pub fn parse_field_filters(filters: &Option<Vec<String>>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Some(filters) = filters {
        for filter in filters {
            if let Some((key, value)) = filter.split_once('=') {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Record selection built from [`FilterArgs`]
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub formats: Option<Vec<LineFormat>>,
    pub host: Option<String>,
    pub tag: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub fields: HashMap<String, String>,
}

impl RecordFilter {
    pub fn from_args(args: &FilterArgs) -> Self {
        let formats = args.format.as_ref().map(|names| {
            names
                .iter()
                .filter_map(|name| {
                    let format = LineFormat::from_name(name);
                    if format.is_none() {
                        tracing::warn!(name = %name, "ignoring unknown line format");
                    }
                    format
                })
                .collect()
        });

        Self {
            formats,
            host: args.host.clone(),
            tag: args.tag.clone(),
            since: args.since.as_deref().and_then(parse_time),
            until: args.until.as_deref().and_then(parse_time),
            fields: parse_field_filters(&args.field),
        }
    }

    pub fn matches(&self, line: &ParsedLine) -> bool {
        let envelope = line.envelope();

        if let Some(ref formats) = self.formats {
            if !formats.contains(&line.format()) {
                return false;
            }
        }

        if self.host.as_ref().is_some_and(|host| *host != envelope.host) {
            return false;
        }

        if self.tag.as_ref().is_some_and(|tag| *tag != envelope.tag) {
            return false;
        }

        // Lines without a timestamp are never excluded by time
        if let Some(ts) = envelope.time_utc() {
            if self.since.is_some_and(|start| ts < start) {
                return false;
            }
            if self.until.is_some_and(|end| ts > end) {
                return false;
            }
        }

        for (key, expected_value) in &self.fields {
            match envelope.tag_value(key) {
                Some(value) if value.to_string().contains(expected_value.as_str()) => {}
                _ => return false,
            }
        }

        true
    }
}
