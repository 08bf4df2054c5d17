use crate::cli::StatsArgs;
use crate::commands::output::print_stats_summary;
use crate::commands::parse::{expand_globs, open_input, source_name, RecordFilter};
use crate::dispatcher::{DispatchConfig, LineDispatcher};
use crate::parse_result::ParseResult;
use crate::statistics::ParsingStatistics;
use colored::*;
use std::collections::HashMap;

/// Histogram bucket width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucket {
    Minute,
    Hour,
    Day,
}

impl TimeBucket {
    /// Unknown names fall back to hourly buckets
    pub fn from_name(name: &str) -> Self {
        match name {
            "minute" => TimeBucket::Minute,
            "day" => TimeBucket::Day,
            _ => TimeBucket::Hour,
        }
    }

    fn layout(self) -> &'static str {
        match self {
            TimeBucket::Minute => "%Y-%m-%d %H:%M",
            TimeBucket::Hour => "%Y-%m-%d %H:00",
            TimeBucket::Day => "%Y-%m-%d",
        }
    }
}

/// Counters gathered over every selected line
#[derive(Debug, Default)]
pub struct LineStats {
    pub statistics: ParsingStatistics,
    pub tag_counts: HashMap<String, usize>,
    pub host_counts: HashMap<String, usize>,
    pub value_counts: HashMap<String, usize>,
    pub time_buckets: HashMap<String, usize>,
}

impl LineStats {
    pub fn record(&mut self, result: &ParseResult, count_by: Option<&str>, bucket: Option<TimeBucket>) {
        let processing_time = result.processing_time_micros.unwrap_or(0);
        let line = match (&result.line, &result.error) {
            (Some(line), _) => line,
            (None, Some(error)) => {
                self.statistics.record_failure(error, processing_time);
                return;
            }
            (None, None) => return,
        };

        self.statistics.record_success(line.format(), processing_time);
        let envelope = line.envelope();

        if !envelope.tag.is_empty() {
            *self.tag_counts.entry(envelope.tag.clone()).or_insert(0) += 1;
        }
        if !envelope.host.is_empty() {
            *self.host_counts.entry(envelope.host.clone()).or_insert(0) += 1;
        }

        if let Some(value) = count_by.and_then(|key| envelope.tag_value(key)) {
            *self.value_counts.entry(value.to_string()).or_insert(0) += 1;
        }

        if let (Some(bucket), Some(ts)) = (bucket, envelope.time_utc()) {
            *self.time_buckets.entry(ts.format(bucket.layout()).to_string()).or_insert(0) += 1;
        }
    }
}

/// Entries sorted by descending count, ties by name
pub fn top_entries(counts: &HashMap<String, usize>, n: usize) -> Vec<(&String, usize)> {
    let mut sorted: Vec<_> = counts.iter().map(|(k, v)| (k, *v)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted.truncate(n);
    sorted
}

pub fn run_stats(args: StatsArgs, config: DispatchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut dispatcher = LineDispatcher::with_config(config);
    let filter = RecordFilter::from_args(&args.filters);
    let bucket = args.histogram.then(|| TimeBucket::from_name(&args.bucket));

    let files = expand_globs(&args.files)?;
    if files.is_empty() {
        eprintln!("No files matched the given patterns");
        return Ok(());
    }

    let mut stats = LineStats::default();
    for file_path in &files {
        let source = source_name(file_path, dispatcher.get_config());
        let results = dispatcher.parse_reader(open_input(file_path)?, &source)?;
        for result in &results {
            if result.line.as_ref().is_some_and(|line| !filter.matches(line)) {
                continue;
            }
            stats.record(result, args.count_by.as_deref(), bucket);
        }
    }

    print_stats_summary(&stats.statistics);
    let total = stats.statistics.total_lines.max(1) as f64;

    for (title, counts) in [("Top Tags", &stats.tag_counts), ("Top Hosts", &stats.host_counts)] {
        if counts.is_empty() {
            continue;
        }
        println!("\n{}:", title.cyan().bold());
        for (name, count) in top_entries(counts, args.top) {
            let bar = "█".repeat((count as f64 / total * 40.0) as usize);
            println!("  {:20} {:>8} ({:5.1}%) {}", name, count, (count as f64 / total) * 100.0, bar.green());
        }
    }

    if !stats.time_buckets.is_empty() {
        println!("\n{}:", "Time Distribution".cyan().bold());
        let mut sorted: Vec<_> = stats.time_buckets.iter().collect();
        sorted.sort();
        let max_count = sorted.iter().map(|(_, c)| **c).max().unwrap_or(1);
        for (bucket, count) in sorted {
            let bar = "█".repeat((*count as f64 / max_count as f64 * 40.0) as usize);
            println!("  {} {:>6} {}", bucket, count, bar.blue());
        }
    }

    if let Some(ref key) = args.count_by {
        println!("\n{} by '{}':", "Count".cyan().bold(), key);
        for (value, count) in top_entries(&stats.value_counts, args.top) {
            println!("  {:40} {:>8}", value, count);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINES: [&str; 5] = [
        "2014-03-12T10:01:00+00:00 web1 nginx: status=200",
        "2014-03-12T10:02:00+00:00 web1 nginx: status=500",
        "2014-03-12T11:00:00+00:00 web2 nginx: status=200",
        "2014-03-12T11:30:00+00:00 app1 unicorn: status=200",
        "not-a-time web1 nginx: status=200",
    ];

    fn gather(count_by: Option<&str>, bucket: Option<TimeBucket>) -> LineStats {
        let dispatcher = LineDispatcher::new();
        let mut stats = LineStats::default();
        for line in LINES {
            stats.record(&dispatcher.dispatch(line), count_by, bucket);
        }
        stats
    }

    #[test]
    fn test_counts_tags_hosts_and_failures() {
        let stats = gather(None, None);
        assert_eq!(stats.statistics.total_lines, 5);
        assert_eq!(stats.statistics.failed_parses, 1);
        assert_eq!(stats.tag_counts["nginx"], 3);
        assert_eq!(stats.host_counts["web1"], 2);
        assert!(stats.time_buckets.is_empty());
    }

    #[test]
    fn test_count_by_tag_value() {
        let stats = gather(Some("status"), None);
        let top = top_entries(&stats.value_counts, 1);
        assert_eq!(top, vec![(&"200".to_string(), 3)]);
    }

    #[test]
    fn test_hourly_histogram() {
        let stats = gather(None, Some(TimeBucket::from_name("hour")));
        assert_eq!(stats.time_buckets["2014-03-12 10:00"], 2);
        assert_eq!(stats.time_buckets["2014-03-12 11:00"], 2);

        let daily = gather(None, Some(TimeBucket::Day));
        assert_eq!(daily.time_buckets["2014-03-12"], 4);
    }
}
