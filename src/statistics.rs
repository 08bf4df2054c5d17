use crate::error::ParseError;
use crate::models::LineFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parsing statistics for monitoring and debugging
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingStatistics {
    /// Total number of lines processed
    pub total_lines: usize,
    /// Number of successfully parsed lines
    pub successful_parses: usize,
    /// Number of lines that failed to parse
    pub failed_parses: usize,
    /// Lines per line family
    pub format_distribution: HashMap<LineFormat, usize>,
    /// Failures per error kind
    pub error_distribution: HashMap<String, usize>,
    /// Processing time statistics (in microseconds)
    pub processing_time_micros: ProcessingTimeStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingTimeStats {
    pub total_time: u64,
    pub min_time: u64,
    pub max_time: u64,
    pub avg_time: f64,
}

impl ParsingStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful parse
    pub fn record_success(&mut self, format: LineFormat, processing_time_micros: u64) {
        self.total_lines += 1;
        self.successful_parses += 1;
        *self.format_distribution.entry(format).or_insert(0) += 1;
        self.update_processing_time(processing_time_micros);
    }

    /// Record a failed parse
    pub fn record_failure(&mut self, error: &ParseError, processing_time_micros: u64) {
        self.total_lines += 1;
        self.failed_parses += 1;
        *self.error_distribution.entry(error.kind().to_string()).or_insert(0) += 1;
        self.update_processing_time(processing_time_micros);
    }

    /// Get success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            (self.successful_parses as f64 / self.total_lines as f64) * 100.0
        }
    }

    /// Get error rate as a percentage
    pub fn error_rate(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            (self.failed_parses as f64 / self.total_lines as f64) * 100.0
        }
    }

    /// Fold another set of statistics into this one
    pub fn merge(&mut self, other: &ParsingStatistics) {
        self.total_lines += other.total_lines;
        self.successful_parses += other.successful_parses;
        self.failed_parses += other.failed_parses;
        for (format, count) in &other.format_distribution {
            *self.format_distribution.entry(*format).or_insert(0) += count;
        }
        for (kind, count) in &other.error_distribution {
            *self.error_distribution.entry(kind.clone()).or_insert(0) += count;
        }

        let times = &mut self.processing_time_micros;
        let other_times = &other.processing_time_micros;
        times.total_time = times.total_time.saturating_add(other_times.total_time);
        if other_times.min_time > 0 && (times.min_time == 0 || other_times.min_time < times.min_time) {
            times.min_time = other_times.min_time;
        }
        times.max_time = times.max_time.max(other_times.max_time);
        if self.total_lines > 0 {
            times.avg_time = times.total_time as f64 / self.total_lines as f64;
        }
    }

    fn update_processing_time(&mut self, time_micros: u64) {
        self.processing_time_micros.total_time = self.processing_time_micros.total_time.saturating_add(time_micros);

        if self.processing_time_micros.min_time == 0 || time_micros < self.processing_time_micros.min_time {
            self.processing_time_micros.min_time = time_micros;
        }

        if time_micros > self.processing_time_micros.max_time {
            self.processing_time_micros.max_time = time_micros;
        }

        self.processing_time_micros.avg_time =
            self.processing_time_micros.total_time as f64 / self.total_lines as f64;
    }
}

/// Statistics with periodic status reporting through `tracing`
#[derive(Debug, Clone)]
pub struct StatisticsMonitor {
    stats: ParsingStatistics,
    monitoring_enabled: bool,
    report_interval: usize,
    last_report_line: usize,
}

impl StatisticsMonitor {
    pub fn new() -> Self {
        Self::with_settings(false, 1000)
    }

    pub fn with_settings(monitoring_enabled: bool, report_interval: usize) -> Self {
        Self {
            stats: ParsingStatistics::new(),
            monitoring_enabled,
            report_interval,
            last_report_line: 0,
        }
    }

    pub fn record_success(&mut self, format: LineFormat, processing_time_micros: u64) {
        self.stats.record_success(format, processing_time_micros);
        tracing::trace!(%format, processing_time_micros, "line parsed");
        self.check_and_report();
    }

    pub fn record_failure(&mut self, error: &ParseError, processing_time_micros: u64) {
        self.stats.record_failure(error, processing_time_micros);
        tracing::debug!(%error, processing_time_micros, "line rejected");
        self.check_and_report();
    }

    pub fn get_statistics(&self) -> &ParsingStatistics {
        &self.stats
    }

    pub fn merge(&mut self, other: &ParsingStatistics) {
        self.stats.merge(other);
        self.check_and_report();
    }

    /// Multi-line text report
    pub fn generate_report(&self) -> String {
        let stats = &self.stats;
        let mut report = String::new();

        report.push_str("=== Parsing Statistics Report ===\n");
        report.push_str(&format!("Total lines processed: {}\n", stats.total_lines));
        report.push_str(&format!("Successful parses: {} ({:.2}%)\n", stats.successful_parses, stats.success_rate()));
        report.push_str(&format!("Failed parses: {} ({:.2}%)\n", stats.failed_parses, stats.error_rate()));

        report.push_str("\n--- Format Distribution ---\n");
        let mut formats: Vec<_> = stats.format_distribution.iter().collect();
        formats.sort();
        for (format, count) in formats {
            let percentage = (*count as f64 / stats.total_lines as f64) * 100.0;
            report.push_str(&format!("{}: {} ({:.2}%)\n", format, count, percentage));
        }

        report.push_str("\n--- Error Distribution ---\n");
        let mut errors: Vec<_> = stats.error_distribution.iter().collect();
        errors.sort();
        for (kind, count) in errors {
            let percentage = (*count as f64 / stats.failed_parses as f64) * 100.0;
            report.push_str(&format!("{}: {} ({:.2}%)\n", kind, count, percentage));
        }

        report.push_str("\n--- Performance Metrics ---\n");
        report.push_str(&format!("Total processing time: {}μs\n", stats.processing_time_micros.total_time));
        report.push_str(&format!("Average processing time: {:.2}μs\n", stats.processing_time_micros.avg_time));
        report.push_str(&format!("Min processing time: {}μs\n", stats.processing_time_micros.min_time));
        report.push_str(&format!("Max processing time: {}μs\n", stats.processing_time_micros.max_time));

        report
    }

    /// Compact status line for continuous monitoring
    pub fn generate_status_line(&self) -> String {
        let stats = &self.stats;
        format!(
            "Lines: {} | Success: {:.1}% | Errors: {:.1}% | Avg Time: {:.1}μs",
            stats.total_lines,
            stats.success_rate(),
            stats.error_rate(),
            stats.processing_time_micros.avg_time
        )
    }

    fn check_and_report(&mut self) {
        if !self.monitoring_enabled || self.report_interval == 0 {
            return;
        }

        if self.stats.total_lines - self.last_report_line >= self.report_interval {
            tracing::info!(status = %self.generate_status_line(), "parse progress");
            self.last_report_line = self.stats.total_lines;
        }
    }
}

impl Default for StatisticsMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsupported() -> ParseError {
        ParseError::UnsupportedTag { tag: "x".to_string() }
    }

    #[test]
    fn test_record_and_rates() {
        let mut stats = ParsingStatistics::new();
        stats.record_success(LineFormat::Nginx, 10);
        stats.record_success(LineFormat::Nginx, 30);
        stats.record_success(LineFormat::HAProxy, 20);
        stats.record_failure(&unsupported(), 40);

        assert_eq!(stats.total_lines, 4);
        assert_eq!(stats.successful_parses, 3);
        assert_eq!(stats.failed_parses, 1);
        assert_eq!(stats.format_distribution[&LineFormat::Nginx], 2);
        assert_eq!(stats.error_distribution["UnsupportedTag"], 1);
        assert_eq!(stats.success_rate(), 75.0);
        assert_eq!(stats.error_rate(), 25.0);
        assert_eq!(stats.processing_time_micros.min_time, 10);
        assert_eq!(stats.processing_time_micros.max_time, 40);
        assert_eq!(stats.processing_time_micros.avg_time, 25.0);
    }

    #[test]
    fn test_empty_rates_are_zero() {
        let stats = ParsingStatistics::new();
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.error_rate(), 0.0);
    }

    #[test]
    fn test_merge() {
        let mut a = ParsingStatistics::new();
        a.record_success(LineFormat::Unicorn, 5);
        let mut b = ParsingStatistics::new();
        b.record_success(LineFormat::Unicorn, 3);
        b.record_failure(&unsupported(), 9);

        a.merge(&b);
        assert_eq!(a.total_lines, 3);
        assert_eq!(a.format_distribution[&LineFormat::Unicorn], 2);
        assert_eq!(a.failed_parses, 1);
        assert_eq!(a.processing_time_micros.min_time, 3);
        assert_eq!(a.processing_time_micros.max_time, 9);
        assert_eq!(a.processing_time_micros.total_time, 17);
    }

    #[test]
    fn test_monitor_report() {
        let mut monitor = StatisticsMonitor::with_settings(true, 1);
        monitor.record_success(LineFormat::Syslog, 1);
        monitor.record_failure(&unsupported(), 1);

        let report = monitor.generate_report();
        assert!(report.contains("Total lines processed: 2"));
        assert!(report.contains("syslog: 1"));
        assert!(report.contains("UnsupportedTag: 1"));
        assert!(monitor.generate_status_line().starts_with("Lines: 2"));
    }
}
