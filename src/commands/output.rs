use crate::cli::OutputFormat;
use crate::envelope::format_time;
use crate::models::LineFormat;
use crate::parse_result::{ParseResult, ParsedLine};
use crate::statistics::ParsingStatistics;
use colored::*;
use std::io::{self, Write};

const CSV_HEADER: [&str; 9] = ["time", "host", "tag", "severity", "pid", "format", "summary", "tags", "raw"];

pub struct OutputFormatter {
    format: OutputFormat,
    include_tags: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            include_tags: true,
        }
    }

    pub fn with_tags(mut self, include: bool) -> Self {
        self.include_tags = include;
        self
    }

    pub fn print_header(&self, writer: &mut impl Write) -> io::Result<()> {
        match self.format {
            OutputFormat::Csv => writer.write_all(&csv_row(&CSV_HEADER.map(str::to_string))?),
            OutputFormat::Table => writeln!(writer, "{}", "─".repeat(100).dimmed()),
            OutputFormat::Json => writeln!(writer, "["),
            _ => Ok(()),
        }
    }

    pub fn print_footer(&self, writer: &mut impl Write) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => writeln!(writer, "]"),
            _ => Ok(()),
        }
    }

    /// Write one record; `first` tells JSON output whether a separator is needed
    pub fn write_line(&self, writer: &mut impl Write, line: &ParsedLine, first: bool) -> io::Result<()> {
        match self.format {
            OutputFormat::Table => writeln!(writer, "{}", self.format_table(line)),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&self.line_to_json(line))?;
                if first {
                    writeln!(writer, "{}", json)
                } else {
                    writeln!(writer, ",{}", json)
                }
            }
            OutputFormat::Ndjson => writeln!(writer, "{}", serde_json::to_string(&self.line_to_json(line))?),
            OutputFormat::Csv => writer.write_all(&self.format_csv(line)?),
            OutputFormat::Raw => writeln!(writer, "{}", line.envelope().raw),
        }
    }

    /// Describe a failed line on the table output
    pub fn format_failure(&self, result: &ParseResult) -> String {
        let description = result.detailed_error_description().unwrap_or_default();
        format!("{} {}", "ERROR".red().bold(), description.red())
    }

    fn format_table(&self, line: &ParsedLine) -> String {
        let envelope = line.envelope();
        let mut output = String::new();

        let ts = envelope
            .time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!("{} ", ts.cyan()));
        output.push_str(&format!("{} ", envelope.host.white()));

        let tag = match &envelope.severity {
            Some(severity) => format!("{}.{}", envelope.tag, severity),
            None => envelope.tag.clone(),
        };
        let colored_format = match line.format() {
            LineFormat::Syslog => line.format().name().dimmed(),
            LineFormat::Unicorn => line.format().name().magenta(),
            LineFormat::Nginx => line.format().name().green(),
            LineFormat::HAProxy => line.format().name().blue(),
        };
        output.push_str(&format!("[{:^7}] {} ", colored_format, tag.yellow()));
        output.push_str(&summary(line));

        if self.include_tags && !line.tags().is_empty() {
            let tags: Vec<String> = line.tags().iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            output.push_str(&format!(" {}", tags.join(" ").dimmed()));
        }

        output
    }

    fn line_to_json(&self, line: &ParsedLine) -> serde_json::Value {
        let mut value = serde_json::to_value(line).unwrap_or_default();
        if let (true, Some(obj)) = (self.include_tags, value.as_object_mut()) {
            obj.insert("tags".to_string(), serde_json::to_value(line.tags()).unwrap_or_default());
        }
        value
    }

    fn format_csv(&self, line: &ParsedLine) -> io::Result<Vec<u8>> {
        let envelope = line.envelope();
        let tags = if self.include_tags {
            serde_json::to_string(line.tags())?
        } else {
            String::new()
        };
        csv_row(&[
            envelope.time.as_ref().map(format_time).unwrap_or_default(),
            envelope.host.clone(),
            envelope.tag.clone(),
            envelope.severity.clone().unwrap_or_default(),
            envelope.pid.to_string(),
            line.format().name().to_string(),
            summary(line),
            tags,
            envelope.raw.clone(),
        ])
    }
}

fn csv_row(fields: &[String]) -> io::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(fields).map_err(|e| io::Error::other(e.to_string()))?;
    writer.into_inner().map_err(|e| io::Error::other(e.to_string()))
}

/// One-line description of the family-specific body
pub fn summary(line: &ParsedLine) -> String {
    match line {
        ParsedLine::Syslog(line) => line.fields().iter().skip(3).cloned().collect::<Vec<_>>().join(" "),
        ParsedLine::Unicorn(line) => match &line.uuid {
            Some(uuid) => format!("request {}", uuid),
            None => line.line.fields().iter().skip(3).cloned().collect::<Vec<_>>().join(" "),
        },
        ParsedLine::Nginx(line) => format!(
            "{} {}{} {} {}B {:.3}s",
            line.method, line.http_host, line.uri, line.status, line.length, line.total_time
        ),
        ParsedLine::HAProxy(line) => format!(
            "{} -> {}/{} {} {} {} {}B Tt={}ms",
            line.frontend,
            line.backend,
            line.backend_host,
            line.status,
            line.method,
            line.uri,
            line.length,
            line.session_duration_time
        ),
    }
}

pub fn print_stats_summary(stats: &ParsingStatistics) {
    let total = stats.total_lines.max(1) as f64;
    println!("\n{}", "═".repeat(50).cyan());
    println!("{}", "SUMMARY".cyan().bold());
    println!("{}", "═".repeat(50).cyan());
    println!("Total lines:      {}", stats.total_lines.to_string().white().bold());
    println!(
        "Parsed OK:        {} ({:.1}%)",
        stats.successful_parses.to_string().green(),
        stats.success_rate()
    );
    println!(
        "Failed:           {} ({:.1}%)",
        stats.failed_parses.to_string().red(),
        stats.error_rate()
    );

    if !stats.format_distribution.is_empty() {
        println!("\n{}:", "Format Distribution".dimmed());
        let mut formats: Vec<_> = stats.format_distribution.iter().collect();
        formats.sort();
        for (format, count) in formats {
            println!("  {}: {} ({:.1}%)", format.name().white(), count, (*count as f64 / total) * 100.0);
        }
    }

    if !stats.error_distribution.is_empty() {
        println!("\n{}:", "Error Distribution".dimmed());
        let mut errors: Vec<_> = stats.error_distribution.iter().collect();
        errors.sort();
        for (kind, count) in errors {
            println!("  {}: {}", kind.red(), count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::LineDispatcher;

    fn parsed(raw: &str) -> ParsedLine {
        LineDispatcher::new().dispatch(raw).line.unwrap()
    }

    #[test]
    fn test_ndjson_includes_fields_and_tags() {
        let line = parsed("2014-03-12T10:00:00+00:00 web1 nginx: host=a.com status=200 total=0.5");
        let formatter = OutputFormatter::new(OutputFormat::Ndjson);
        let mut out = Vec::new();
        formatter.write_line(&mut out, &line, true).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["format"], "nginx");
        assert_eq!(value["http_host"], "a.com");
        assert_eq!(value["host"], "web1");
        assert_eq!(value["tags"]["total"], 0.5);
    }

    #[test]
    fn test_csv_quotes_raw_line() {
        let line = parsed("2014-03-12T10:00:00+00:00 web1 nginx: ua=\"a, b\"");
        let formatter = OutputFormatter::new(OutputFormat::Csv).with_tags(false);
        let mut out = Vec::new();
        formatter.write_line(&mut out, &line, true).unwrap();

        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(out.as_slice());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[1], "web1");
        assert_eq!(&record[5], "nginx");
        assert_eq!(&record[8], "2014-03-12T10:00:00+00:00 web1 nginx: ua=\"a, b\"");
    }

    #[test]
    fn test_raw_output() {
        let raw = "2014-03-12T10:00:00+00:00 box cron: hello";
        let formatter = OutputFormatter::new(OutputFormat::Raw);
        let mut out = Vec::new();
        formatter.write_line(&mut out, &parsed(raw), true).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", raw));
    }

    #[test]
    fn test_summary_per_family() {
        assert_eq!(summary(&parsed("2014-03-12T10:00:00+00:00 box cron: a b")), "a b");
        let nginx = summary(&parsed("2014-03-12T10:00:00+00:00 web1 nginx: method=GET host=a.com uri=\"/x\" status=200"));
        assert!(nginx.starts_with("GET a.com/x 200"));
    }
}
