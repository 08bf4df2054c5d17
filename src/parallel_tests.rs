use crate::dispatcher::{DispatchConfig, LineDispatcher};
use crate::envelope::SyslogLine;
use crate::models::{LineFormat, TagValue};
use crate::parallel_parser::{ParallelConfig, ParallelParser};
use crate::parse_result::ParsedLine;
use std::io::Cursor;
use std::sync::Arc;
use std::thread;

fn sample_lines(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| match i % 4 {
            0 => format!(
                "2014-03-12T10:00:{:02}.000001+00:00 web1 nginx: host=h{}.com status=200 length={}",
                i % 60,
                i,
                i
            ),
            1 => format!(
                "2014-03-12T10:00:{:02}+00:00 lb1 haproxy[9]: 10.0.0.1:1 [x] fe be/h:i:c {}/1/2/3/4 200 10 - - ---- 1/1/1/1/0 0/0 \"GET /{} HTTP/1.1\"",
                i % 60,
                i,
                i
            ),
            2 => format!("2014-03-12T10:00:{:02}+00:00 app1 unicorn: n={}", i % 60, i),
            _ => format!("not-a-time host{} tag", i),
        })
        .collect()
}

/// Test rayon batch parsing keeps input order and counts every line
#[test]
fn test_parse_lines_parallel_preserves_order() {
    let parser = ParallelParser::with_config(ParallelConfig {
        num_threads: 4,
        batch_size: 8,
        ..Default::default()
    });
    let lines = sample_lines(200);
    let result = parser.parse_lines_parallel(lines.clone());

    assert_eq!(result.results.len(), 200);
    for (i, parsed) in result.results.iter().enumerate() {
        assert_eq!(parsed.line_number, Some(i + 1));
        assert_eq!(parsed.raw, lines[i]);
    }

    let stats = &result.statistics;
    assert_eq!(stats.total_lines, 200);
    assert_eq!(stats.failed_parses, 50);
    assert_eq!(stats.format_distribution[&LineFormat::Nginx], 50);
    assert_eq!(stats.format_distribution[&LineFormat::HAProxy], 50);
    assert_eq!(stats.format_distribution[&LineFormat::Unicorn], 50);
}

/// Test the parallel path produces the same records as the sequential one
#[test]
fn test_parallel_matches_sequential() {
    let lines = sample_lines(40);
    let parallel = ParallelParser::new().parse_lines_parallel(lines.clone());
    let mut dispatcher = LineDispatcher::new();
    let sequential = dispatcher.parse_lines(lines);

    for (a, b) in parallel.results.iter().zip(&sequential) {
        assert_eq!(a.success, b.success);
        assert_eq!(a.format(), b.format());
        assert_eq!(a.error, b.error);
        let a_json = a.line.as_ref().map(|l| serde_json::to_value(l).unwrap());
        let b_json = b.line.as_ref().map(|l| serde_json::to_value(l).unwrap());
        assert_eq!(a_json, b_json);
    }
}

/// Test producer/consumer workers return every line in order
#[test]
fn test_producer_consumer() {
    let parser = ParallelParser::with_config(ParallelConfig {
        num_threads: 3,
        queue_capacity: 4,
        ..Default::default()
    });
    let result = parser.parse_lines_producer_consumer(sample_lines(100));

    assert_eq!(result.results.len(), 100);
    assert!(result
        .results
        .windows(2)
        .all(|pair| pair[0].line_number < pair[1].line_number));
    match &result.results[1].line {
        Some(ParsedLine::HAProxy(line)) => assert_eq!(line.client_request_time, 1),
        other => panic!("expected haproxy line, got {:?}", other),
    }
}

/// Test concurrent parsing of multiple streams
#[test]
fn test_parse_streams_parallel() {
    let parser = ParallelParser::new();
    let streams = vec![
        (Cursor::new(sample_lines(12).join("\n")), "a.log".to_string()),
        (Cursor::new(sample_lines(8).join("\n")), "b.log".to_string()),
    ];
    let results = parser.parse_streams_parallel(streams).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].results.len(), 12);
    assert_eq!(results[1].results.len(), 8);
    assert_eq!(parser.get_global_statistics().total_lines, 20);
}

/// Test dispatch config flows into the parallel dispatcher
#[test]
fn test_parallel_respects_enabled_formats() {
    let parser = ParallelParser::with_dispatch_config(DispatchConfig {
        formats: vec![LineFormat::Unicorn],
        ..Default::default()
    });
    let result = parser.parse_lines_parallel(sample_lines(4));
    assert_eq!(result.results[0].format(), Some(LineFormat::Syslog));
    assert_eq!(result.results[2].format(), Some(LineFormat::Unicorn));
}

/// Test first access to the memoized tag map from many threads at once
#[test]
fn test_concurrent_first_tag_access() {
    let line = Arc::new(
        SyslogLine::from_line("2014-03-12T10:00:00+00:00 app1 unicorn: user=alice db=0.5/3").unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let line = Arc::clone(&line);
            thread::spawn(move || line.tag_value("db_calls").cloned())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(TagValue::Int(3)));
    }
    assert_eq!(line.tags().len(), 3);
}
