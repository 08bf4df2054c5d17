use crate::dispatcher::{DispatchConfig, LineDispatcher};
use crate::parse_result::ParseResult;
use crate::statistics::ParsingStatistics;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use std::thread;

/// Configuration for parallel processing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Number of worker threads to use (0 = auto-detect)
    pub num_threads: usize,
    /// Lines handed to rayon per chunk
    pub batch_size: usize,
    /// Buffer size for reading from streams
    pub buffer_size: usize,
    /// Maximum number of items in the producer/consumer queues
    pub queue_capacity: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            batch_size: 1000,
            buffer_size: 64 * 1024, // 64KB
            queue_capacity: 10000,
        }
    }
}

/// A line and its 1-based position in the source
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub line: String,
    pub line_number: usize,
}

/// Results of one parallel run, in input order
#[derive(Debug)]
pub struct ParallelResult {
    pub results: Vec<ParseResult>,
    pub statistics: ParsingStatistics,
}

/// Parses independent lines on many threads.
///
/// Records share no state, so the only coordination is collecting results
/// and statistics.
pub struct ParallelParser {
    config: ParallelConfig,
    dispatcher: Arc<LineDispatcher>,
    pool: Option<rayon::ThreadPool>,
    global_statistics: Arc<Mutex<ParsingStatistics>>,
}

impl ParallelParser {
    pub fn new() -> Self {
        Self::with_dispatch_config(DispatchConfig::default())
    }

    pub fn with_config(config: ParallelConfig) -> Self {
        Self::with_dispatch_config(DispatchConfig {
            parallel_config: config,
            ..Default::default()
        })
    }

    /// Parallel parser dispatching with `dispatch_config`
    pub fn with_dispatch_config(dispatch_config: DispatchConfig) -> Self {
        let config = dispatch_config.parallel_config.clone();
        let pool = if config.num_threads > 0 {
            match rayon::ThreadPoolBuilder::new().num_threads(config.num_threads).build() {
                Ok(pool) => Some(pool),
                Err(error) => {
                    tracing::warn!(%error, "falling back to the global rayon pool");
                    None
                }
            }
        } else {
            None
        };

        let dispatcher = LineDispatcher::with_config(DispatchConfig {
            enable_statistics: false,
            ..dispatch_config
        });

        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            pool,
            global_statistics: Arc::new(Mutex::new(ParsingStatistics::new())),
        }
    }

    fn worker_count(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None if self.config.num_threads > 0 => self.config.num_threads,
            None => rayon::current_num_threads(),
        }
    }

    fn install<T: Send>(&self, op: impl FnOnce() -> T + Send) -> T {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Parse lines with rayon, preserving input order; line numbers count
    /// from 1 over `lines`
    pub fn parse_lines_parallel(&self, lines: Vec<String>) -> ParallelResult {
        let items = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| WorkItem { line, line_number: i + 1 })
            .collect();
        self.parse_items_parallel(items)
    }

    /// Parse pre-numbered lines with rayon, keeping each item's line number
    pub fn parse_items_parallel(&self, items: Vec<WorkItem>) -> ParallelResult {
        let dispatcher = &self.dispatcher;
        let batch_size = self.config.batch_size.max(1);

        let results: Vec<ParseResult> = self.install(|| {
            items
                .par_iter()
                .with_min_len(batch_size)
                .map(|item| dispatcher.dispatch(&item.line).with_line_number(item.line_number))
                .collect()
        });

        self.finish(results)
    }

    /// Parse multiple independent streams concurrently
    pub fn parse_streams_parallel<R: Read + Send>(
        &self,
        streams: Vec<(R, String)>,
    ) -> Result<Vec<ParallelResult>, std::io::Error> {
        self.install(|| {
            streams
                .into_par_iter()
                .map(|(reader, source)| self.parse_single_stream(reader, &source))
                .collect()
        })
    }

    fn parse_single_stream<R: Read>(&self, reader: R, source: &str) -> Result<ParallelResult, std::io::Error> {
        let buf_reader = BufReader::with_capacity(self.config.buffer_size, reader);
        let mut results = Vec::new();

        for (i, line) in buf_reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            results.push(self.dispatcher.dispatch(&line).with_line_number(i + 1));
        }

        tracing::debug!(source, lines = results.len(), "stream parsed");
        Ok(self.finish(results))
    }

    /// Parse lines through bounded crossbeam queues and dedicated worker
    /// threads; results come back in input order
    pub fn parse_lines_producer_consumer(&self, lines: Vec<String>) -> ParallelResult {
        let (work_sender, work_receiver): (Sender<WorkItem>, Receiver<WorkItem>) =
            bounded(self.config.queue_capacity.max(1));
        let (result_sender, result_receiver): (Sender<ParseResult>, Receiver<ParseResult>) =
            bounded(self.config.queue_capacity.max(1));

        let results = thread::scope(|scope| {
            scope.spawn(move || {
                for (i, line) in lines.into_iter().enumerate() {
                    let work_item = WorkItem { line, line_number: i + 1 };
                    if work_sender.send(work_item).is_err() {
                        break;
                    }
                }
            });

            for _ in 0..self.worker_count() {
                let work_recv = work_receiver.clone();
                let result_send = result_sender.clone();
                let dispatcher = &self.dispatcher;
                scope.spawn(move || {
                    while let Ok(work_item) = work_recv.recv() {
                        let result = dispatcher.dispatch(&work_item.line).with_line_number(work_item.line_number);
                        if result_send.send(result).is_err() {
                            break;
                        }
                    }
                });
            }

            // Workers hold the remaining handles; the collector ends when they finish
            drop(work_receiver);
            drop(result_sender);

            let mut results: Vec<ParseResult> = result_receiver.iter().collect();
            results.sort_by_key(|result| result.line_number);
            results
        });

        self.finish(results)
    }

    fn finish(&self, results: Vec<ParseResult>) -> ParallelResult {
        let statistics = aggregate_statistics(&results);
        self.global_statistics.lock().merge(&statistics);
        ParallelResult { results, statistics }
    }

    /// Statistics accumulated over every run of this parser
    pub fn get_global_statistics(&self) -> ParsingStatistics {
        self.global_statistics.lock().clone()
    }

    pub fn get_config(&self) -> &ParallelConfig {
        &self.config
    }
}

impl Default for ParallelParser {
    fn default() -> Self {
        Self::new()
    }
}

fn aggregate_statistics(results: &[ParseResult]) -> ParsingStatistics {
    let mut stats = ParsingStatistics::new();
    for result in results {
        let processing_time = result.processing_time_micros.unwrap_or(0);
        match (result.format(), &result.error) {
            (Some(format), _) => stats.record_success(format, processing_time),
            (None, Some(error)) => stats.record_failure(error, processing_time),
            (None, None) => {}
        }
    }
    stats
}
