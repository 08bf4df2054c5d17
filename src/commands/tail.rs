use crate::cli::TailArgs;
use crate::commands::output::OutputFormatter;
use crate::commands::parse::RecordFilter;
use crate::dispatcher::{DispatchConfig, LineDispatcher};
use std::fs::File;
use std::io::{stdout, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const CHUNK_SIZE: u64 = 8192;

pub fn run_tail(args: TailArgs, config: DispatchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = LineDispatcher::with_config(config);
    let formatter = OutputFormatter::new(args.output);
    let filter = RecordFilter::from_args(&args.filters);
    let mut out = stdout();

    let emit = |raw: &str, out: &mut std::io::Stdout| -> std::io::Result<()> {
        let result = dispatcher.dispatch(raw);
        match result.line {
            Some(ref line) if filter.matches(line) => {
                // Each record stands alone while tailing
                formatter.write_line(out, line, true)?;
                out.flush()
            }
            Some(_) => Ok(()),
            None => {
                if let Some(description) = result.detailed_error_description() {
                    tracing::debug!(error = %description, "skipping line");
                }
                Ok(())
            }
        }
    };

    let mut file = File::open(&args.file)?;
    for line in read_last_n_lines(&mut file, args.lines)? {
        emit(&line, &mut out)?;
    }

    if !args.follow {
        return Ok(());
    }

    tracing::info!(file = %args.file.display(), "following");
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::End(0))?;

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => thread::sleep(POLL_INTERVAL),
            Ok(_) => {
                let line = line.trim_end();
                if !line.is_empty() {
                    emit(line, &mut out)?;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "error reading file");
                return Err(e.into());
            }
        }
    }
}

/// Last `n` non-empty lines of a file, read backwards in chunks
pub fn read_last_n_lines(file: &mut File, n: usize) -> Result<Vec<String>, std::io::Error> {
    let file_size = file.metadata()?.len();
    if file_size == 0 || n == 0 {
        return Ok(Vec::new());
    }

    let mut lines: Vec<String> = Vec::new();
    let mut buffer = Vec::new();
    let mut pos = file_size;

    // One extra line is needed since the first one in the buffer may be partial
    while lines.len() <= n && pos > 0 {
        let read_size = CHUNK_SIZE.min(pos);
        pos -= read_size;
        file.seek(SeekFrom::Start(pos))?;

        let mut chunk = vec![0u8; read_size as usize];
        file.read_exact(&mut chunk)?;
        chunk.append(&mut buffer);
        buffer = chunk;

        lines = String::from_utf8_lossy(&buffer)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
    }

    let start = lines.len().saturating_sub(n);
    Ok(lines.split_off(start))
}
