use crate::cli::TagsArgs;
use crate::commands::parse::{expand_globs, open_input, source_name, RecordFilter};
use crate::dispatcher::{DispatchConfig, LineDispatcher};
use crate::parse_result::ParsedLine;
use colored::*;
use std::io::{stdout, Write};

/// Text printed for one line, or `None` when the line has nothing to show
pub fn render_tags(line: &ParsedLine, key: Option<&str>, json: bool) -> Result<Option<String>, serde_json::Error> {
    let tags = line.tags();
    match key {
        Some(key) => {
            let Some(value) = tags.get(key) else {
                return Ok(None);
            };
            if json {
                serde_json::to_string(value).map(Some)
            } else {
                Ok(Some(value.to_string()))
            }
        }
        None if tags.is_empty() => Ok(None),
        None if json => serde_json::to_string(tags).map(Some),
        None => Ok(Some(
            tags.iter()
                .map(|(k, v)| format!("{}={}", k.yellow(), v))
                .collect::<Vec<_>>()
                .join(" "),
        )),
    }
}

pub fn run_tags(args: TagsArgs, config: DispatchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut dispatcher = LineDispatcher::with_config(config);
    let filter = RecordFilter::from_args(&args.filters);

    let files = expand_globs(&args.files)?;
    if files.is_empty() {
        eprintln!("No files matched the given patterns");
        return Ok(());
    }

    let mut out = stdout().lock();
    for file_path in &files {
        let source = source_name(file_path, dispatcher.get_config());
        let results = dispatcher.parse_reader(open_input(file_path)?, &source)?;
        for line in results.iter().filter_map(|result| result.line.as_ref()) {
            if !filter.matches(line) {
                continue;
            }
            if let Some(text) = render_tags(line, args.key.as_deref(), args.json)? {
                writeln!(out, "{}", text)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(raw: &str) -> ParsedLine {
        LineDispatcher::new().dispatch(raw).line.unwrap()
    }

    #[test]
    fn test_render_single_key() {
        let line = parsed("2014-03-12T10:00:00+00:00 app1 unicorn: status=200 path=\"/a b\"");
        assert_eq!(render_tags(&line, Some("status"), false).unwrap().as_deref(), Some("200"));
        assert_eq!(render_tags(&line, Some("path"), true).unwrap().as_deref(), Some("\"/a b\""));
        assert_eq!(render_tags(&line, Some("missing"), false).unwrap(), None);
    }

    #[test]
    fn test_render_all_as_json() {
        let line = parsed("2014-03-12T10:00:00+00:00 app1 unicorn: b=1.5 a=x");
        let json = render_tags(&line, None, true).unwrap().unwrap();
        assert_eq!(json, r#"{"a":"x","b":1.5}"#);
    }

    #[test]
    fn test_render_nothing_without_tags() {
        let line = parsed("2014-03-12T10:00:00+00:00 app1 cron: hello");
        assert_eq!(render_tags(&line, None, false).unwrap(), None);
    }
}
