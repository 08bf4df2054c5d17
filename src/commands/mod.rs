pub mod output;
pub mod parse;
pub mod stats;
pub mod tags;
pub mod tail;

pub use parse::run_parse;
pub use stats::run_stats;
pub use tags::run_tags;
pub use tail::run_tail;

use crate::dispatcher::DispatchConfig;
use std::path::Path;

/// Dispatcher configuration from an optional JSON file, with the command
/// line thread count applied on top
pub fn load_dispatch_config(
    path: Option<&Path>,
    parallel: usize,
) -> Result<DispatchConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading dispatcher config");
            DispatchConfig::from_json_file(path)?
        }
        None => DispatchConfig::default(),
    };
    if parallel > 0 {
        config.parallel_config.num_threads = parallel;
    }
    Ok(config)
}
