use clap::Parser;
use syslines::cli::{Cli, Commands};
use syslines::commands::{load_dispatch_config, run_parse, run_stats, run_tags, run_tail};
use syslines::logging::init_logging;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level, cli.log_format) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let result = load_dispatch_config(cli.config.as_deref(), cli.parallel).and_then(|config| match cli.command {
        Commands::Parse(args) => run_parse(args, config),
        Commands::Stats(args) => run_stats(args, config),
        Commands::Tags(args) => run_tags(args, config),
        Commands::Tail(args) => run_tail(args, config),
    });

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
