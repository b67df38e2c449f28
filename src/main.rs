use clap::Parser;
use stockpipe::cli::{execute_command, get_log_level, Cli};
use stockpipe::config::load_config;
use stockpipe::error::PipelineError;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins, then -v, then the configured level
    let directive = match std::env::var("RUST_LOG") {
        Ok(filter) if !filter.trim().is_empty() => filter,
        _ if cli.verbose > 0 => get_log_level(cli.verbose).to_string(),
        _ => load_config(cli.config.as_deref())
            .ok()
            .and_then(|config| config.log_level)
            .unwrap_or_else(|| get_log_level(0).to_string()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(cli.verbose >= 3) // Show thread IDs for -vvv
        .with_line_number(cli.verbose >= 3) // Show line numbers for -vvv
        .init();

    debug!("stockpipe started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = execute_command(cli).await {
        error!("Fatal error: {:#}", e);
        let exit_code = match e.downcast_ref::<PipelineError>() {
            Some(err) => {
                eprintln!("Error: {}", err.user_message());
                err.exit_code()
            }
            None => {
                eprintln!("Error: {e:#}");
                1
            }
        };
        std::process::exit(exit_code);
    }
}
