//! Command routing

use anyhow::Result;

use crate::cli::args::{Cli, Commands, ConfigCommands, ListCommands};
use crate::cli::commands::*;

/// Execute a parsed command line
pub async fn execute_command(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Crawl { symbol, output } => run_crawl(config, symbol, output).await,
        Commands::Materialize {
            job,
            partition,
            assets,
        } => run_materialize(config, &job, partition.as_deref(), &assets).await,
        Commands::Schedule => run_schedule(config).await,
        Commands::List { what } => match what {
            ListCommands::Assets => list_assets(config),
            ListCommands::Jobs => list_jobs(config),
            ListCommands::Schedules => list_schedules(config),
            ListCommands::Partitions { job } => list_partitions(config, &job),
        },
        Commands::Status { partition, runs } => show_status(config, partition.as_deref(), runs),
        Commands::Config { command } => match command {
            ConfigCommands::Check => run_config_check(config),
            ConfigCommands::Show => run_config_show(config),
        },
    }
}
