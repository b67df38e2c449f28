//! CLI command handlers
//!
//! Argument parsing lives in `args`, dispatch in `router`, and the work of each
//! subcommand in `commands`.

pub mod args;
pub mod commands;
pub mod help;
pub mod router;

pub use args::{Cli, Commands};
pub use help::get_log_level;
pub use router::execute_command;
