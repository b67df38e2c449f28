//! Log level selection for the CLI

/// Env-filter directive for a `-v` count
pub fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        2 => "trace",
        _ => "trace,hyper=debug,tower=debug,h2=debug", // -vvv shows everything including dependencies
    }
}
