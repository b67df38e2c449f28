//! Command implementations

pub mod config;
pub mod crawl;
pub mod inspect;
pub mod run;

pub use config::{run_config_check, run_config_show};
pub use crawl::run_crawl;
pub use inspect::{list_assets, list_jobs, list_partitions, list_schedules, show_status};
pub use run::{run_materialize, run_schedule};
