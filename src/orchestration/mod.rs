//! A small asset orchestration layer
//!
//! Assets declare their dependencies, jobs select assets, and schedules fire
//! daily-partitioned jobs. The executor runs a job's assets in dependency order
//! for one partition and records each materialization in the run log, so
//! re-running a partition replaces its records instead of adding to them.

pub mod asset;
pub mod context;
pub mod definitions;
pub mod executor;
pub mod graph;
pub mod job;
pub mod partitions;
pub mod run_log;
pub mod schedule;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use asset::{Asset, AssetKey, AssetSpec, MaterializeResult, MetadataValue};
pub use context::AssetExecutionContext;
pub use definitions::Definitions;
pub use executor::{JobExecutor, RunReport, RunStatus, StepReport, StepStatus};
pub use graph::AssetGraph;
pub use job::{define_asset_job, AssetJob, AssetSelection};
pub use partitions::DailyPartitionsDefinition;
pub use run_log::{MaterializationRecord, RunLog};
pub use schedule::{build_schedule_from_partitioned_job, ScheduleDefinition};
pub use scheduler::Scheduler;
