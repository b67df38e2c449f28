//! `stockpipe list ...` and `stockpipe status`

use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use crate::config::load_config;
use crate::orchestration::{MetadataValue, RunLog};
use crate::pipeline::build_definitions;

pub fn list_assets(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let definitions = build_definitions(&config)?;

    for spec in definitions.asset_specs() {
        println!("{}", spec.key);
        if let Some(kind) = &spec.compute_kind {
            println!("  kind:  {}", kind);
        }
        if let Some(group) = &spec.group {
            println!("  group: {}", group);
        }
        for dep in &spec.deps {
            println!("  deps:  {}", dep);
        }
    }
    Ok(())
}

pub fn list_jobs(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let definitions = build_definitions(&config)?;

    for job in definitions.jobs() {
        println!("{}", job.name);
        if let Some(description) = &job.description {
            println!("  {}", description);
        }
        if let Some(partitions) = &job.partitions {
            println!(
                "  partitions: daily from {} ({})",
                partitions.format_key(partitions.start()),
                partitions.timezone()
            );
        }
        let order = definitions
            .graph()
            .topological_order(&definitions.resolve_selection(job))?;
        for key in order {
            println!("  - {}", key);
        }
    }
    Ok(())
}

pub fn list_schedules(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let definitions = build_definitions(&config)?;
    let now = Utc::now();

    for schedule in definitions.schedules() {
        let state = if schedule.enabled { "enabled" } else { "disabled" };
        println!(
            "{} -> {} [{} {}] {}",
            schedule.name,
            schedule.job_name,
            schedule.cron_schedule(),
            schedule.timezone,
            state
        );
        if schedule.enabled {
            let tick = schedule.next_tick(now)?;
            println!("  next tick: {}", tick.with_timezone(&schedule.timezone));
        }
    }
    Ok(())
}

pub fn list_partitions(config_path: Option<&Path>, job: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let definitions = build_definitions(&config)?;
    let job = definitions.job(job)?;

    match &job.partitions {
        Some(partitions) => {
            let keys = partitions.partition_keys(Utc::now());
            println!("{} partitions of {}", keys.len(), job.name);
            for key in keys {
                println!("{}", key);
            }
        }
        None => println!("{} is not partitioned", job.name),
    }
    Ok(())
}

pub fn show_status(config_path: Option<&Path>, partition: Option<&str>, runs: usize) -> Result<()> {
    let config = load_config(config_path)?;
    let run_log = RunLog::load(config.home_dir())?;

    let records = match partition {
        Some(partition) => run_log.for_partition(partition),
        None => run_log.all(),
    };
    if records.is_empty() {
        println!("No materializations recorded");
    }
    for record in records {
        println!(
            "{} [{}] at {} (run {})",
            record.asset_key,
            record.partition_key,
            record.materialized_at.format("%Y-%m-%d %H:%M:%S UTC"),
            record.run_id
        );
        for (key, value) in &record.metadata {
            // Previews are multi-line tables
            if !matches!(value, MetadataValue::Markdown(_)) {
                println!("  {}: {}", key, value);
            }
        }
    }

    let recent: Vec<_> = run_log.runs().iter().rev().take(runs).collect();
    if !recent.is_empty() {
        println!("\nRecent runs:");
        for report in recent {
            println!(
                "  {} {} [{}] {:?} at {}",
                report.run_id,
                report.job_name,
                report.partition_key,
                report.status,
                report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }
    Ok(())
}
