//! The registry of everything the pipeline can run

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::warn;

use super::asset::{Asset, AssetKey, AssetSpec};
use super::graph::AssetGraph;
use super::job::AssetJob;
use super::schedule::ScheduleDefinition;
use crate::error::{ErrorCode, PipelineError, Result};
use crate::pipeline::Resources;

/// Assets, jobs, schedules and the resources they run against
pub struct Definitions {
    assets: BTreeMap<AssetKey, Arc<dyn Asset>>,
    graph: AssetGraph,
    jobs: BTreeMap<String, AssetJob>,
    schedules: BTreeMap<String, ScheduleDefinition>,
    resources: Option<Arc<Resources>>,
}

impl Definitions {
    pub fn new(
        assets: Vec<Arc<dyn Asset>>,
        jobs: Vec<AssetJob>,
        schedules: Vec<ScheduleDefinition>,
    ) -> Result<Self> {
        let graph = AssetGraph::new(assets.iter().map(|a| a.spec()))?;
        let assets: BTreeMap<AssetKey, Arc<dyn Asset>> = assets
            .into_iter()
            .map(|asset| (asset.spec().key.clone(), asset))
            .collect();

        let mut job_map = BTreeMap::new();
        for job in jobs {
            let selected = job.selection.resolve(assets.values().map(|a| a.spec()));
            if selected.is_empty() {
                warn!("Job '{}' selects no assets", job.name);
            }
            if let Some(previous) = job_map.insert(job.name.clone(), job) {
                return Err(duplicate("job", &previous.name));
            }
        }

        let mut schedule_map = BTreeMap::new();
        for schedule in schedules {
            if !job_map.contains_key(&schedule.job_name) {
                return Err(PipelineError::orchestration_with_code(
                    ErrorCode::ORCH_JOB_NOT_FOUND,
                    format!(
                        "schedule '{}' targets unknown job '{}'",
                        schedule.name, schedule.job_name
                    ),
                ));
            }
            if let Some(previous) = schedule_map.insert(schedule.name.clone(), schedule) {
                return Err(duplicate("schedule", &previous.name));
            }
        }

        Ok(Self {
            assets,
            graph,
            jobs: job_map,
            schedules: schedule_map,
            resources: None,
        })
    }

    pub fn with_resources(mut self, resources: Arc<Resources>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn graph(&self) -> &AssetGraph {
        &self.graph
    }

    pub fn asset_specs(&self) -> impl Iterator<Item = &AssetSpec> {
        self.assets.values().map(|a| a.spec())
    }

    pub fn asset(&self, key: &AssetKey) -> Result<Arc<dyn Asset>> {
        self.assets.get(key).cloned().ok_or_else(|| {
            PipelineError::orchestration_with_code(
                ErrorCode::ORCH_ASSET_NOT_FOUND,
                format!("asset '{}' is not defined", key),
            )
        })
    }

    pub fn jobs(&self) -> impl Iterator<Item = &AssetJob> {
        self.jobs.values()
    }

    pub fn job(&self, name: &str) -> Result<&AssetJob> {
        self.jobs.get(name).ok_or_else(|| {
            PipelineError::orchestration_with_code(
                ErrorCode::ORCH_JOB_NOT_FOUND,
                format!(
                    "job '{}' is not defined (known: {})",
                    name,
                    self.jobs.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            )
        })
    }

    pub fn schedules(&self) -> impl Iterator<Item = &ScheduleDefinition> {
        self.schedules.values()
    }

    pub fn schedule(&self, name: &str) -> Option<&ScheduleDefinition> {
        self.schedules.get(name)
    }

    /// Resources are attached separately so definitions can be listed without credentials.
    pub fn resources(&self) -> Result<Arc<Resources>> {
        self.resources.clone().ok_or_else(|| {
            PipelineError::orchestration("no resources are attached to these definitions")
        })
    }

    /// Keys of the assets a job selects
    pub fn resolve_selection(&self, job: &AssetJob) -> BTreeSet<AssetKey> {
        job.selection.resolve(self.asset_specs())
    }
}

fn duplicate(kind: &str, name: &str) -> PipelineError {
    PipelineError::orchestration_with_code(
        ErrorCode::ORCH_DUPLICATE_DEFINITION,
        format!("{} '{}' is defined twice", kind, name),
    )
}
