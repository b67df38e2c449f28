//! JSON persisted record of materializations and runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::asset::{AssetKey, MetadataValue};
use super::executor::RunReport;
use crate::error::{ErrorCode, PipelineError, Result};
use crate::storage::FileLock;

const RUN_LOG_FILE: &str = "runs.json";
const RUN_LOG_LOCK_FILE: &str = "runs.json.lock";

/// Oldest runs are dropped past this many
pub const MAX_RUN_HISTORY: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializationRecord {
    pub run_id: String,
    pub asset_key: AssetKey,
    pub partition_key: String,
    pub materialized_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLogState {
    /// asset key -> partition key -> latest materialization
    #[serde(default)]
    pub materializations: BTreeMap<String, BTreeMap<String, MaterializationRecord>>,
    #[serde(default)]
    pub runs: Vec<RunReport>,
}

/// Handle on `runs.json` under a home directory
///
/// Several processes may hold a handle at once (a scheduler daemon and a manual
/// `materialize`). Every write takes the lock file, re-reads the log and applies
/// its change to the fresh state, so records of other writers are kept.
pub struct RunLog {
    root: PathBuf,
    state: RunLogState,
}

impl RunLog {
    /// Open the log under `root`, creating the directory if needed.
    /// A corrupted log is backed up and replaced with an empty one.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            PipelineError::storage_with_code(
                ErrorCode::STORAGE_IO_ERROR,
                format!("cannot create run log directory {}", root.display()),
                None,
            )
            .with_source(e)
        })?;
        let state = {
            let _lock = FileLock::acquire(root.join(RUN_LOG_LOCK_FILE))?;
            Self::load_or_recover(&root)?
        };
        Ok(Self { root, state })
    }

    /// Read the log under `root` without creating or repairing anything
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let file = root.join(RUN_LOG_FILE);
        let state = match fs::read_to_string(&file) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                PipelineError::storage_with_code(
                    ErrorCode::STORAGE_CORRUPTED,
                    format!("run log {} is corrupted", file.display()),
                    None,
                )
                .with_source(e)
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => RunLogState::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { root, state })
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(RUN_LOG_FILE)
    }

    pub fn state(&self) -> &RunLogState {
        &self.state
    }

    /// Replace the record for `(asset, partition)` and persist
    pub fn record_materialization(
        &mut self,
        run_id: &str,
        asset_key: &AssetKey,
        partition_key: &str,
        metadata: BTreeMap<String, MetadataValue>,
    ) -> Result<()> {
        let record = MaterializationRecord {
            run_id: run_id.to_string(),
            asset_key: asset_key.clone(),
            partition_key: partition_key.to_string(),
            materialized_at: Utc::now(),
            metadata,
        };
        self.update(|state| {
            state
                .materializations
                .entry(record.asset_key.to_string())
                .or_default()
                .insert(record.partition_key.clone(), record);
        })
    }

    /// Append a finished run and persist
    pub fn record_run(&mut self, report: RunReport) -> Result<()> {
        self.update(|state| {
            state.runs.push(report);
            if state.runs.len() > MAX_RUN_HISTORY {
                let excess = state.runs.len() - MAX_RUN_HISTORY;
                state.runs.drain(..excess);
            }
        })
    }

    /// Apply `change` to the state on disk under the lock
    fn update<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut RunLogState),
    {
        let _lock = FileLock::acquire(self.root.join(RUN_LOG_LOCK_FILE))?;
        let mut state = Self::load_or_recover(&self.root)?;
        change(&mut state);
        self.save_state(&state)?;
        self.state = state;
        Ok(())
    }

    pub fn latest(&self, asset_key: &AssetKey, partition_key: &str) -> Option<&MaterializationRecord> {
        self.state
            .materializations
            .get(&asset_key.to_string())
            .and_then(|partitions| partitions.get(partition_key))
    }

    /// Every asset materialized for `partition_key`, ordered by asset key
    pub fn for_partition(&self, partition_key: &str) -> Vec<&MaterializationRecord> {
        self.state
            .materializations
            .values()
            .filter_map(|partitions| partitions.get(partition_key))
            .collect()
    }

    /// Every record, ordered by asset key then partition
    pub fn all(&self) -> Vec<&MaterializationRecord> {
        self.state
            .materializations
            .values()
            .flat_map(|partitions| partitions.values())
            .collect()
    }

    pub fn runs(&self) -> &[RunReport] {
        &self.state.runs
    }

    /// Write to a temp file, then rename over the log. Callers hold the lock.
    fn save_state(&self, state: &RunLogState) -> Result<()> {
        let temp_file = self.root.join(format!("{}.tmp", RUN_LOG_FILE));
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&temp_file, json)?;
        fs::rename(&temp_file, self.path())?;
        debug!("Saved run log to {}", self.path().display());
        Ok(())
    }

    fn load_or_recover(root: &Path) -> Result<RunLogState> {
        let file = root.join(RUN_LOG_FILE);
        let contents = match fs::read_to_string(&file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RunLogState::default()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(state) => Ok(state),
            Err(e) => {
                let backup = root.join(format!(
                    "{}.corrupted.{}",
                    RUN_LOG_FILE,
                    Utc::now().timestamp()
                ));
                fs::rename(&file, &backup)?;
                warn!(
                    "Run log corrupted ({}), backed up to {}",
                    e,
                    backup.display()
                );
                Ok(RunLogState::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::executor::RunStatus;
    use tempfile::TempDir;

    fn key() -> AssetKey {
        AssetKey::new(["alpha_vantage", "stock_price", "crawl"])
    }

    fn report(id: &str) -> RunReport {
        RunReport {
            run_id: id.to_string(),
            job_name: "daily".to_string(),
            partition_key: "2024-11-14".to_string(),
            status: RunStatus::Success,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            steps: vec![],
        }
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut log = RunLog::open(dir.path()).unwrap();
            let metadata = BTreeMap::from([("num_records".to_string(), MetadataValue::Int(390))]);
            log.record_materialization("r1", &key(), "2024-11-14", metadata).unwrap();
            log.record_run(report("r1")).unwrap();
        }

        let log = RunLog::open(dir.path()).unwrap();
        let record = log.latest(&key(), "2024-11-14").unwrap();
        assert_eq!(record.run_id, "r1");
        assert_eq!(record.metadata["num_records"], MetadataValue::Int(390));
        assert_eq!(log.runs().len(), 1);
        assert!(!dir.path().join("runs.json.tmp").exists());
    }

    #[test]
    fn test_rematerialization_replaces_entry() {
        let dir = TempDir::new().unwrap();
        let mut log = RunLog::open(dir.path()).unwrap();
        log.record_materialization("r1", &key(), "2024-11-14", BTreeMap::new()).unwrap();
        log.record_materialization("r2", &key(), "2024-11-14", BTreeMap::new()).unwrap();
        log.record_materialization("r3", &key(), "2024-11-13", BTreeMap::new()).unwrap();

        assert_eq!(log.latest(&key(), "2024-11-14").unwrap().run_id, "r2");
        assert_eq!(log.for_partition("2024-11-14").len(), 1);
        assert_eq!(log.all().len(), 2);
    }

    #[test]
    fn test_corrupted_log_is_backed_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("runs.json"), "{ not json").unwrap();

        let log = RunLog::open(dir.path()).unwrap();
        assert!(log.all().is_empty());

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("runs.json.corrupted."))
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_run_history_is_capped() {
        let dir = TempDir::new().unwrap();
        let mut log = RunLog::open(dir.path()).unwrap();
        log.update(|state| {
            for i in 0..MAX_RUN_HISTORY + 5 {
                state.runs.push(report(&format!("r{}", i)));
            }
        })
        .unwrap();
        log.record_run(report("last")).unwrap();
        assert_eq!(log.runs().len(), MAX_RUN_HISTORY);
        assert_eq!(log.runs().last().unwrap().run_id, "last");
        assert_eq!(log.runs()[0].run_id, "r6");
    }

    #[test]
    fn test_concurrent_handles_keep_each_others_records() {
        let dir = TempDir::new().unwrap();
        let mut manual = RunLog::open(dir.path()).unwrap();
        let mut daemon = RunLog::open(dir.path()).unwrap();

        manual
            .record_materialization("manual", &key(), "2024-11-10", BTreeMap::new())
            .unwrap();
        daemon
            .record_materialization("daemon", &key(), "2024-11-14", BTreeMap::new())
            .unwrap();
        manual.record_run(report("manual")).unwrap();
        daemon.record_run(report("daemon")).unwrap();

        let log = RunLog::open(dir.path()).unwrap();
        assert_eq!(log.latest(&key(), "2024-11-10").unwrap().run_id, "manual");
        assert_eq!(log.latest(&key(), "2024-11-14").unwrap().run_id, "daemon");
        let runs: Vec<&str> = log.runs().iter().map(|r| r.run_id.as_str()).collect();
        assert_eq!(runs, vec!["manual", "daemon"]);
        assert!(!dir.path().join(RUN_LOG_LOCK_FILE).exists());
    }

    #[test]
    fn test_writers_from_threads_are_all_kept() {
        let dir = TempDir::new().unwrap();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let root = dir.path().to_path_buf();
                std::thread::spawn(move || {
                    let mut log = RunLog::open(root).unwrap();
                    for day in 0..5 {
                        let partition = format!("2024-11-{:02}", 1 + i * 5 + day);
                        log.record_materialization("r", &key(), &partition, BTreeMap::new())
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(RunLog::load(dir.path()).unwrap().all().len(), 20);
    }

    #[test]
    fn test_load_is_read_only() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("home");
        let log = RunLog::load(&missing).unwrap();
        assert!(log.all().is_empty());
        assert!(!missing.exists());

        fs::write(dir.path().join("runs.json"), "{ not json").unwrap();
        let err = RunLog::load(dir.path()).err().unwrap();
        assert_eq!(err.code(), ErrorCode::STORAGE_CORRUPTED);
        assert_eq!(
            fs::read_to_string(dir.path().join("runs.json")).unwrap(),
            "{ not json"
        );
    }
}
