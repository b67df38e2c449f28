//! Lock files serializing writers of local state shared between processes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::{StorageError, StorageResult};

/// Contents of a held lock file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process holding the lock
    pub pid: u32,
    pub token: String,
    pub acquired_at: DateTime<Utc>,
}

/// Exclusive lock on a path, released when dropped
#[derive(Debug)]
pub struct FileLock {
    info: LockInfo,
    lock_file: PathBuf,
}

impl FileLock {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    const RETRY_DELAY: Duration = Duration::from_millis(25);
    /// Lock files older than this belong to a crashed holder
    pub const STALE_AFTER: Duration = Duration::from_secs(120);

    /// Block until the lock is held or [`FileLock::DEFAULT_TIMEOUT`] passes
    pub fn acquire(lock_file: impl Into<PathBuf>) -> StorageResult<Self> {
        Self::acquire_with_timeout(lock_file, Self::DEFAULT_TIMEOUT)
    }

    pub fn acquire_with_timeout(
        lock_file: impl Into<PathBuf>,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let lock_file = lock_file.into();
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(lock) = Self::try_acquire(&lock_file)? {
                return Ok(lock);
            }
            if Instant::now() >= deadline {
                return Err(StorageError::Timeout(timeout));
            }
            Self::clear_stale(&lock_file);
            std::thread::sleep(Self::RETRY_DELAY);
        }
    }

    /// Take the lock if nobody holds it
    pub fn try_acquire(lock_file: &Path) -> StorageResult<Option<Self>> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_file)
        {
            Ok(mut file) => {
                let lock = Self {
                    info: LockInfo {
                        pid: std::process::id(),
                        token: Uuid::new_v4().to_string(),
                        acquired_at: Utc::now(),
                    },
                    lock_file: lock_file.to_path_buf(),
                };
                let contents = serde_json::to_string(&lock.info)
                    .map_err(|e| StorageError::lock(format!("cannot encode lock info: {}", e)))?;
                file.write_all(contents.as_bytes())?;
                debug!("Acquired lock {}", lock_file.display());
                Ok(Some(lock))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(StorageError::lock(format!(
                "cannot create {}: {}",
                lock_file.display(),
                e
            ))),
        }
    }

    fn clear_stale(lock_file: &Path) {
        let Ok(modified) = fs::metadata(lock_file).and_then(|m| m.modified()) else {
            return;
        };
        let age = modified.elapsed().unwrap_or_default();
        if age > Self::STALE_AFTER {
            warn!(
                "Removing stale lock {} held for {:?}",
                lock_file.display(),
                age
            );
            let _ = fs::remove_file(lock_file);
        }
    }

    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.lock_file
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_file) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to release lock {}: {}", self.lock_file.display(), e);
            }
        }
    }
}
