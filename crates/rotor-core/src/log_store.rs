//! Deployment log persistence and retention pruning.
//!
//! The durable log and the transient buffer are both JSON arrays of
//! [`DeploymentRecord`], oldest first. The durable log is the only state
//! shared across runs; the transient buffer holds the records produced by
//! the current run's deployment step until the orchestrator folds them in.
//!
//! Read-side failures degrade: an absent file is the expected first-run
//! state and an unparseable file is logged and treated as empty, so a
//! corrupt log can never stop scheduling. Write-side failures surface as
//! [`RotorError::Persistence`] — losing the ability to record history
//! corrupts every future scheduling decision.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use tracing::{debug, error};

use crate::domain::{DeploymentRecord, Result, RotorError};

/// Result of a retention pruning pass.
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    /// Records still within the retention window, order preserved.
    pub kept: Vec<DeploymentRecord>,

    /// Number of records removed.
    pub removed: usize,
}

/// File-backed store for the durable deployment log and transient buffer.
#[derive(Debug, Clone)]
pub struct DeploymentLogStore {
    log_path: PathBuf,
    transient_path: PathBuf,
}

impl DeploymentLogStore {
    pub fn new(log_path: impl Into<PathBuf>, transient_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            transient_path: transient_path.into(),
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn transient_path(&self) -> &Path {
        &self.transient_path
    }

    /// Load the durable deployment log.
    pub fn load(&self) -> Result<Vec<DeploymentRecord>> {
        read_records(&self.log_path)
    }

    /// Drop records older than `retention` (and records without a
    /// timestamp), persist the result, and report how many were removed.
    pub fn prune(
        &self,
        log: Vec<DeploymentRecord>,
        retention: Duration,
    ) -> Result<PruneOutcome> {
        let cutoff = Utc::now() - retention;
        let before = log.len();

        let kept: Vec<DeploymentRecord> = log
            .into_iter()
            .filter(|record| matches!(record.timestamp, Some(ts) if ts > cutoff))
            .collect();

        let removed = before - kept.len();
        self.persist(&self.log_path, &kept)?;

        debug!(removed, kept = kept.len(), "pruned deployment log");
        Ok(PruneOutcome { kept, removed })
    }

    /// Append `new_records` to `log`, order preserved (oldest first), and
    /// persist the result. An empty `new_records` leaves the log untouched.
    pub fn append(
        &self,
        mut log: Vec<DeploymentRecord>,
        new_records: &[DeploymentRecord],
    ) -> Result<Vec<DeploymentRecord>> {
        if new_records.is_empty() {
            return Ok(log);
        }
        log.extend_from_slice(new_records);
        self.persist(&self.log_path, &log)?;
        Ok(log)
    }

    /// Load the transient buffer written by the external deployer.
    pub fn load_transient(&self) -> Result<Vec<DeploymentRecord>> {
        read_records(&self.transient_path)
    }

    /// Reset the transient buffer to an empty array.
    pub fn clear_transient(&self) -> Result<()> {
        self.persist(&self.transient_path, &[])
    }

    fn persist(&self, path: &Path, records: &[DeploymentRecord]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    RotorError::Persistence(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }
        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(path, json).map_err(|e| {
            RotorError::Persistence(format!("cannot write {}: {}", path.display(), e))
        })
    }
}

/// Read a record array, degrading to empty on absence or corruption.
fn read_records(path: &Path) -> Result<Vec<DeploymentRecord>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RotorError::Io(e)),
    };

    match serde_json::from_str::<Vec<DeploymentRecord>>(&content) {
        Ok(records) => Ok(records),
        Err(e) => {
            error!(
                path = %path.display(),
                error = %e,
                "deployment log is not a record array, treating as empty"
            );
            Ok(Vec::new())
        }
    }
}
