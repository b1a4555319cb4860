//! One scheduling cycle, start to finish.
//!
//! The orchestrator is the only component that performs I/O sequencing and
//! external delegation. Steps run in strict order with no internal
//! concurrency: prune, decide, deploy, publish, fold, clear. Idempotence
//! across runs comes purely from the persisted log state.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::deployer::ContractDeployer;
use crate::domain::{ContractCatalog, Result};
use crate::log_store::DeploymentLogStore;
use crate::policy;
use crate::release::ReleasePublisher;

/// Scheduling parameters for a cycle.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Maximum allowed gap between consecutive scheduled-class deployments.
    pub mandatory_interval: Duration,

    /// Age threshold beyond which history records are pruned.
    pub retention: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            mandatory_interval: Duration::hours(12),
            retention: Duration::hours(48),
        }
    }
}

/// What happened to the release-publication step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseStatus {
    /// Release created and asset attached.
    Published { tag: String },

    /// No publisher configured for this cycle.
    Skipped,

    /// Publication failed; the deployment is still recorded in history.
    Failed { reason: String },
}

/// Report of one completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// The contract the policy selected and the deployer deployed.
    pub log_name: String,

    /// Records removed by retention pruning.
    pub pruned: usize,

    /// Records folded from the transient buffer into the durable log.
    pub folded: usize,

    /// Wall-clock duration of the whole cycle.
    pub duration_ms: u64,

    /// Outcome of the publication step.
    pub release: ReleaseStatus,
}

/// Sequences one scheduling cycle to completion.
pub struct DeploymentCycle {
    store: DeploymentLogStore,
    catalog: ContractCatalog,
    config: CycleConfig,
    deployer: Arc<dyn ContractDeployer>,
    publisher: Option<Arc<dyn ReleasePublisher>>,
}

impl DeploymentCycle {
    pub fn new(
        store: DeploymentLogStore,
        catalog: ContractCatalog,
        config: CycleConfig,
        deployer: Arc<dyn ContractDeployer>,
        publisher: Option<Arc<dyn ReleasePublisher>>,
    ) -> Self {
        Self {
            store,
            catalog,
            config,
            deployer,
            publisher,
        }
    }

    /// Run one cycle.
    ///
    /// Deployment and configuration failures are fatal and propagate; a
    /// publication failure is surfaced in the report but never prevents
    /// the history fold — a successful on-chain deployment must not be
    /// lost because a downstream notification failed.
    pub async fn run(&self) -> Result<CycleReport> {
        let start = Instant::now();

        // 1. Prune first, unconditionally, to bound log growth regardless
        //    of what happens next.
        let log = self.store.load()?;
        let outcome = self.store.prune(log, self.config.retention)?;
        let (history, pruned) = (outcome.kept, outcome.removed);

        // 2. Decide. Configuration errors abort before any deployment.
        let log_name = policy::next_deployment(
            &self.catalog,
            &history,
            Utc::now(),
            self.config.mandatory_interval,
            &mut rand::thread_rng(),
        )?;
        info!(log_name = %log_name, pruned, history = history.len(), "scheduling decision made");

        // 3. Delegate deployment; fatal on failure, no retry, no log mutation.
        let deploy = self.deployer.deploy(&log_name).await?;

        // 4. Publish from the transient record BEFORE folding: the
        //    publication step needs the fresh record's detail and must not
        //    be the fold's job.
        let release = match (&self.publisher, deploy.records.first()) {
            (Some(publisher), Some(record)) => match publisher.publish(record).await {
                Ok(published) => ReleaseStatus::Published { tag: published.tag },
                Err(e) => {
                    warn!(error = %e, "release publication failed, folding history anyway");
                    ReleaseStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            },
            _ => ReleaseStatus::Skipped,
        };

        // 5. Fold the transient buffer into the durable log, then clear it.
        let folded = deploy.records.len();
        self.store.append(history, &deploy.records)?;
        self.store.clear_transient()?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(log_name = %log_name, folded, duration_ms, "deployment cycle completed");

        Ok(CycleReport {
            log_name,
            pruned,
            folded,
            duration_ms,
            release,
        })
    }

    /// Compute the decision the next `run` would make, without deploying,
    /// pruning, or touching any persisted state.
    pub fn preview(&self) -> Result<String> {
        let now = Utc::now();
        let cutoff = now - self.config.retention;
        let history: Vec<_> = self
            .store
            .load()?
            .into_iter()
            .filter(|r| matches!(r.timestamp, Some(ts) if ts > cutoff))
            .collect();

        policy::next_deployment(
            &self.catalog,
            &history,
            now,
            self.config.mandatory_interval,
            &mut rand::thread_rng(),
        )
    }
}
