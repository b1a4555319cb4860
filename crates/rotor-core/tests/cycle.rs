//! Integration tests for the deployment cycle with fake collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rotor_core::{
    BlockNumber, ContractCatalog, ContractCatalogEntry, ContractDeployer, CycleConfig,
    DeployOutcome, DeploymentCycle, DeploymentLogStore, DeploymentRecord, Interaction,
    PublishedRelease, ReleasePublisher, ReleaseStatus, Result, RotorError,
};

fn catalog() -> ContractCatalog {
    ContractCatalog {
        network: "testnet".to_string(),
        explorer_base_url: None,
        contracts: vec![
            ContractCatalogEntry {
                log_name: "A".to_string(),
                name: "A".to_string(),
                interactions: vec![],
            },
            ContractCatalogEntry {
                log_name: "B".to_string(),
                name: "B".to_string(),
                interactions: vec![Interaction::Scheduled],
            },
        ],
    }
}

fn record(log_name: &str) -> DeploymentRecord {
    DeploymentRecord {
        key: log_name.to_string(),
        log_name: log_name.to_string(),
        address: "0xabc0000000000000000000000000000000000001".to_string(),
        transaction_hash: "0xdeadbeef".to_string(),
        block_number: BlockNumber::Confirmed("100".to_string()),
        timestamp: Some(Utc::now()),
        constructor_args: None,
        explorer: None,
    }
}

fn store(dir: &tempfile::TempDir) -> DeploymentLogStore {
    DeploymentLogStore::new(
        dir.path().join("workflow.json"),
        dir.path().join("deployments.json"),
    )
}

/// Fake deployer honoring the production contract: on success the produced
/// record has been appended to the transient buffer.
struct FakeDeployer {
    store: DeploymentLogStore,
    fail: bool,
}

#[async_trait]
impl ContractDeployer for FakeDeployer {
    async fn deploy(&self, log_name: &str) -> Result<DeployOutcome> {
        if self.fail {
            return Err(RotorError::Deploy(format!(
                "deployer for '{log_name}' exited with code 1: boom"
            )));
        }
        // Mirror the production contract: the record lands in the
        // transient buffer before the deployer reports success.
        let mut transient = self.store.load_transient()?;
        transient.push(record(log_name));
        let json = serde_json::to_string_pretty(&transient)?;
        std::fs::write(self.store.transient_path(), json).map_err(RotorError::Io)?;
        Ok(DeployOutcome {
            records: transient,
            duration_ms: 5,
        })
    }
}

struct FakePublisher {
    fail: bool,
    published: Mutex<Vec<String>>,
}

impl FakePublisher {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            published: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReleasePublisher for FakePublisher {
    async fn publish(&self, record: &DeploymentRecord) -> Result<PublishedRelease> {
        if self.fail {
            return Err(RotorError::Publish("create release returned 502".to_string()));
        }
        self.published.lock().unwrap().push(record.key.clone());
        Ok(PublishedRelease {
            tag: format!("{}-test", record.log_name),
            html_url: None,
        })
    }
}

fn cycle(
    store: DeploymentLogStore,
    deployer: FakeDeployer,
    publisher: Option<Arc<FakePublisher>>,
) -> DeploymentCycle {
    DeploymentCycle::new(
        store,
        catalog(),
        CycleConfig::default(),
        Arc::new(deployer),
        publisher.map(|p| p as Arc<dyn ReleasePublisher>),
    )
}

#[tokio::test]
async fn test_first_cycle_deploys_scheduled_class_and_folds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);
    let deployer = FakeDeployer {
        store: store.clone(),
        fail: false,
    };

    let report = cycle(store.clone(), deployer, None)
        .run()
        .await
        .expect("cycle");

    // Empty history: the mandatory cadence forces the scheduled class
    assert_eq!(report.log_name, "B");
    assert_eq!(report.folded, 1);
    assert_eq!(report.release, ReleaseStatus::Skipped);

    let log = store.load().expect("load");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].log_name, "B");

    // Transient buffer was cleared after the fold
    assert!(store.load_transient().expect("transient").is_empty());
}

#[tokio::test]
async fn test_publication_failure_does_not_lose_history() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);
    let deployer = FakeDeployer {
        store: store.clone(),
        fail: false,
    };
    let publisher = Arc::new(FakePublisher::new(true));

    let report = cycle(store.clone(), deployer, Some(publisher.clone()))
        .run()
        .await
        .expect("cycle succeeds despite publish failure");

    assert!(matches!(report.release, ReleaseStatus::Failed { .. }));
    assert!(publisher.published.lock().unwrap().is_empty());

    // The deployment still made it into the durable log
    let log = store.load().expect("load");
    assert_eq!(log.len(), 1);
    assert!(store.load_transient().expect("transient").is_empty());
}

#[tokio::test]
async fn test_successful_publication_reports_tag() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);
    let deployer = FakeDeployer {
        store: store.clone(),
        fail: false,
    };
    let publisher = Arc::new(FakePublisher::new(false));

    let report = cycle(store.clone(), deployer, Some(publisher.clone()))
        .run()
        .await
        .expect("cycle");

    assert_eq!(
        report.release,
        ReleaseStatus::Published {
            tag: "B-test".to_string()
        }
    );
    // Published from the transient record, before the fold
    assert_eq!(publisher.published.lock().unwrap().as_slice(), ["B"]);
}

#[tokio::test]
async fn test_deploy_failure_leaves_log_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);

    // Seed existing history so the policy sees a satisfied cadence
    let mut seeded = record("B");
    seeded.timestamp = Some(Utc::now() - Duration::hours(1));
    store.append(vec![], &[seeded]).expect("seed");

    let deployer = FakeDeployer {
        store: store.clone(),
        fail: true,
    };

    let err = cycle(store.clone(), deployer, None).run().await.unwrap_err();
    assert!(matches!(err, RotorError::Deploy(_)));

    // No retry, no log mutation: history still holds exactly the seed
    let log = store.load().expect("load");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].log_name, "B");
}

#[tokio::test]
async fn test_cycle_prunes_before_deciding() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);
    let now = Utc::now();

    let mut history: Vec<DeploymentRecord> = (0..50i64)
        .map(|i| {
            let mut r = record("A");
            r.key = format!("A #{i}");
            r.timestamp = Some(now - Duration::hours(49 + i));
            r
        })
        .collect();
    let mut fresh = record("B");
    fresh.timestamp = Some(now - Duration::hours(1));
    history.push(fresh);
    store.append(vec![], &history).expect("seed");

    let deployer = FakeDeployer {
        store: store.clone(),
        fail: false,
    };

    let report = cycle(store.clone(), deployer, None)
        .run()
        .await
        .expect("cycle");

    assert_eq!(report.pruned, 50);
    // 1 surviving record + 1 freshly folded
    assert_eq!(store.load().expect("load").len(), 2);
}
