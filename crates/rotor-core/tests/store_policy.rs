//! Store + policy integration: scheduling decisions over the real file
//! store, including degraded and bulk-history states.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rotor_core::{
    next_deployment, BlockNumber, ContractCatalog, ContractCatalogEntry, DeploymentLogStore,
    DeploymentRecord, Interaction,
};
use std::collections::BTreeSet;

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

fn record(log_name: &str, timestamp: Option<DateTime<Utc>>) -> DeploymentRecord {
    DeploymentRecord {
        key: log_name.to_string(),
        log_name: log_name.to_string(),
        address: "0xabc".to_string(),
        transaction_hash: "0xdef".to_string(),
        block_number: BlockNumber::Confirmed("1".to_string()),
        timestamp,
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

#[test]
fn test_fresh_store_first_decision_is_scheduled_class() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);

    let history = store.load().expect("load");
    assert!(history.is_empty());

    let decision = next_deployment(
        &catalog(),
        &history,
        Utc::now(),
        Duration::hours(12),
        &mut StdRng::seed_from_u64(1),
    )
    .expect("decide");
    assert_eq!(decision, "B");
}

#[test]
fn test_recent_scheduled_record_opens_full_catalog() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);
    let now = Utc::now();

    store
        .append(vec![], &[record("B", Some(now - Duration::hours(1)))])
        .expect("append");
    let history = store.load().expect("load");

    let mut rng = StdRng::seed_from_u64(7);
    let mut seen = BTreeSet::new();
    for _ in 0..200 {
        let decision = next_deployment(&catalog(), &history, now, Duration::hours(12), &mut rng)
            .expect("decide");
        seen.insert(decision);
    }
    assert!(seen.contains("A"));
    assert!(seen.contains("B"));
}

#[test]
fn test_bulk_prune_then_decide() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);
    let now = Utc::now();

    let mut history: Vec<DeploymentRecord> = (0..50i64)
        .map(|i| record("B", Some(now - Duration::hours(49 + i))))
        .collect();
    history.push(record("A", Some(now - Duration::hours(1))));
    let history = store.append(vec![], &history).expect("append");

    let outcome = store.prune(history, Duration::hours(48)).expect("prune");
    assert_eq!(outcome.removed, 50);
    assert_eq!(outcome.kept.len(), 1);

    // All scheduled-class history was pruned away, so the cadence is due
    let decision = next_deployment(
        &catalog(),
        &outcome.kept,
        now,
        Duration::hours(12),
        &mut StdRng::seed_from_u64(3),
    )
    .expect("decide");
    assert_eq!(decision, "B");
}

#[test]
fn test_corrupt_log_degrades_and_still_schedules() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);

    std::fs::write(store.log_path(), "not json at all").expect("write");
    let history = store.load().expect("load degrades");
    assert!(history.is_empty());

    let decision = next_deployment(
        &catalog(),
        &history,
        Utc::now(),
        Duration::hours(12),
        &mut StdRng::seed_from_u64(5),
    )
    .expect("decide");
    assert_eq!(decision, "B");
}
