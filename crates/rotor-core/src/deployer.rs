//! External deployer invocation.
//!
//! The deployer is an opaque subprocess (compilation + chain deployment
//! are its business): it is handed a `logName`, and on success it has
//! appended the produced [`DeploymentRecord`] to the transient buffer.
//! [`SubprocessDeployer`] wraps that into a result-type contract — success
//! with records, or a failure carrying the reason — rather than a bare
//! exit-code check.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::{DeploymentRecord, Result, RotorError};
use crate::log_store::DeploymentLogStore;

/// Outcome of a successful deployment delegation.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    /// Records the deployer appended to the transient buffer, oldest first.
    pub records: Vec<DeploymentRecord>,

    /// Wall-clock duration of the external process.
    pub duration_ms: u64,
}

/// Collaborator contract for the external deployment step.
#[async_trait]
pub trait ContractDeployer: Send + Sync {
    /// Deploy the catalog contract identified by `log_name`.
    ///
    /// Blocks until the external process reports; there is no partial-
    /// progress visibility and no cancellation.
    async fn deploy(&self, log_name: &str) -> Result<DeployOutcome>;
}

/// Command template for the external deployer process.
///
/// `{logName}` and `{network}` placeholders in `args` are substituted per
/// invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeployCommand {
    /// Executable to spawn.
    pub program: String,

    /// Arguments, possibly containing `{logName}` / `{network}`.
    pub args: Vec<String>,

    /// Kill the process after this many seconds; 0 disables the timeout.
    #[serde(default = "DeployCommand::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl DeployCommand {
    fn default_timeout_secs() -> u64 {
        600
    }

    /// The Hardhat deploy task the original workflow drives.
    pub fn hardhat() -> Self {
        Self {
            program: "npx".to_string(),
            args: vec![
                "hardhat".to_string(),
                "deploy".to_string(),
                "--log-name".to_string(),
                "{logName}".to_string(),
                "--network".to_string(),
                "{network}".to_string(),
            ],
            timeout_secs: Self::default_timeout_secs(),
        }
    }

    fn resolved_args(&self, log_name: &str, network: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{logName}", log_name).replace("{network}", network))
            .collect()
    }
}

/// Production deployer: spawns the configured command and reads the
/// records it appended to the transient buffer.
pub struct SubprocessDeployer {
    command: DeployCommand,
    network: String,
    store: DeploymentLogStore,
}

impl SubprocessDeployer {
    pub fn new(command: DeployCommand, network: impl Into<String>, store: DeploymentLogStore) -> Self {
        Self {
            command,
            network: network.into(),
            store,
        }
    }
}

#[async_trait]
impl ContractDeployer for SubprocessDeployer {
    async fn deploy(&self, log_name: &str) -> Result<DeployOutcome> {
        let start = Instant::now();
        let args = self.command.resolved_args(log_name, &self.network);

        info!(
            log_name,
            command = %format!("{} {}", self.command.program, args.join(" ")),
            "delegating deployment"
        );

        let child = Command::new(&self.command.program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RotorError::Deploy(format!("cannot spawn {}: {}", self.command.program, e))
            })?;

        let output = if self.command.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(self.command.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| {
                RotorError::Deploy(format!(
                    "deployer for '{}' timed out after {} seconds",
                    log_name, self.command.timeout_secs
                ))
            })?
            .map_err(RotorError::Io)?
        } else {
            child.wait_with_output().await.map_err(RotorError::Io)?
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RotorError::Deploy(format!(
                "deployer for '{}' exited with code {}: {}",
                log_name,
                exit_code,
                stderr.trim()
            )));
        }

        debug!(
            log_name,
            duration_ms,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            "deployer process succeeded"
        );

        let records = self.store.load_transient()?;
        if records.is_empty() {
            return Err(RotorError::Deploy(format!(
                "deployer for '{}' reported success but recorded no deployment",
                log_name
            )));
        }

        Ok(DeployOutcome {
            records,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlockNumber;
    use chrono::Utc;
    use tempfile::tempdir;

    fn store(dir: &tempfile::TempDir) -> DeploymentLogStore {
        DeploymentLogStore::new(
            dir.path().join("workflow.json"),
            dir.path().join("deployments.json"),
        )
    }

    fn seed_transient(store: &DeploymentLogStore, log_name: &str) {
        let record = DeploymentRecord {
            key: log_name.to_string(),
            log_name: log_name.to_string(),
            address: "0xabc".to_string(),
            transaction_hash: "0xdef".to_string(),
            block_number: BlockNumber::Confirmed("7".to_string()),
            timestamp: Some(Utc::now()),
            constructor_args: None,
            explorer: None,
        };
        let json = serde_json::to_string_pretty(&[record]).expect("json");
        std::fs::write(store.transient_path(), json).expect("write transient");
    }

    #[test]
    fn test_placeholder_substitution() {
        let command = DeployCommand::hardhat();
        let args = command.resolved_args("FeeCollector", "heliosTestnet");
        assert!(args.contains(&"FeeCollector".to_string()));
        assert!(args.contains(&"heliosTestnet".to_string()));
        assert!(!args.iter().any(|a| a.contains('{')));
    }

    #[tokio::test]
    async fn test_successful_deploy_returns_transient_records() {
        let dir = tempdir().expect("tempdir");
        let store = store(&dir);
        seed_transient(&store, "FeeCollector");

        // "true" stands in for the external deployer having already written
        // the transient buffer
        let command = DeployCommand {
            program: "true".to_string(),
            args: vec![],
            timeout_secs: 60,
        };
        let deployer = SubprocessDeployer::new(command, "testnet", store);

        let outcome = deployer.deploy("FeeCollector").await.expect("deploy");
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].log_name, "FeeCollector");
    }

    #[tokio::test]
    async fn test_failing_deployer_is_a_deploy_error() {
        let dir = tempdir().expect("tempdir");
        let store = store(&dir);

        let command = DeployCommand {
            program: "false".to_string(),
            args: vec![],
            timeout_secs: 60,
        };
        let deployer = SubprocessDeployer::new(command, "testnet", store);

        let err = deployer.deploy("FeeCollector").await.unwrap_err();
        assert!(matches!(err, RotorError::Deploy(_)));
        assert!(err.to_string().contains("exited with code"));
    }

    #[tokio::test]
    async fn test_success_without_records_is_a_deploy_error() {
        let dir = tempdir().expect("tempdir");
        let store = store(&dir);

        let command = DeployCommand {
            program: "true".to_string(),
            args: vec![],
            timeout_secs: 60,
        };
        let deployer = SubprocessDeployer::new(command, "testnet", store);

        let err = deployer.deploy("FeeCollector").await.unwrap_err();
        assert!(err.to_string().contains("recorded no deployment"));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_deploy_error() {
        let dir = tempdir().expect("tempdir");
        let store = store(&dir);

        let command = DeployCommand {
            program: "rotor-definitely-not-a-binary".to_string(),
            args: vec![],
            timeout_secs: 60,
        };
        let deployer = SubprocessDeployer::new(command, "testnet", store);

        let err = deployer.deploy("FeeCollector").await.unwrap_err();
        assert!(err.to_string().contains("cannot spawn"));
    }
}
