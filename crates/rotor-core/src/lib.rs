//! Rotor Core Library
//!
//! Policy-driven rotation deployment for test-network smart contracts:
//! scheduling decisions over a retention-pruned history log, delegation to
//! an external deployer process, and release publication with verification
//! artifacts.

pub mod deployer;
pub mod domain;
pub mod log_store;
pub mod orchestrator;
pub mod policy;
pub mod release;
pub mod telemetry;
pub mod verification;

pub use domain::{
    BlockNumber, ContractCatalog, ContractCatalogEntry, DeploymentRecord, Interaction, Result,
    RotorError,
};

pub use deployer::{ContractDeployer, DeployCommand, DeployOutcome, SubprocessDeployer};
pub use log_store::{DeploymentLogStore, PruneOutcome};
pub use orchestrator::{CycleConfig, CycleReport, DeploymentCycle, ReleaseStatus};
pub use policy::next_deployment;
pub use release::{
    release_tag, render_release_body, GitHubConfig, GitHubReleasePublisher, PublishedRelease,
    ReleasePublisher,
};
pub use telemetry::init_tracing;
pub use verification::{VerificationBundle, VerificationGenerator};

/// Rotor version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
