//! Rotor - rotation deployer CLI
//!
//! The `rotor` command runs policy-driven deployment cycles against a
//! test network and manages the deployment history log.
//!
//! ## Commands
//!
//! - `run`: Execute one full scheduling cycle (prune, decide, deploy, fold)
//! - `next`: Show the contract the policy would pick, without deploying
//! - `prune`: Apply retention pruning to the deployment log
//! - `history`: Show recent deployment records
//! - `verify`: Generate the verification bundle for a recorded deployment
//! - `release`: Publish a GitHub release for a recorded deployment

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

use rotor_core::{
    ContractCatalog, ContractDeployer, CycleConfig, DeployCommand, DeploymentCycle,
    DeploymentLogStore, DeploymentRecord, GitHubConfig, GitHubReleasePublisher, ReleasePublisher,
    ReleaseStatus, SubprocessDeployer, VerificationGenerator,
};

#[derive(Parser)]
#[command(name = "rotor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rotation deployer for test-network smart contracts", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Contract catalog config file
    #[arg(long, global = true, env = "ROTOR_CONFIG", default_value = "deployment-config.json")]
    config: PathBuf,

    /// Durable deployment log
    #[arg(long, global = true, env = "ROTOR_LOG", default_value = "workflow.json")]
    log: PathBuf,

    /// Transient buffer written by the external deployer
    #[arg(long, global = true, env = "ROTOR_TRANSIENT", default_value = "deployments.json")]
    transient: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one full scheduling cycle
    Run {
        /// Retention window for history pruning, in hours
        #[arg(long, default_value = "48")]
        retention_hours: i64,

        /// Mandatory cadence interval for scheduled-class contracts, in hours
        #[arg(long, default_value = "12")]
        interval_hours: i64,

        /// Deployer executable (defaults to the Hardhat deploy task)
        #[arg(long)]
        deploy_program: Option<String>,

        /// Deployer argument; repeatable. `{logName}` and `{network}` are
        /// substituted per invocation
        #[arg(long = "deploy-arg")]
        deploy_args: Vec<String>,

        /// Kill the deployer after this many seconds (0 disables)
        #[arg(long, default_value = "600")]
        deploy_timeout_secs: u64,

        /// Publish a GitHub release for the deployment (needs GITHUB_TOKEN
        /// and GITHUB_REPOSITORY)
        #[arg(long)]
        publish: bool,

        /// Compiler build-info directory (used when publishing)
        #[arg(long, default_value = "artifacts/build-info")]
        build_info: PathBuf,

        /// Output directory for verification bundles
        #[arg(long, default_value = "verification")]
        out_dir: PathBuf,
    },

    /// Show the contract the policy would pick, without deploying
    Next {
        /// Retention window for history pruning, in hours
        #[arg(long, default_value = "48")]
        retention_hours: i64,

        /// Mandatory cadence interval for scheduled-class contracts, in hours
        #[arg(long, default_value = "12")]
        interval_hours: i64,
    },

    /// Apply retention pruning to the deployment log
    Prune {
        /// Retention window, in hours
        #[arg(long, default_value = "48")]
        retention_hours: i64,
    },

    /// Show recent deployment records, newest first
    History {
        /// Maximum number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Generate the verification bundle for a recorded deployment
    Verify {
        /// Record key to verify (default: the most recent record)
        #[arg(long)]
        key: Option<String>,

        /// Compiler build-info directory
        #[arg(long, default_value = "artifacts/build-info")]
        build_info: PathBuf,

        /// Output directory for the bundle
        #[arg(long, default_value = "verification")]
        out_dir: PathBuf,
    },

    /// Publish a GitHub release for a recorded deployment
    Release {
        /// Record key to release (default: the most recent record)
        #[arg(long)]
        key: Option<String>,

        /// Compiler build-info directory
        #[arg(long, default_value = "artifacts/build-info")]
        build_info: PathBuf,

        /// Output directory for the bundle
        #[arg(long, default_value = "verification")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    rotor_core::init_tracing(cli.json, level);

    let store = DeploymentLogStore::new(&cli.log, &cli.transient);

    match cli.command {
        Commands::Run {
            retention_hours,
            interval_hours,
            deploy_program,
            deploy_args,
            deploy_timeout_secs,
            publish,
            build_info,
            out_dir,
        } => {
            cmd_run(
                &cli.config,
                store,
                retention_hours,
                interval_hours,
                deploy_program,
                deploy_args,
                deploy_timeout_secs,
                publish,
                &build_info,
                &out_dir,
            )
            .await
        }
        Commands::Next {
            retention_hours,
            interval_hours,
        } => cmd_next(&cli.config, store, retention_hours, interval_hours),
        Commands::Prune { retention_hours } => cmd_prune(store, retention_hours),
        Commands::History { limit } => cmd_history(store, limit),
        Commands::Verify {
            key,
            build_info,
            out_dir,
        } => cmd_verify(&cli.config, store, key.as_deref(), &build_info, &out_dir),
        Commands::Release {
            key,
            build_info,
            out_dir,
        } => cmd_release(&cli.config, store, key.as_deref(), &build_info, &out_dir).await,
    }
}

fn load_catalog(config: &PathBuf) -> Result<ContractCatalog> {
    ContractCatalog::from_file(config)
        .with_context(|| format!("loading contract catalog from {}", config.display()))
}

fn cycle_config(retention_hours: i64, interval_hours: i64) -> CycleConfig {
    CycleConfig {
        mandatory_interval: chrono::Duration::hours(interval_hours),
        retention: chrono::Duration::hours(retention_hours),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    config: &PathBuf,
    store: DeploymentLogStore,
    retention_hours: i64,
    interval_hours: i64,
    deploy_program: Option<String>,
    deploy_args: Vec<String>,
    deploy_timeout_secs: u64,
    publish: bool,
    build_info: &PathBuf,
    out_dir: &PathBuf,
) -> Result<()> {
    let catalog = load_catalog(config)?;

    let command = match deploy_program {
        Some(program) => DeployCommand {
            program,
            args: deploy_args,
            timeout_secs: deploy_timeout_secs,
        },
        None => {
            let mut command = DeployCommand::hardhat();
            command.timeout_secs = deploy_timeout_secs;
            command
        }
    };

    let deployer: Arc<dyn ContractDeployer> = Arc::new(SubprocessDeployer::new(
        command,
        catalog.network.clone(),
        store.clone(),
    ));

    let publisher: Option<Arc<dyn ReleasePublisher>> = if publish {
        let github =
            GitHubConfig::from_env().context("--publish requires GitHub credentials")?;
        let generator = VerificationGenerator::new(catalog.clone(), build_info, out_dir);
        Some(Arc::new(GitHubReleasePublisher::new(github, generator)))
    } else {
        None
    };

    let cycle = DeploymentCycle::new(
        store,
        catalog,
        cycle_config(retention_hours, interval_hours),
        deployer,
        publisher,
    );

    let report = cycle.run().await?;

    println!("Deployed {} in {} ms", report.log_name, report.duration_ms);
    println!(
        "History: {} record(s) pruned, {} folded in",
        report.pruned, report.folded
    );
    match report.release {
        ReleaseStatus::Published { tag } => println!("Release published: {tag}"),
        ReleaseStatus::Skipped => {}
        // Tolerated: the deployment is already recorded, the release can
        // be retried with `rotor release`
        ReleaseStatus::Failed { reason } => {
            println!("Release publication failed (history kept): {reason}")
        }
    }
    Ok(())
}

fn cmd_next(
    config: &PathBuf,
    store: DeploymentLogStore,
    retention_hours: i64,
    interval_hours: i64,
) -> Result<()> {
    let catalog = load_catalog(config)?;

    let deployer: Arc<dyn ContractDeployer> = Arc::new(SubprocessDeployer::new(
        DeployCommand::hardhat(),
        catalog.network.clone(),
        store.clone(),
    ));
    let cycle = DeploymentCycle::new(
        store,
        catalog,
        cycle_config(retention_hours, interval_hours),
        deployer,
        None,
    );

    let log_name = cycle.preview()?;
    println!("Next deployment: {log_name}");
    Ok(())
}

fn cmd_prune(store: DeploymentLogStore, retention_hours: i64) -> Result<()> {
    let log = store.load()?;
    let outcome = store.prune(log, chrono::Duration::hours(retention_hours))?;
    println!(
        "Pruned {} record(s), {} remain within the {}h window",
        outcome.removed,
        outcome.kept.len(),
        retention_hours
    );
    Ok(())
}

fn cmd_history(store: DeploymentLogStore, limit: usize) -> Result<()> {
    let log = store.load()?;
    if log.is_empty() {
        println!("No deployments recorded in {}", store.log_path().display());
        return Ok(());
    }

    for record in log.iter().rev().take(limit) {
        let timestamp = record
            .timestamp
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "{}  {} [{}] {} block {}",
            timestamp, record.key, record.log_name, record.address, record.block_number
        );
    }
    Ok(())
}

/// Pick a record from the durable log: by key, or the most recent.
fn select_record<'a>(
    log: &'a [DeploymentRecord],
    key: Option<&str>,
) -> Result<&'a DeploymentRecord> {
    if log.is_empty() {
        bail!("no deployments recorded, deploy a contract first");
    }
    match key {
        Some(key) => log
            .iter()
            .rev()
            .find(|r| r.key == key)
            .with_context(|| format!("no deployment record with key '{key}'")),
        None => log.last().context("log unexpectedly empty"),
    }
}

fn cmd_verify(
    config: &PathBuf,
    store: DeploymentLogStore,
    key: Option<&str>,
    build_info: &PathBuf,
    out_dir: &PathBuf,
) -> Result<()> {
    let catalog = load_catalog(config)?;
    let log = store.load()?;
    let record = select_record(&log, key)?;

    let generator = VerificationGenerator::new(catalog, build_info, out_dir);
    let bundle = generator.generate(record)?;

    println!("Verification bundle for {}:", record.key);
    println!("  Standard JSON Input: {}", bundle.standard_input_path.display());
    println!("  Arguments Info:      {}", bundle.args_path.display());
    println!("  SHA-256:             {}", bundle.input_digest);
    Ok(())
}

async fn cmd_release(
    config: &PathBuf,
    store: DeploymentLogStore,
    key: Option<&str>,
    build_info: &PathBuf,
    out_dir: &PathBuf,
) -> Result<()> {
    let catalog = load_catalog(config)?;
    let log = store.load()?;
    let record = select_record(&log, key)?;

    let github = GitHubConfig::from_env()?;
    let generator = VerificationGenerator::new(catalog, build_info, out_dir);
    let publisher = GitHubReleasePublisher::new(github, generator);

    let release = publisher.publish(record).await?;
    match release.html_url {
        Some(url) => println!("Release {} published: {}", release.tag, url),
        None => println!("Release {} published", release.tag),
    }
    Ok(())
}
