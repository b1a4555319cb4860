//! Verification artifact generation.
//!
//! Explorers verify a deployed contract from the compiler's standard JSON
//! input plus the deployed address and constructor arguments. The compiler
//! writes one build-info file per compilation run; the generator locates
//! the one that covers the record's contract and extracts its `input`
//! object into a self-contained bundle.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::domain::{ContractCatalog, DeploymentRecord, Result, RotorError};

/// Generated machine-verification bundle for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationBundle {
    /// Compiler standard JSON input, suitable for "Standard-JSON-Input"
    /// explorer verification.
    pub standard_input_path: PathBuf,

    /// Companion file with the address, compiler version, and constructor
    /// arguments.
    pub args_path: PathBuf,

    /// SHA-256 hex digest of the standard input bytes as written.
    pub input_digest: String,
}

/// Companion argument file contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct VerificationArgs {
    contract_address: String,
    compiler_version: String,
    constructor_args: Vec<serde_json::Value>,
}

/// Resolves deployment records to verification bundles.
pub struct VerificationGenerator {
    catalog: ContractCatalog,
    build_info_dir: PathBuf,
    out_dir: PathBuf,
}

impl VerificationGenerator {
    pub fn new(
        catalog: ContractCatalog,
        build_info_dir: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            build_info_dir: build_info_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    /// Generate the verification bundle for `record`.
    ///
    /// Fails when the record's `logName` has no catalog entry or when no
    /// build-info file covers the contract's source. Constructor arguments
    /// are passed through verbatim from the record (ABI re-encoding is the
    /// deployer's business, not ours); a record without them gets an empty
    /// list.
    pub fn generate(&self, record: &DeploymentRecord) -> Result<VerificationBundle> {
        let entry = self.catalog.entry(&record.log_name).ok_or_else(|| {
            RotorError::Verification(format!(
                "no catalog entry for logName '{}' (record '{}')",
                record.log_name, record.key
            ))
        })?;

        let (input, compiler_version) = self.find_standard_input(&entry.name)?;

        std::fs::create_dir_all(&self.out_dir)?;
        let safe_key = record.key.replace(' ', "_");
        let standard_input_path = self.out_dir.join(format!("{safe_key}_standard_input.json"));
        let args_path = self.out_dir.join(format!("{safe_key}_args.json"));

        let input_bytes = serde_json::to_vec_pretty(&input)?;
        std::fs::write(&standard_input_path, &input_bytes)?;

        let args = VerificationArgs {
            contract_address: record.address.clone(),
            compiler_version,
            constructor_args: record.constructor_args.clone().unwrap_or_default(),
        };
        std::fs::write(&args_path, serde_json::to_vec_pretty(&args)?)?;

        let mut hasher = Sha256::new();
        hasher.update(&input_bytes);
        let input_digest = hex::encode(hasher.finalize());

        info!(
            key = %record.key,
            standard_input = %standard_input_path.display(),
            "verification bundle prepared"
        );

        Ok(VerificationBundle {
            standard_input_path,
            args_path,
            input_digest,
        })
    }

    /// Scan the build-info directory for the compilation that covers
    /// `contract_name` and extract its standard JSON input.
    fn find_standard_input(
        &self,
        contract_name: &str,
    ) -> Result<(serde_json::Value, String)> {
        let read_dir = std::fs::read_dir(&self.build_info_dir).map_err(|e| {
            RotorError::Verification(format!(
                "cannot read build info directory {}: {}",
                self.build_info_dir.display(),
                e
            ))
        })?;

        let source_suffix = format!("/{contract_name}.sol");

        for dir_entry in read_dir {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let build_info: serde_json::Value =
                match std::fs::read(&path).ok().and_then(|b| serde_json::from_slice(&b).ok()) {
                    Some(v) => v,
                    None => continue,
                };

            let covers_contract = build_info["input"]["sources"]
                .as_object()
                .is_some_and(|sources| {
                    sources
                        .keys()
                        .any(|s| s.ends_with(&source_suffix) || s.as_str() == &source_suffix[1..])
                });
            if !covers_contract {
                continue;
            }

            let compiler_version = build_info["solcLongVersion"]
                .as_str()
                .or_else(|| build_info["solcVersion"].as_str())
                .map(|v| format!("v{v}"))
                .unwrap_or_else(|| "unknown".to_string());

            return Ok((build_info["input"].clone(), compiler_version));
        }

        Err(RotorError::Verification(format!(
            "no standard JSON input found for contract '{}' in {}; recompile the contracts",
            contract_name,
            self.build_info_dir.display()
        )))
    }
}
