//! Static contract catalog configuration.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::error::{Result, RotorError};

/// Behavior tag attached to a catalog entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    /// Member of the mandatory-cadence rotation: the scheduler forces a
    /// deployment from this class once the cadence interval has elapsed.
    Scheduled,
}

/// One deployable contract definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContractCatalogEntry {
    /// Unique key into the catalog; also the identifier the external
    /// deployer is invoked with and the one recorded in history.
    pub log_name: String,

    /// Source artifact identifier (the contract name without `.sol`).
    pub name: String,

    /// Behavior tags.
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl ContractCatalogEntry {
    /// Whether this entry belongs to the mandatory-cadence class.
    pub fn is_scheduled(&self) -> bool {
        self.interactions.contains(&Interaction::Scheduled)
    }
}

/// The full catalog of deployable contracts plus network settings.
///
/// Loaded once per run from static configuration and immutable for the
/// run's duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContractCatalog {
    /// Target network name, passed through to the external deployer.
    pub network: String,

    /// Base URL for block explorer links in release bodies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_base_url: Option<String>,

    /// Deployable contract definitions.
    pub contracts: Vec<ContractCatalogEntry>,
}

impl ContractCatalog {
    /// Load and validate a catalog from a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RotorError::Catalog(format!("cannot read catalog config {}: {}", path.display(), e))
        })?;
        let catalog: ContractCatalog = serde_json::from_str(&content).map_err(|e| {
            RotorError::Catalog(format!("cannot parse catalog config {}: {}", path.display(), e))
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Validate catalog consistency.
    ///
    /// Fails fast at startup, not at selection time:
    /// - the catalog must not be empty (an empty fallback pool would make
    ///   every scheduling decision impossible);
    /// - `log_name` and `name` must be non-blank;
    /// - `log_name` must be unique (duplicate keys would make history
    ///   records ambiguous).
    pub fn validate(&self) -> Result<()> {
        if self.contracts.is_empty() {
            return Err(RotorError::Catalog(
                "catalog contains no contracts".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.contracts {
            if entry.log_name.trim().is_empty() {
                return Err(RotorError::Catalog(
                    "catalog entry with blank logName".to_string(),
                ));
            }
            if entry.name.trim().is_empty() {
                return Err(RotorError::Catalog(format!(
                    "catalog entry '{}' has a blank contract name",
                    entry.log_name
                )));
            }
            if !seen.insert(entry.log_name.as_str()) {
                return Err(RotorError::Catalog(format!(
                    "duplicate logName '{}' in catalog",
                    entry.log_name
                )));
            }
        }
        Ok(())
    }

    /// Look up an entry by its `log_name`.
    pub fn entry(&self, log_name: &str) -> Option<&ContractCatalogEntry> {
        self.contracts.iter().find(|e| e.log_name == log_name)
    }

    /// Entries belonging to the mandatory-cadence class.
    pub fn scheduled_class(&self) -> Vec<&ContractCatalogEntry> {
        self.contracts.iter().filter(|e| e.is_scheduled()).collect()
    }
}
