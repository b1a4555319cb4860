//! Domain models for Rotor.
//!
//! Canonical definitions for the core entities:
//! - `DeploymentRecord`: One entry of deployment history
//! - `ContractCatalog`: Static configuration of deployable contracts
//! - `RotorError`: Crate-wide error taxonomy

pub mod catalog;
pub mod error;
pub mod record;

// Re-export main types and errors
pub use catalog::{ContractCatalog, ContractCatalogEntry, Interaction};
pub use error::{Result, RotorError};
pub use record::{BlockNumber, DeploymentRecord};
