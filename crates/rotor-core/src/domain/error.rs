//! Domain-level error taxonomy for Rotor.

/// Rotor domain errors.
///
/// The orchestrator is the single point that decides which of these are
/// tolerated (publication, verification) versus fatal (catalog, deploy,
/// persistence writes). Lower layers never catch-and-continue.
#[derive(Debug, thiserror::Error)]
pub enum RotorError {
    #[error("invalid contract catalog: {0}")]
    Catalog(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("deployment failed: {0}")]
    Deploy(String),

    #[error("verification artifact error: {0}")]
    Verification(String),

    #[error("release publication failed: {0}")]
    Publish(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for Rotor domain operations.
pub type Result<T> = std::result::Result<T, RotorError>;
