//! Error types for the memory engine.
//!
//! Uses thiserror for ergonomic error definitions. A single error enum
//! covers the store, merge and decay paths so that run orchestration can
//! route failures (quarantine, retry-later, reject) by variant.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Resource errors
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Fact not found: {0}")]
    FactNotFound(String),

    /// Another writer holds the entity lock. Retried on the next
    /// scheduled run rather than escalated.
    #[error("Entity busy: {0}")]
    Busy(String),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unparseable persisted state. The entity is quarantined (skipped
    /// and logged) instead of aborting the run.
    #[error("Corrupt entity state for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    // Generic errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON parsing error: {}", err))
    }
}
