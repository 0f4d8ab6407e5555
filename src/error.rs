//! Error types shared by every stage of the audit pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for audit, lint and site-generation operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Version error: {0}")]
    Version(#[from] semver::Error),

    #[error("Lockfile error: {0}")]
    Lockfile(String),

    #[error("Invalid advisory {}: {message}", path.display())]
    Advisory { path: PathBuf, message: String },

    #[error("Invalid CVSS vector: {0}")]
    Cvss(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Advisory database is stale: last commit was {age_days} days ago (limit {max_days})")]
    StaleDatabase { age_days: i64, max_days: u32 },

    #[error("Invalid package name: {0:?}")]
    InvalidName(String),
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn advisory(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Advisory {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
