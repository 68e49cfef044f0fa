//! Core error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the reconciliation and purge core
///
/// Provider failures during a scan or purge never surface as `Err` from the
/// orchestration layer; they degrade to partial data or recorded failures.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Cloud API error: {0}")]
    Api(String),

    #[error("CLI command failed: {0}")]
    CommandFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot publish {}: {message}", path.display())]
    ReportWrite { path: PathBuf, message: String },

    #[error("Report version {found} is newer than supported version {supported}")]
    UnsupportedReportVersion { found: u32, supported: u32 },

    #[error("Purge already running: {0}")]
    PurgeLocked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
