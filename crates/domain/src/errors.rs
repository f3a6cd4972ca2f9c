//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for dirmirror
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum MirrorError {
    /// Transport failure, timeout or non-2xx answer from the directory API.
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Local cache read or write failed; the unit of work was rolled back.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Caller input or a remote record did not pass validation.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MirrorError {
    /// Stable label suitable for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RemoteUnavailable(_) => "remote_unavailable",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage",
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for dirmirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;
