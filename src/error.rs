use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::EntityId;

#[derive(Debug, Error, Diagnostic)]
pub enum TimelineError {
    #[error("invalid entity id: {0}")]
    InvalidEntityId(String),

    #[error("entity not found upstream: {0}")]
    NotFound(EntityId),

    #[error("entity request failed: {0}")]
    Transient(String),

    #[error("entity endpoint returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("malformed claim for {property}: {reason}")]
    MalformedClaim { property: String, reason: String },

    #[error("failed to persist cache entry: {0}")]
    CacheWrite(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("invalid identifier list: {0}")]
    InvalidInput(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("record sink failed: {0}")]
    Sink(String),

    #[error("run cancelled before completion")]
    Cancelled,
}

impl TimelineError {
    /// Whether a caller may retry the operation that produced this error.
    pub fn is_transient(&self) -> bool {
        match self {
            TimelineError::Transient(_) => true,
            TimelineError::UpstreamStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}
