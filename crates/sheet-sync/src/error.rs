//! Error taxonomy for a sync run.
//!
//! Decode problems never show up here: they are recovered inside the body
//! extractor. A corrupt state file is likewise recovered by the state store.
//! What remains either stops the run before any remote call (`Config`) or
//! aborts it without committing state (`Transport`, `State`).

use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid or unedited configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote call failed
    #[error("{operation} failed: {cause:#}")]
    Transport {
        operation: String,
        cause: anyhow::Error,
    },

    /// The run state could not be written
    #[error("Failed to save run state: {0}")]
    State(#[from] std::io::Error),
}

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        SyncError::Config(message.into())
    }

    /// Wrap a transport failure with the operation (and identifier) it hit
    pub fn transport(operation: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        SyncError::Transport {
            operation: operation.into(),
            cause: cause.into(),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            SyncError::Config(_) => ExitCode::from(2),
            SyncError::Transport { .. } | SyncError::State(_) => ExitCode::FAILURE,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
