//! Errors from applying service configuration.

use thiserror::Error;

use crate::supervisor::SupervisorError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Writing a configuration file failed.
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("supervisor: {0}")]
    Supervisor(#[from] SupervisorError),

    /// Reload did not succeed within the retry budget.
    #[error("reload failed: {0}")]
    Reload(String),

    /// The blocking apply task panicked or was cancelled.
    #[error("apply task aborted: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(e: tokio::task::JoinError) -> Self {
        ServiceError::Join(e.to_string())
    }
}
