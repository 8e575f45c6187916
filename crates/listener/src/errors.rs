//! Error types for trigger processing.

use thiserror::Error;
use workflow::{RetryPolicy, WorkflowError};

/// Failure reported by a [`crate::SynchronizationSink`].
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Top-level error for processing one [`workflow::ProcessSynchronization`].
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The message body could not be decoded.
    #[error("Malformed synchronisation trigger: {message}")]
    InvalidMessage { message: String },

    /// Both `repositoryId` and `repositoryProviderId` were set.
    #[error(
        "Trigger names both repositoryId '{repository_id}' \
         and repositoryProviderId '{repository_provider_id}'"
    )]
    AmbiguousScope {
        repository_id: String,
        repository_provider_id: String,
    },

    /// The sink has no record for the requested `repositoryId`.
    #[error("No repository record with id '{repository_id}'")]
    UnknownRepository { repository_id: String },

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Synchronisation sink failed: {0}")]
    Sink(#[from] SinkError),
}

impl ListenerError {
    /// Whether redelivering the same message may succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Workflow(error) => error.retry_policy(),
            Self::Sink(_) => RetryPolicy::Retryable { after: None },
            Self::InvalidMessage { .. }
            | Self::AmbiguousScope { .. }
            | Self::UnknownRepository { .. } => RetryPolicy::NonRetryable,
        }
    }
}
