//! Port for the persistence side of synchronisation.

use async_trait::async_trait;
use tracing::info;

use crate::{RepositorySynchronization, SinkError};

/// Receives discovery results. Implemented by the host's persistence layer.
#[async_trait]
pub trait SynchronizationSink: Send + Sync {
    /// Translates a stored repository record id into the provider's repository
    /// id. `Ok(None)` when no such record exists.
    async fn provider_repository_id(&self, repository_id: &str)
        -> Result<Option<String>, SinkError>;

    /// Called once per repository, in discovery order.
    async fn synchronized(&self, result: &RepositorySynchronization) -> Result<(), SinkError>;
}

/// Sink that only logs. Records are never known, so record-scoped triggers
/// fail with [`crate::ListenerError::UnknownRepository`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

#[async_trait]
impl SynchronizationSink for LoggingSink {
    async fn provider_repository_id(
        &self,
        _repository_id: &str,
    ) -> Result<Option<String>, SinkError> {
        Ok(None)
    }

    async fn synchronized(&self, result: &RepositorySynchronization) -> Result<(), SinkError> {
        info!(
            repository = %result.repository.name,
            repository_id = %result.repository.id,
            configuration = result.configuration.as_ref().map(|c| c.path.as_str()),
            trigger = result.trigger,
            "Repository synchronised"
        );
        Ok(())
    }
}
