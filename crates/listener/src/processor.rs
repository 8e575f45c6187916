use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use workflow::{
    ConfigFileItem, DevOpsProvider, ProcessSynchronization, Repository, SyncRunId, WorkflowError,
};

use crate::{ListenerError, SynchronizationScope, SynchronizationSink};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Discovery result for a single repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySynchronization {
    pub repository: Repository,
    /// First configuration file found, or `None` when the repository has none.
    pub configuration: Option<ConfigFileItem>,
    /// Copied from the trigger; tells the sink whether to schedule update jobs.
    pub trigger: bool,
}

/// Outcome of processing one trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizationReport {
    pub run_id: SyncRunId,
    pub trigger: bool,
    pub repositories: Vec<RepositorySynchronization>,
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Turns [`ProcessSynchronization`] triggers into repository discovery runs.
pub struct SynchronizationProcessor {
    provider: Arc<DevOpsProvider>,
    sink: Arc<dyn SynchronizationSink>,
}

impl SynchronizationProcessor {
    pub fn new(provider: Arc<DevOpsProvider>, sink: Arc<dyn SynchronizationSink>) -> Self {
        Self { provider, sink }
    }

    /// Decodes a JSON message body and processes it.
    pub async fn process_json(
        &self,
        body: &[u8],
        cancel: &CancellationToken,
    ) -> Result<SynchronizationReport, ListenerError> {
        let message: ProcessSynchronization =
            serde_json::from_slice(body).map_err(|e| ListenerError::InvalidMessage {
                message: e.to_string(),
            })?;
        self.process(&message, cancel).await
    }

    /// Processes one trigger. Repositories are handled in discovery order and
    /// the first failure aborts the run.
    pub async fn process(
        &self,
        message: &ProcessSynchronization,
        cancel: &CancellationToken,
    ) -> Result<SynchronizationReport, ListenerError> {
        let run_id = SyncRunId::new_random();
        let span = info_span!("synchronization", %run_id, trigger = message.trigger);
        self.run_once(run_id, message, cancel).instrument(span).await
    }

    /// Processes messages from `messages` until the channel closes or `cancel`
    /// fires. Failed messages are logged and skipped.
    pub async fn run(
        &self,
        mut messages: mpsc::Receiver<ProcessSynchronization>,
        cancel: &CancellationToken,
    ) {
        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                message = messages.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            match self.process(&message, cancel).await {
                Ok(report) => debug!(
                    run_id = %report.run_id,
                    repositories = report.repositories.len(),
                    "Trigger processed"
                ),
                Err(ListenerError::Workflow(WorkflowError::Cancelled { .. })) => break,
                Err(error) => warn!(
                    error = %error,
                    retry = ?error.retry_policy(),
                    "Trigger failed"
                ),
            }
        }
        info!("Synchronisation listener stopped");
    }

    async fn run_once(
        &self,
        run_id: SyncRunId,
        message: &ProcessSynchronization,
        cancel: &CancellationToken,
    ) -> Result<SynchronizationReport, ListenerError> {
        let scope = SynchronizationScope::of(message)?;
        let repositories = self.resolve(&scope, cancel).await?;
        info!(?scope, count = repositories.len(), "Repositories resolved");

        let mut results = Vec::with_capacity(repositories.len());
        for repository in repositories {
            let configuration = self
                .provider
                .get_configuration_file(repository.id.as_str(), cancel)
                .await?;
            if configuration.is_none() {
                debug!(repository = %repository.name, "No configuration file");
            }

            let result = RepositorySynchronization {
                repository,
                configuration,
                trigger: message.trigger,
            };
            self.sink.synchronized(&result).await?;
            results.push(result);
        }

        Ok(SynchronizationReport {
            run_id,
            trigger: message.trigger,
            repositories: results,
        })
    }

    async fn resolve(
        &self,
        scope: &SynchronizationScope,
        cancel: &CancellationToken,
    ) -> Result<Vec<Repository>, ListenerError> {
        let provider_id = match scope {
            SynchronizationScope::Project => {
                return Ok(self.provider.get_repositories(cancel).await?);
            }
            SynchronizationScope::Provider(id) => id.clone(),
            SynchronizationScope::Record(id) => self
                .sink
                .provider_repository_id(id)
                .await?
                .ok_or_else(|| ListenerError::UnknownRepository {
                    repository_id: id.clone(),
                })?,
        };

        let repository = self.provider.get_repository(&provider_id, cancel).await?;
        Ok(vec![repository])
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
