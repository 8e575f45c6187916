//! Facade over the core components for one configured project.
//!
//! Every operation first obtains an authenticated handle from the shared
//! [`ConnectionCache`], then delegates to the matching component.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    config_file, repositories, ConfigFileItem, ConnectionCache, ConnectionHandle, Repository,
    SubscriptionId, SubscriptionReconciler, WorkflowError, WorkflowSettings, SUBSCRIPTION_CATALOG,
};

pub struct DevOpsProvider {
    settings: WorkflowSettings,
    connections: Arc<ConnectionCache>,
    reconciler: SubscriptionReconciler,
}

impl DevOpsProvider {
    pub fn new(settings: WorkflowSettings, connections: Arc<ConnectionCache>) -> Self {
        let reconciler = SubscriptionReconciler::new(
            settings.webhook_endpoint.clone(),
            settings.subscription_password.clone(),
        );
        Self {
            settings,
            connections,
            reconciler,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Reconciles [`SUBSCRIPTION_CATALOG`] and returns the subscription ids in
    /// catalog order.
    #[instrument(skip_all, fields(project = %self.settings.project_url))]
    pub async fn create_or_update_subscriptions(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<SubscriptionId>, WorkflowError> {
        let client = self.connect(cancel).await?;
        self.reconciler
            .reconcile(
                client.as_ref(),
                &SUBSCRIPTION_CATALOG,
                self.settings.project_url.project_id_or_name(),
                cancel,
            )
            .await
    }

    #[instrument(skip_all, fields(project = %self.settings.project_url))]
    pub async fn get_repositories(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Repository>, WorkflowError> {
        let client = self.connect(cancel).await?;
        repositories::list_repositories(
            client.as_ref(),
            self.settings.project_url.project_id_or_name(),
            cancel,
        )
        .await
    }

    #[instrument(skip(self, cancel), fields(project = %self.settings.project_url))]
    pub async fn get_repository(
        &self,
        repository_id_or_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Repository, WorkflowError> {
        let client = self.connect(cancel).await?;
        repositories::get_repository(
            client.as_ref(),
            self.settings.project_url.project_id_or_name(),
            repository_id_or_name,
            cancel,
        )
        .await
    }

    /// Probes the configured candidate paths in `repository_id_or_name`.
    #[instrument(skip(self, cancel), fields(project = %self.settings.project_url))]
    pub async fn get_configuration_file(
        &self,
        repository_id_or_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ConfigFileItem>, WorkflowError> {
        let client = self.connect(cancel).await?;
        config_file::find_config_file(
            client.as_ref(),
            self.settings.project_url.project_id_or_name(),
            repository_id_or_name,
            &self.settings.configuration_file_paths,
            cancel,
        )
        .await
    }

    async fn connect(&self, cancel: &CancellationToken) -> Result<ConnectionHandle, WorkflowError> {
        self.connections
            .get_or_create(
                &self.settings.project_url,
                &self.settings.project_token,
                cancel,
            )
            .await
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
