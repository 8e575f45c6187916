//! Port traits implemented by infrastructure crates.
//!
//! The core never talks HTTP. It sees an authenticated [`DevOpsClient`] handed
//! out by a [`DevOpsConnector`], and reads time through a [`Clock`] so cache
//! expiry can be driven deterministically in tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    ConfigFileItem, ProjectId, ProjectUrl, ProviderError, Repository, Secret, Subscription,
    SubscriptionsQuery, Timestamp,
};

/// Shared, authenticated handle to the remote platform.
pub type ConnectionHandle = Arc<dyn DevOpsClient>;

/// Builds authenticated connections.
#[async_trait]
pub trait DevOpsConnector: Send + Sync {
    /// Authenticates against the organisation that owns `project_url` using
    /// basic credentials (empty user name, `token` as password).
    ///
    /// Implementations perform the authentication handshake here so a bad
    /// token fails at connect time rather than on first use.
    async fn connect(
        &self,
        project_url: &ProjectUrl,
        token: &Secret,
    ) -> Result<ConnectionHandle, ProviderError>;
}

/// The narrow slice of the remote API the core needs.
///
/// `project` arguments accept either the project GUID or its display name.
#[async_trait]
pub trait DevOpsClient: Send + Sync {
    /// Resolves a project name (or id) to its identifier.
    async fn get_project_id(&self, project: &str) -> Result<ProjectId, ProviderError>;

    async fn query_subscriptions(
        &self,
        query: &SubscriptionsQuery,
    ) -> Result<Vec<Subscription>, ProviderError>;

    async fn create_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, ProviderError>;

    /// Replaces the mutable fields of an existing subscription. `subscription.id`
    /// must be set.
    async fn update_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, ProviderError>;

    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>, ProviderError>;

    async fn get_repository(
        &self,
        project: &str,
        repository: &str,
    ) -> Result<Repository, ProviderError>;

    /// Fetches a file with content at the latest processed change.
    ///
    /// Returns [`ProviderError::NotFound`] when the path does not exist.
    async fn get_item(
        &self,
        project: &str,
        repository: &str,
        path: &str,
    ) -> Result<ConfigFileItem, ProviderError>;
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
