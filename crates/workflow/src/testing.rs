//! In-memory fakes of the port traits.
//!
//! Compiled for this crate's tests and, through the `test-support` feature,
//! for downstream crates' tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::{CONSUMER_ACTION_ID, CONSUMER_ID, PUBLISHER_ID};
use crate::{
    Clock, CommitSha, ConfigFileItem, ConnectionHandle, DevOpsClient, DevOpsConnector, ProjectId,
    ProjectUrl, ProviderError, Repository, RepositoryId, Secret, Subscription, SubscriptionId,
    SubscriptionsQuery, Timestamp,
};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// A [`Clock`] that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Timestamp::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.plus(by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Remote platform
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeState {
    project_id: String,
    subscriptions: Vec<Subscription>,
    repositories: Vec<Repository>,
    files: HashMap<(String, String), Result<String, ProviderError>>,
    failures: HashMap<&'static str, ProviderError>,
    event_delays: HashMap<String, Duration>,
    calls: Vec<String>,
    next_id: usize,
}

/// In-memory stand-in for the remote platform.
///
/// Clones share state, so a test can keep one clone for assertions while the
/// code under test talks to another.
#[derive(Clone)]
pub struct FakeDevOps {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeDevOps {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDevOps {
    pub fn new() -> Self {
        let state = FakeState {
            project_id: "project-1".into(),
            ..FakeState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn project_id(&self) -> ProjectId {
        ProjectId::new(self.state().project_id.clone()).expect("non-empty identifier")
    }

    /// Seeds an existing subscription, assigning an id if it has none.
    pub fn add_subscription(&self, mut subscription: Subscription) -> SubscriptionId {
        let mut state = self.state();
        let id = match subscription.id.clone() {
            Some(id) => id,
            None => next_id(&mut state),
        };
        subscription.id = Some(id.clone());
        state.subscriptions.push(subscription);
        id
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.state().subscriptions.clone()
    }

    pub fn add_repository(&self, id: &str, name: &str) {
        self.state().repositories.push(Repository {
            id: RepositoryId::new(id).expect("non-empty identifier"),
            name: name.into(),
            default_branch: Some("refs/heads/main".into()),
        });
    }

    /// Makes `path` exist in `repository` (matched by id or name).
    pub fn add_file(&self, repository: &str, path: &str, content: &str) {
        self.state()
            .files
            .insert((repository.into(), path.into()), Ok(content.into()));
    }

    /// Makes probing `path` in `repository` fail with `error`.
    pub fn fail_file(&self, repository: &str, path: &str, error: ProviderError) {
        self.state()
            .files
            .insert((repository.into(), path.into()), Err(error));
    }

    /// Makes every call to `operation` (e.g. `"create_subscription"`) fail.
    pub fn fail(&self, operation: &'static str, error: ProviderError) {
        self.state().failures.insert(operation, error);
    }

    /// Delays create/update calls for `event_type`.
    pub fn delay_event(&self, event_type: &str, by: Duration) {
        self.state().event_delays.insert(event_type.into(), by);
    }

    /// Every call made so far, as `operation` or `operation:argument`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.split(':').next() == Some(operation))
            .count()
    }

    fn record(&self, call: String, operation: &'static str) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.calls.push(call);
        match state.failures.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn delay_for(&self, event_type: &str) {
        let delay = self.state().event_delays.get(event_type).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn next_id(state: &mut FakeState) -> SubscriptionId {
    state.next_id += 1;
    SubscriptionId::new(format!("sub-{}", state.next_id)).expect("non-empty identifier")
}

fn matches_query(subscription: &Subscription, query: &SubscriptionsQuery) -> bool {
    subscription.publisher_id == query.publisher_id
        && subscription.consumer_id == query.consumer_id
        && subscription.consumer_action_id == query.consumer_action_id
        && query.publisher_input_filters.iter().all(|filter| {
            filter.conditions.iter().all(|condition| {
                subscription.publisher_inputs.get(&condition.input_id)
                    == Some(&condition.input_value)
            })
        })
}

#[async_trait]
impl DevOpsClient for FakeDevOps {
    async fn get_project_id(&self, project: &str) -> Result<ProjectId, ProviderError> {
        self.record(format!("get_project:{project}"), "get_project")?;
        Ok(self.project_id())
    }

    async fn query_subscriptions(
        &self,
        query: &SubscriptionsQuery,
    ) -> Result<Vec<Subscription>, ProviderError> {
        self.record("query_subscriptions".into(), "query_subscriptions")?;
        Ok(self
            .state()
            .subscriptions
            .iter()
            .filter(|s| matches_query(s, query))
            .cloned()
            .collect())
    }

    async fn create_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, ProviderError> {
        self.delay_for(&subscription.event_type).await;
        self.record(
            format!("create_subscription:{}", subscription.event_type),
            "create_subscription",
        )?;

        let mut state = self.state();
        let mut created = subscription.clone();
        created.id = Some(next_id(&mut state));
        state.subscriptions.push(created.clone());
        Ok(created)
    }

    async fn update_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, ProviderError> {
        self.delay_for(&subscription.event_type).await;
        self.record(
            format!("update_subscription:{}", subscription.event_type),
            "update_subscription",
        )?;

        let mut state = self.state();
        let current = state
            .subscriptions
            .iter_mut()
            .find(|s| s.id.is_some() && s.id == subscription.id)
            .ok_or_else(|| ProviderError::NotFound {
                resource: format!("subscription {:?}", subscription.id),
            })?;

        if current.publisher_id != subscription.publisher_id
            || current.consumer_id != subscription.consumer_id
            || current.consumer_action_id != subscription.consumer_action_id
        {
            return Err(ProviderError::Api {
                status: 400,
                message: "publisher, consumer and action cannot be changed".into(),
                retry_after: None,
            });
        }

        *current = subscription.clone();
        Ok(current.clone())
    }

    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>, ProviderError> {
        self.record(format!("list_repositories:{project}"), "list_repositories")?;
        Ok(self.state().repositories.clone())
    }

    async fn get_repository(
        &self,
        _project: &str,
        repository: &str,
    ) -> Result<Repository, ProviderError> {
        self.record(format!("get_repository:{repository}"), "get_repository")?;
        self.state()
            .repositories
            .iter()
            .find(|r| r.id.as_str() == repository || r.name == repository)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                resource: format!("repository {repository}"),
            })
    }

    async fn get_item(
        &self,
        _project: &str,
        repository: &str,
        path: &str,
    ) -> Result<ConfigFileItem, ProviderError> {
        self.record(format!("get_item:{path}"), "get_item")?;
        let entry = self
            .state()
            .files
            .get(&(repository.to_string(), path.to_string()))
            .cloned();
        match entry {
            Some(Ok(content)) => Ok(ConfigFileItem {
                path: path.into(),
                content,
                exists: true,
                commit_id: CommitSha::new("0123456789abcdef0123456789abcdef01234567"),
            }),
            Some(Err(error)) => Err(error),
            None => Err(ProviderError::NotFound {
                resource: path.into(),
            }),
        }
    }
}

/// Builds a subscription the way an older deployment would have created it.
pub fn existing_subscription(
    event_type: &str,
    project_id: &ProjectId,
    webhook_url: &str,
) -> Subscription {
    Subscription {
        id: None,
        event_type: event_type.into(),
        resource_version: "1.0-preview".into(),
        publisher_id: PUBLISHER_ID.into(),
        publisher_inputs: [("projectId".to_string(), project_id.to_string())].into(),
        consumer_id: CONSUMER_ID.into(),
        consumer_action_id: CONSUMER_ACTION_ID.into(),
        consumer_inputs: [("url".to_string(), webhook_url.to_string())].into(),
        extra: serde_json::Map::new(),
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Connector that hands out a fresh handle to a shared [`FakeDevOps`] on
/// every successful connect.
pub struct FakeConnector {
    devops: FakeDevOps,
    connects: AtomicUsize,
    failure: Mutex<Option<ProviderError>>,
    delay: Option<Duration>,
}

impl FakeConnector {
    pub fn new(devops: FakeDevOps) -> Self {
        Self {
            devops,
            connects: AtomicUsize::new(0),
            failure: Mutex::new(None),
            delay: None,
        }
    }

    /// Makes every connect take `delay` before completing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes connects fail until [`FakeConnector::recover`] is called.
    pub fn fail_with(&self, error: ProviderError) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Number of connect attempts, successful or not.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DevOpsConnector for FakeConnector {
    async fn connect(
        &self,
        _project_url: &ProjectUrl,
        _token: &Secret,
    ) -> Result<ConnectionHandle, ProviderError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match failure {
            Some(error) => Err(error),
            None => Ok(Arc::new(self.devops.clone())),
        }
    }
}
