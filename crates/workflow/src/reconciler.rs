//! Subscription reconciliation.
//!
//! Makes the remote service hook subscriptions match the desired catalog:
//! one subscription per `(event type, resource version)` entry, delivering to
//! our webhook endpoint. Existing subscriptions are matched on
//! `(event type, consumer url)` and updated in place; missing ones are
//! created. Nothing is ever deleted.
//!
//! The operation is idempotent. Any remote failure aborts the whole run and
//! is returned to the caller, who should treat it as "incomplete, run again".

use std::collections::BTreeMap;

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

use crate::cancellation::guard;
use crate::catalog::{
    BASIC_AUTH_USERNAME, CONSUMER_ACTION_ID, CONSUMER_ID, EVENT_TYPE_PULL_REQUEST_MERGED,
    EVENT_TYPE_PULL_REQUEST_UPDATED, PUBLISHER_ID,
};
use crate::{
    DesiredSubscription, DevOpsClient, InputFilter, InputFilterCondition, InputFilterOperator,
    ProjectId, ProviderError, Secret, Subscription, SubscriptionId, SubscriptionsQuery,
    WorkflowError,
};

const INPUT_PROJECT_ID: &str = "projectId";
const INPUT_NOTIFICATION_TYPE: &str = "notificationType";
const INPUT_MERGE_RESULT: &str = "mergeResult";
const INPUT_URL: &str = "url";

/// Publisher inputs for `event_type`, scoped to `project_id`.
///
/// Pull request updates are narrowed to status updates and merges to those
/// that produced conflicts; every other event type only carries the project.
pub fn publisher_inputs(event_type: &str, project_id: &ProjectId) -> BTreeMap<String, String> {
    let mut inputs = BTreeMap::from([(INPUT_PROJECT_ID.to_string(), project_id.to_string())]);

    if event_type == EVENT_TYPE_PULL_REQUEST_UPDATED {
        inputs.insert(
            INPUT_NOTIFICATION_TYPE.to_string(),
            "StatusUpdateNotification".to_string(),
        );
    }

    if event_type == EVENT_TYPE_PULL_REQUEST_MERGED {
        inputs.insert(INPUT_MERGE_RESULT.to_string(), "Conflicts".to_string());
    }

    inputs
}

/// Returns `true` if two URLs address the same endpoint.
///
/// Compares scheme, host, effective port, path (ignoring one trailing slash)
/// and query. `https://host/hook` and `https://host:443/hook/` are the same
/// endpoint.
pub fn same_endpoint(a: &Url, b: &Url) -> bool {
    fn path(url: &Url) -> &str {
        let p = url.path();
        p.strip_suffix('/').unwrap_or(p)
    }

    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
        && path(a) == path(b)
        && a.query() == b.query()
}

/// Applies the desired catalog against the remote subscription API.
#[derive(Debug, Clone)]
pub struct SubscriptionReconciler {
    webhook_endpoint: Url,
    subscription_password: Secret,
}

impl SubscriptionReconciler {
    pub fn new(webhook_endpoint: Url, subscription_password: Secret) -> Self {
        Self {
            webhook_endpoint,
            subscription_password,
        }
    }

    /// Consumer inputs sent with every created or updated subscription.
    pub fn consumer_inputs(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("detailedMessagesToSend".to_string(), "none".to_string()),
            ("messagesToSend".to_string(), "none".to_string()),
            (INPUT_URL.to_string(), self.webhook_endpoint.to_string()),
            (
                "basicAuthUsername".to_string(),
                BASIC_AUTH_USERNAME.to_string(),
            ),
            (
                "basicAuthPassword".to_string(),
                self.subscription_password.expose().to_string(),
            ),
        ])
    }

    /// Reconciles `desired` for `project` and returns one subscription id per
    /// catalog entry, in catalog order.
    ///
    /// Creates and updates for different entries run concurrently.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::Remote`] for any failed remote call, or a created /
    ///   updated subscription returned without an id.
    /// - [`WorkflowError::Cancelled`] if `cancel` fires.
    #[instrument(skip(self, client, desired, cancel), fields(webhook = %self.webhook_endpoint))]
    pub async fn reconcile(
        &self,
        client: &dyn DevOpsClient,
        desired: &[DesiredSubscription],
        project: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SubscriptionId>, WorkflowError> {
        let project_id = guard(cancel, "get_project", client.get_project_id(project))
            .await?
            .map_err(WorkflowError::remote("get_project"))?;

        let query = SubscriptionsQuery {
            publisher_id: PUBLISHER_ID.to_string(),
            publisher_input_filters: vec![InputFilter {
                conditions: vec![InputFilterCondition {
                    input_id: INPUT_PROJECT_ID.to_string(),
                    operator: InputFilterOperator::Equals,
                    input_value: project_id.to_string(),
                }],
            }],
            consumer_id: CONSUMER_ID.to_string(),
            consumer_action_id: CONSUMER_ACTION_ID.to_string(),
        };
        let existing = guard(cancel, "query_subscriptions", client.query_subscriptions(&query))
            .await?
            .map_err(WorkflowError::remote("query_subscriptions"))?;
        debug!(project_id = %project_id, existing = existing.len(), "Fetched subscriptions");

        let operations = desired
            .iter()
            .map(|entry| self.apply(client, entry, &existing, &project_id, cancel));
        let ids = try_join_all(operations).await?;

        info!(project_id = %project_id, count = ids.len(), "Subscriptions reconciled");
        Ok(ids)
    }

    fn find_existing<'a>(
        &self,
        existing: &'a [Subscription],
        event_type: &str,
    ) -> Option<&'a Subscription> {
        existing.iter().find(|subscription| {
            subscription.event_type == event_type
                && subscription
                    .consumer_inputs
                    .get(INPUT_URL)
                    .and_then(|raw| Url::parse(raw).ok())
                    .is_some_and(|url| same_endpoint(&url, &self.webhook_endpoint))
        })
    }

    async fn apply(
        &self,
        client: &dyn DevOpsClient,
        entry: &DesiredSubscription,
        existing: &[Subscription],
        project_id: &ProjectId,
        cancel: &CancellationToken,
    ) -> Result<SubscriptionId, WorkflowError> {
        let (operation, saved) = match self.find_existing(existing, entry.event_type) {
            Some(current) => {
                let mut updated = current.clone();
                updated.event_type = entry.event_type.to_string();
                updated.resource_version = entry.resource_version.to_string();
                updated.publisher_inputs = publisher_inputs(entry.event_type, project_id);
                updated.consumer_inputs = self.consumer_inputs();

                debug!(event_type = entry.event_type, id = ?updated.id, "Updating subscription");
                let result = guard(
                    cancel,
                    "update_subscription",
                    client.update_subscription(&updated),
                )
                .await?;
                ("update_subscription", result)
            }
            None => {
                let created = Subscription {
                    id: None,
                    event_type: entry.event_type.to_string(),
                    resource_version: entry.resource_version.to_string(),
                    publisher_id: PUBLISHER_ID.to_string(),
                    publisher_inputs: publisher_inputs(entry.event_type, project_id),
                    consumer_id: CONSUMER_ID.to_string(),
                    consumer_action_id: CONSUMER_ACTION_ID.to_string(),
                    consumer_inputs: self.consumer_inputs(),
                    extra: serde_json::Map::new(),
                };

                debug!(event_type = entry.event_type, "Creating subscription");
                let result = guard(
                    cancel,
                    "create_subscription",
                    client.create_subscription(&created),
                )
                .await?;
                ("create_subscription", result)
            }
        };

        saved
            .map_err(WorkflowError::remote(operation))?
            .id
            .ok_or_else(|| WorkflowError::Remote {
                operation,
                source: ProviderError::InvalidResponse {
                    message: format!(
                        "subscription for '{}' returned without an id",
                        entry.event_type
                    ),
                },
            })
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
