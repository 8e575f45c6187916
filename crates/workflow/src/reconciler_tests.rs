use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use super::*;
use crate::catalog::{EVENT_TYPE_PULL_REQUEST_COMMENT, EVENT_TYPE_PUSH};
use crate::testing::{existing_subscription, FakeDevOps};
use crate::SUBSCRIPTION_CATALOG;

const WEBHOOK: &str = "https://bot.example.com/webhooks/azure";

fn reconciler(webhook: &str) -> SubscriptionReconciler {
    SubscriptionReconciler::new(Url::parse(webhook).unwrap(), Secret::new("s3cret"))
}

fn project_id() -> ProjectId {
    ProjectId::new("project-1").unwrap()
}

// ---------------------------------------------------------------------------
// Input derivation
// ---------------------------------------------------------------------------

#[test]
fn test_merged_publisher_inputs_restrict_to_conflicts() {
    let inputs = publisher_inputs(EVENT_TYPE_PULL_REQUEST_MERGED, &project_id());
    assert_eq!(inputs.get("mergeResult").map(String::as_str), Some("Conflicts"));
    assert_eq!(inputs.get("projectId").map(String::as_str), Some("project-1"));
    assert!(!inputs.contains_key("notificationType"));
}

#[test]
fn test_updated_publisher_inputs_restrict_to_status_updates() {
    let inputs = publisher_inputs(EVENT_TYPE_PULL_REQUEST_UPDATED, &project_id());
    assert_eq!(
        inputs.get("notificationType").map(String::as_str),
        Some("StatusUpdateNotification")
    );
    assert!(!inputs.contains_key("mergeResult"));
}

#[test]
fn test_other_events_only_carry_project() {
    for event_type in [EVENT_TYPE_PUSH, EVENT_TYPE_PULL_REQUEST_COMMENT] {
        let inputs = publisher_inputs(event_type, &project_id());
        assert_eq!(inputs.len(), 1);
        assert!(inputs.contains_key("projectId"));
    }
}

#[test]
fn test_consumer_inputs() {
    let inputs = reconciler(WEBHOOK).consumer_inputs();
    assert_eq!(inputs["detailedMessagesToSend"], "none");
    assert_eq!(inputs["messagesToSend"], "none");
    assert_eq!(inputs["url"], WEBHOOK);
    assert_eq!(inputs["basicAuthUsername"], "vsts");
    assert_eq!(inputs["basicAuthPassword"], "s3cret");
}

#[test]
fn test_same_endpoint_ignores_default_port_and_trailing_slash() {
    let stored = Url::parse("https://host/hook").unwrap();
    let desired = Url::parse("https://host:443/hook/").unwrap();
    assert!(same_endpoint(&stored, &desired));
    assert!(same_endpoint(
        &Url::parse("https://HOST/hook").unwrap(),
        &stored
    ));
}

#[test]
fn test_same_endpoint_detects_real_differences() {
    let stored = Url::parse("https://host/hook").unwrap();
    for other in [
        "http://host/hook",
        "https://host:8443/hook",
        "https://other/hook",
        "https://host/hooks",
        "https://host/hook?x=1",
    ] {
        assert!(
            !same_endpoint(&stored, &Url::parse(other).unwrap()),
            "{other} should not match"
        );
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_creates_every_catalog_entry_when_none_exist() {
    let devops = FakeDevOps::new();
    let ids = reconciler(WEBHOOK)
        .reconcile(&devops, &SUBSCRIPTION_CATALOG, "Fabrikam", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids.len(), SUBSCRIPTION_CATALOG.len());
    assert_eq!(devops.call_count("create_subscription"), 4);
    assert_eq!(devops.call_count("update_subscription"), 0);
    assert_eq!(devops.call_count("get_project"), 1);

    let created = devops.subscriptions();
    for (entry, id) in SUBSCRIPTION_CATALOG.iter().zip(&ids) {
        let subscription = created.iter().find(|s| s.id.as_ref() == Some(id)).unwrap();
        assert_eq!(subscription.event_type, entry.event_type);
        assert_eq!(subscription.resource_version, entry.resource_version);
        assert_eq!(subscription.publisher_id, "tfs");
        assert_eq!(subscription.consumer_id, "webHooks");
        assert_eq!(subscription.consumer_action_id, "httpRequest");
        assert_eq!(subscription.publisher_inputs["projectId"], "project-1");
    }
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let devops = FakeDevOps::new();
    let reconciler = reconciler(WEBHOOK);
    let cancel = CancellationToken::new();

    let first = reconciler
        .reconcile(&devops, &SUBSCRIPTION_CATALOG, "Fabrikam", &cancel)
        .await
        .unwrap();
    let second = reconciler
        .reconcile(&devops, &SUBSCRIPTION_CATALOG, "Fabrikam", &cancel)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(devops.subscriptions().len(), 4);
    assert_eq!(devops.call_count("create_subscription"), 4);
    assert_eq!(devops.call_count("update_subscription"), 4);
}

#[tokio::test]
async fn test_existing_subscription_matched_by_uri_is_updated_in_place() {
    let devops = FakeDevOps::new();
    let existing_id = devops.add_subscription(existing_subscription(
        EVENT_TYPE_PUSH,
        &devops.project_id(),
        "https://host/hook",
    ));

    let ids = reconciler("https://host:443/hook/")
        .reconcile(&devops, &SUBSCRIPTION_CATALOG, "Fabrikam", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids[0], existing_id);
    assert_eq!(devops.call_count("update_subscription"), 1);
    assert_eq!(devops.call_count("create_subscription"), 3);

    let updated = devops
        .subscriptions()
        .into_iter()
        .find(|s| s.id.as_ref() == Some(&existing_id))
        .unwrap();
    assert_eq!(updated.resource_version, "1.0");
    assert_eq!(updated.consumer_inputs["basicAuthUsername"], "vsts");
    assert_eq!(updated.publisher_id, "tfs");
}

#[tokio::test]
async fn test_subscription_for_other_endpoint_is_left_alone() {
    let devops = FakeDevOps::new();
    let foreign = existing_subscription(
        EVENT_TYPE_PUSH,
        &devops.project_id(),
        "https://someone-else.example.com/hook",
    );
    let foreign_id = devops.add_subscription(foreign.clone());

    let ids = reconciler(WEBHOOK)
        .reconcile(&devops, &SUBSCRIPTION_CATALOG, "Fabrikam", &CancellationToken::new())
        .await
        .unwrap();

    assert!(!ids.contains(&foreign_id));
    let untouched = devops
        .subscriptions()
        .into_iter()
        .find(|s| s.id.as_ref() == Some(&foreign_id))
        .unwrap();
    assert_eq!(untouched.consumer_inputs, foreign.consumer_inputs);
}

#[tokio::test]
async fn test_ids_follow_catalog_order_regardless_of_completion_order() {
    let devops = FakeDevOps::new();
    devops.delay_event(EVENT_TYPE_PUSH, Duration::from_millis(60));
    devops.delay_event(EVENT_TYPE_PULL_REQUEST_UPDATED, Duration::from_millis(30));

    let ids = reconciler(WEBHOOK)
        .reconcile(&devops, &SUBSCRIPTION_CATALOG, "Fabrikam", &CancellationToken::new())
        .await
        .unwrap();

    // The push entry finished last, so it was assigned the last id...
    let creates: Vec<_> = devops
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("create_subscription"))
        .collect();
    assert_eq!(creates.last().unwrap(), "create_subscription:git.push");

    // ...but it is still reported first.
    let subscriptions = devops.subscriptions();
    for (entry, id) in SUBSCRIPTION_CATALOG.iter().zip(&ids) {
        let subscription = subscriptions
            .iter()
            .find(|s| s.id.as_ref() == Some(id))
            .unwrap();
        assert_eq!(subscription.event_type, entry.event_type);
    }
}

#[tokio::test]
async fn test_remote_failure_propagates() {
    let devops = FakeDevOps::new();
    devops.fail(
        "create_subscription",
        ProviderError::Unauthorized {
            message: "missing scope".into(),
        },
    );

    let result = reconciler(WEBHOOK)
        .reconcile(&devops, &SUBSCRIPTION_CATALOG, "Fabrikam", &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(WorkflowError::Remote {
            operation: "create_subscription",
            ..
        })
    ));
}

#[tokio::test]
async fn test_query_failure_stops_before_any_write() {
    let devops = FakeDevOps::new();
    devops.fail(
        "query_subscriptions",
        ProviderError::Transport {
            message: "reset".into(),
        },
    );

    let result = reconciler(WEBHOOK)
        .reconcile(&devops, &SUBSCRIPTION_CATALOG, "Fabrikam", &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(devops.call_count("create_subscription"), 0);
    assert_eq!(devops.call_count("update_subscription"), 0);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let devops = FakeDevOps::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = reconciler(WEBHOOK)
        .reconcile(&devops, &SUBSCRIPTION_CATALOG, "Fabrikam", &cancel)
        .await;

    assert!(matches!(
        result,
        Err(WorkflowError::Cancelled {
            operation: "get_project"
        })
    ));
    assert!(devops.calls().is_empty());
}
