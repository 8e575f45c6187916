use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use workflow::testing::{FakeConnector, FakeDevOps, ManualClock};
use workflow::{ConnectionCache, ProviderError, Secret, WorkflowOptions, DEFAULT_CONNECTION_TTL};

use super::*;
use crate::SinkError;

#[derive(Default)]
struct RecordingSink {
    records: HashMap<String, String>,
    seen: Mutex<Vec<RepositorySynchronization>>,
    fail: bool,
}

impl RecordingSink {
    fn with_record(mut self, record: &str, provider_id: &str) -> Self {
        self.records.insert(record.into(), provider_id.into());
        self
    }

    fn seen(&self) -> Vec<RepositorySynchronization> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SynchronizationSink for RecordingSink {
    async fn provider_repository_id(
        &self,
        repository_id: &str,
    ) -> Result<Option<String>, SinkError> {
        Ok(self.records.get(repository_id).cloned())
    }

    async fn synchronized(&self, result: &RepositorySynchronization) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::new("database unavailable"));
        }
        self.seen.lock().unwrap().push(result.clone());
        Ok(())
    }
}

fn processor(devops: &FakeDevOps, sink: Arc<RecordingSink>) -> SynchronizationProcessor {
    let settings = WorkflowOptions {
        project_url: Some("https://dev.azure.com/contoso/Fabrikam".into()),
        project_token: Some(Secret::new("pat")),
        webhook_endpoint: Some("https://bot.example.com/webhooks/azure".into()),
        subscription_password: Some(Secret::new("s3cret")),
        configuration_file_paths: Some(vec!["/a.yml".into(), "/b.yml".into()]),
    }
    .validate()
    .unwrap();

    let cache = Arc::new(ConnectionCache::new(
        Arc::new(FakeConnector::new(devops.clone())),
        Arc::new(ManualClock::new()),
        DEFAULT_CONNECTION_TTL,
    ));
    SynchronizationProcessor::new(Arc::new(DevOpsProvider::new(settings, cache)), sink)
}

fn devops() -> FakeDevOps {
    let devops = FakeDevOps::new();
    devops.add_repository("repo-2", "web");
    devops.add_repository("repo-1", "api");
    devops.add_file("repo-1", "/b.yml", "version: 2");
    devops
}

#[tokio::test]
async fn test_project_scope_visits_every_repository_in_name_order() {
    let devops = devops();
    let sink = Arc::new(RecordingSink::default());
    let processor = processor(&devops, sink.clone());

    let report = processor
        .process(
            &ProcessSynchronization::new(true, None, None),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let names: Vec<_> = report
        .repositories
        .iter()
        .map(|r| r.repository.name.as_str())
        .collect();
    assert_eq!(names, ["api", "web"]);
    assert_eq!(
        report.repositories[0]
            .configuration
            .as_ref()
            .map(|c| c.path.as_str()),
        Some("/b.yml")
    );
    assert_eq!(report.repositories[1].configuration, None);
    assert!(report.repositories.iter().all(|r| r.trigger));
    assert_eq!(sink.seen(), report.repositories);
}

#[tokio::test]
async fn test_provider_scope_fetches_one_repository() {
    let devops = devops();
    let sink = Arc::new(RecordingSink::default());
    let processor = processor(&devops, sink.clone());

    let report = processor
        .process(
            &ProcessSynchronization::new(false, None, Some("repo-1".into())),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.repositories.len(), 1);
    assert_eq!(report.repositories[0].repository.name, "api");
    assert_eq!(devops.call_count("list_repositories"), 0);
}

#[tokio::test]
async fn test_record_scope_is_translated_by_the_sink() {
    let devops = devops();
    let sink = Arc::new(RecordingSink::default().with_record("42", "repo-2"));
    let processor = processor(&devops, sink.clone());

    let report = processor
        .process(
            &ProcessSynchronization::new(false, Some("42".into()), None),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.repositories[0].repository.name, "web");
    assert!(devops.calls().contains(&"get_repository:repo-2".to_string()));
}

#[tokio::test]
async fn test_unknown_record_fails_without_remote_calls() {
    let devops = devops();
    let processor = processor(&devops, Arc::new(RecordingSink::default()));

    let error = processor
        .process(
            &ProcessSynchronization::new(false, Some("7".into()), None),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, ListenerError::UnknownRepository { .. }));
    assert!(devops.calls().is_empty());
}

#[tokio::test]
async fn test_ambiguous_trigger_is_rejected() {
    let devops = devops();
    let processor = processor(&devops, Arc::new(RecordingSink::default()));

    let error = processor
        .process(
            &ProcessSynchronization::new(false, Some("42".into()), Some("repo-1".into())),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, ListenerError::AmbiguousScope { .. }));
    assert!(devops.calls().is_empty());
}

#[tokio::test]
async fn test_json_body_uses_camel_case_fields() {
    let devops = devops();
    let processor = processor(&devops, Arc::new(RecordingSink::default()));

    let report = processor
        .process_json(
            br#"{"trigger":true,"repositoryProviderId":"repo-2"}"#,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(report.trigger);
    assert_eq!(report.repositories[0].repository.id.as_str(), "repo-2");
}

#[tokio::test]
async fn test_malformed_json_is_invalid_message() {
    let devops = devops();
    let processor = processor(&devops, Arc::new(RecordingSink::default()));

    let error = processor
        .process_json(b"{not json", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, ListenerError::InvalidMessage { .. }));
}

#[tokio::test]
async fn test_sink_failure_aborts_the_run() {
    let devops = devops();
    let sink = Arc::new(RecordingSink {
        fail: true,
        ..Default::default()
    });
    let processor = processor(&devops, sink);

    let error = processor
        .process(
            &ProcessSynchronization::new(false, None, None),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, ListenerError::Sink(_)));
    assert_eq!(devops.call_count("get_item"), 2);
}

#[tokio::test]
async fn test_listing_failure_surfaces_as_workflow_error() {
    let devops = devops();
    devops.fail(
        "list_repositories",
        ProviderError::Api {
            status: 500,
            message: "boom".into(),
            retry_after: None,
        },
    );
    let processor = processor(&devops, Arc::new(RecordingSink::default()));

    let error = processor
        .process(&ProcessSynchronization::default(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, ListenerError::Workflow(_)));
    assert!(matches!(
        error.retry_policy(),
        workflow::RetryPolicy::Retryable { .. }
    ));
}

#[tokio::test]
async fn test_run_drains_channel_and_skips_failures() {
    let devops = devops();
    let sink = Arc::new(RecordingSink::default());
    let processor = processor(&devops, sink.clone());
    let (tx, rx) = mpsc::channel(4);

    tx.send(ProcessSynchronization::new(false, Some("1".into()), Some("2".into())))
        .await
        .unwrap();
    tx.send(ProcessSynchronization::new(false, None, Some("repo-1".into())))
        .await
        .unwrap();
    drop(tx);

    processor.run(rx, &CancellationToken::new()).await;

    let seen = sink.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].repository.name, "api");
}

#[tokio::test]
async fn test_run_stops_on_cancellation() {
    let devops = devops();
    let processor = processor(&devops, Arc::new(RecordingSink::default()));
    let (_tx, rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    tokio::time::timeout(Duration::from_secs(5), processor.run(rx, &cancel))
        .await
        .unwrap();
}
