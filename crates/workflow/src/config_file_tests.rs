use tokio_util::sync::CancellationToken;

use super::*;
use crate::testing::FakeDevOps;
use crate::ProviderError;

fn paths(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}

#[tokio::test]
async fn test_skips_missing_path_and_returns_next() {
    let devops = FakeDevOps::new();
    devops.add_file("repo-1", "/b.yml", "version: 2");

    let item = find_config_file(
        &devops,
        "Fabrikam",
        "repo-1",
        &paths(&["/a.yml", "/b.yml"]),
        &CancellationToken::new(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(item.path, "/b.yml");
    assert_eq!(item.content, "version: 2");
    assert!(item.exists);
}

#[tokio::test]
async fn test_returns_none_when_all_absent() {
    let devops = FakeDevOps::new();

    let item = find_config_file(
        &devops,
        "Fabrikam",
        "repo-1",
        &paths(&["/a.yml", "/b.yml"]),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(item.is_none());
    assert_eq!(devops.call_count("get_item"), 2);
}

#[tokio::test]
async fn test_stops_at_first_hit() {
    let devops = FakeDevOps::new();
    devops.add_file("repo-1", "/a.yml", "first");
    devops.add_file("repo-1", "/b.yml", "second");

    let item = find_config_file(
        &devops,
        "Fabrikam",
        "repo-1",
        &paths(&["/a.yml", "/b.yml"]),
        &CancellationToken::new(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(item.content, "first");
    assert_eq!(devops.calls(), vec!["get_item:/a.yml"]);
}

#[tokio::test]
async fn test_other_probe_errors_are_treated_as_absent() {
    let devops = FakeDevOps::new();
    devops.fail_file(
        "repo-1",
        "/a.yml",
        ProviderError::Api {
            status: 500,
            message: "boom".into(),
            retry_after: None,
        },
    );
    devops.add_file("repo-1", "/b.yml", "found");

    let item = find_config_file(
        &devops,
        "Fabrikam",
        "repo-1",
        &paths(&["/a.yml", "/b.yml"]),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(item.map(|i| i.content), Some("found".to_string()));
}

#[tokio::test]
async fn test_cancellation_aborts_probe() {
    let devops = FakeDevOps::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = find_config_file(
        &devops,
        "Fabrikam",
        "repo-1",
        &paths(&["/a.yml"]),
        &cancel,
    )
    .await;

    assert!(matches!(result, Err(WorkflowError::Cancelled { .. })));
    assert!(devops.calls().is_empty());
}
