use std::time::Duration;

use super::*;

#[test]
fn test_transport_failures_are_retryable() {
    let error = ProviderError::Transport {
        message: "connection reset".into(),
    };
    assert_eq!(error.retry_policy(), RetryPolicy::Retryable { after: None });
}

#[test]
fn test_throttling_carries_retry_after() {
    let error = ProviderError::Api {
        status: 429,
        message: "slow down".into(),
        retry_after: Some(Duration::from_secs(30)),
    };
    assert_eq!(
        error.retry_policy(),
        RetryPolicy::Retryable {
            after: Some(Duration::from_secs(30))
        }
    );
}

#[test]
fn test_client_errors_are_not_retryable() {
    let bad_request = ProviderError::Api {
        status: 400,
        message: "bad input".into(),
        retry_after: None,
    };
    let unauthorized = ProviderError::Unauthorized {
        message: "PAT expired".into(),
    };
    assert_eq!(bad_request.retry_policy(), RetryPolicy::NonRetryable);
    assert_eq!(unauthorized.retry_policy(), RetryPolicy::NonRetryable);
}

#[test]
fn test_workflow_error_delegates_to_source() {
    let error = WorkflowError::Remote {
        operation: "create_subscription",
        source: ProviderError::Api {
            status: 503,
            message: "unavailable".into(),
            retry_after: None,
        },
    };
    assert_eq!(error.retry_policy(), RetryPolicy::Retryable { after: None });

    let cancelled = WorkflowError::Cancelled {
        operation: "list_repositories",
    };
    assert_eq!(cancelled.retry_policy(), RetryPolicy::NonRetryable);
}

#[test]
fn test_not_found_classification() {
    assert!(ProviderError::NotFound {
        resource: "/a.yml".into()
    }
    .is_not_found());
    assert!(!ProviderError::Transport {
        message: "timeout".into()
    }
    .is_not_found());
}
