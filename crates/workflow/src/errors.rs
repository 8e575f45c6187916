//! Error and retry-policy types for the synchronisation domain.
//!
//! [`ProviderError`] is what port implementations (the Azure DevOps adapter,
//! test fakes) return. [`WorkflowError`] is what the core operations return
//! to their callers; it wraps the provider failure together with the
//! operation that was being attempted.
//!
//! [`RetryPolicy`] is advisory. Nothing in this crate retries; callers decide
//! whether to re-run a whole operation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: transport failures, throttling, server-side 5xx.
/// - `NonRetryable` errors: bad credentials, missing resources, invalid
///   configuration, cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt (e.g. from a
        /// `Retry-After` header). `None` means apply the caller's own
        /// back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried without human intervention.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Port-level errors
// ---------------------------------------------------------------------------

/// Failure reported by a [`crate::DevOpsClient`] or [`crate::DevOpsConnector`].
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The requested resource does not exist (HTTP 404).
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource (path, id, ...).
        resource: String,
    },

    /// The credentials were rejected (HTTP 401/403).
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Message returned by the remote service.
        message: String,
    },

    /// The remote service answered with a non-success status.
    #[error("Remote service returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Body or message returned by the remote service.
        message: String,
        /// Back-off requested by the service, if any.
        retry_after: Option<Duration>,
    },

    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("Transport failure: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The response could not be decoded or lacked a required field.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of what was wrong with the response.
        message: String,
    },
}

impl ProviderError {
    /// Returns `true` for the "resource does not exist" class of failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Advisory retry classification for this failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::Api {
                status,
                retry_after,
                ..
            } if *status == 429 || *status >= 500 => RetryPolicy::Retryable {
                after: *retry_after,
            },
            _ => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Operation-level errors
// ---------------------------------------------------------------------------

/// Errors returned by the synchronisation operations.
///
/// Every variant except [`WorkflowError::Configuration`] is produced after at
/// least one network call was attempted.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Required settings are missing or malformed.
    ///
    /// Produced at load time, before any network call.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// An authenticated connection could not be established.
    ///
    /// Nothing is cached when this is returned.
    #[error("Failed to connect to {organization}")]
    Connection {
        /// Organisation URL the connection was made against.
        organization: String,
        /// Underlying failure.
        #[source]
        source: ProviderError,
    },

    /// A remote call failed while performing `operation`.
    #[error("Remote call '{operation}' failed")]
    Remote {
        /// Short name of the remote call (e.g. `"query_subscriptions"`).
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: ProviderError,
    },

    /// The caller's cancellation token fired while `operation` was in flight.
    #[error("Operation '{operation}' was cancelled")]
    Cancelled {
        /// Short name of the interrupted operation.
        operation: &'static str,
    },
}

impl WorkflowError {
    pub(crate) fn remote(operation: &'static str) -> impl FnOnce(ProviderError) -> Self {
        move |source| Self::Remote { operation, source }
    }

    /// Advisory retry classification for this failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Connection { source, .. } | Self::Remote { source, .. } => source.retry_policy(),
            Self::Configuration { .. } | Self::Cancelled { .. } => RetryPolicy::NonRetryable,
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
