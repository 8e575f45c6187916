//! Shared value types for the synchronisation domain.
//!
//! Wire-shaped types ([`Subscription`], [`SubscriptionsQuery`],
//! [`Repository`]) serialise in the camelCase form the Azure DevOps REST API
//! uses, so adapters can pass them through without a mapping layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{CommitSha, RepositoryId, SubscriptionId, WorkflowError};

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// A credential value that must never appear in logs.
///
/// `Debug` and `Display` print a fixed placeholder; the value is only reachable
/// through [`Secret::expose`].
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wraps a credential value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw credential.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the wrapped value is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

// ---------------------------------------------------------------------------
// Project URL
// ---------------------------------------------------------------------------

/// A parsed Azure DevOps project URL.
///
/// Accepted shapes:
///
/// | Shape | Organisation URL |
/// |-------|------------------|
/// | `https://dev.azure.com/{org}/{project}` | `https://dev.azure.com/{org}` |
/// | `https://{org}.visualstudio.com/{project}` | `https://{org}.visualstudio.com` |
/// | `https://{host}/{collection...}/{project}` | `https://{host}/{collection...}` |
///
/// The last path segment is always the project; everything before it is the
/// organisation (or collection) the REST API is rooted at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ProjectUrl {
    value: String,
    organization_url: String,
    project_segment: String,
    project: String,
}

impl ProjectUrl {
    /// Parses and normalises a project URL.
    pub fn parse(value: &str) -> Result<Self, WorkflowError> {
        let invalid = |reason: &str| WorkflowError::Configuration {
            message: format!("invalid project URL '{value}': {reason}"),
        };

        let url = Url::parse(value.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let expected_segments = if host.eq_ignore_ascii_case("dev.azure.com") {
            Some(2)
        } else if host.to_ascii_lowercase().ends_with(".visualstudio.com") {
            Some(1)
        } else {
            None
        };
        match expected_segments {
            Some(n) if segments.len() != n => {
                return Err(invalid(&format!("expected {n} path segment(s)")));
            }
            _ => {}
        }

        let (project_segment, organization_segments) = segments
            .split_last()
            .ok_or_else(|| invalid("missing project segment"))?;
        let project = urlencoding::decode(project_segment)
            .map_err(|e| invalid(&e.to_string()))?
            .into_owned();

        let mut organization = url.clone();
        organization.set_query(None);
        organization.set_fragment(None);
        organization.set_path(&organization_segments.join("/"));
        let organization_url = organization.as_str().trim_end_matches('/').to_string();

        Ok(Self {
            value: format!("{organization_url}/{project_segment}"),
            organization_url,
            project_segment: (*project_segment).to_string(),
            project,
        })
    }

    /// The normalised project URL (no trailing slash, query, or fragment).
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Root URL for organisation-level REST calls, without a trailing slash.
    pub fn organization_url(&self) -> &str {
        &self.organization_url
    }

    /// The project identifier or display name, percent-decoded.
    pub fn project_id_or_name(&self) -> &str {
        &self.project
    }

    /// The project as it appears in the URL path (still percent-encoded).
    pub fn project_path_segment(&self) -> &str {
        &self.project_segment
    }
}

impl TryFrom<String> for ProjectUrl {
    type Error = WorkflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::fmt::Display for ProjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

// ---------------------------------------------------------------------------
// Service hook subscriptions
// ---------------------------------------------------------------------------

/// A service hook subscription as exchanged with the remote platform.
///
/// `id` is `None` only for subscriptions that have not been created yet.
/// Fields this crate does not model (status, audit metadata, ...) are kept in
/// `extra` so an update sends them back unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SubscriptionId>,

    #[serde(default)]
    pub event_type: String,

    #[serde(default)]
    pub resource_version: String,

    /// Immutable after creation.
    #[serde(default)]
    pub publisher_id: String,

    #[serde(default)]
    pub publisher_inputs: BTreeMap<String, String>,

    /// Immutable after creation.
    #[serde(default)]
    pub consumer_id: String,

    /// Immutable after creation.
    #[serde(default)]
    pub consumer_action_id: String,

    #[serde(default)]
    pub consumer_inputs: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Server-side filter for listing subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionsQuery {
    pub publisher_id: String,
    pub publisher_input_filters: Vec<InputFilter>,
    pub consumer_id: String,
    pub consumer_action_id: String,
}

/// A conjunction of input conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFilter {
    pub conditions: Vec<InputFilterCondition>,
}

/// One `input <operator> value` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFilterCondition {
    pub input_id: String,
    pub operator: InputFilterOperator,
    pub input_value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputFilterOperator {
    Equals,
}

// ---------------------------------------------------------------------------
// Repositories and files
// ---------------------------------------------------------------------------

/// Read-only projection of a Git repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
    /// `None` for repositories without any commits.
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// Result of probing one candidate configuration file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigFileItem {
    /// Path as reported by the remote platform.
    pub path: String,
    /// Raw file content; never interpreted by this crate.
    pub content: String,
    pub exists: bool,
    /// Commit of the latest processed change the content was read at.
    pub commit_id: Option<CommitSha>,
}

// ---------------------------------------------------------------------------
// Inbound trigger
// ---------------------------------------------------------------------------

/// Request to synchronise one repository or the whole project.
///
/// When present, exactly one of `repository_id` / `repository_provider_id`
/// should be set. Enforcing that is the consumer's job, not this type's.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSynchronization {
    /// Whether update jobs should be triggered where changes are detected.
    #[serde(default)]
    pub trigger: bool,

    /// Identifier of the repository as stored by the automation service.
    #[serde(default)]
    pub repository_id: Option<String>,

    /// Identifier of the repository as given by the provider.
    #[serde(default)]
    pub repository_provider_id: Option<String>,
}

impl ProcessSynchronization {
    pub fn new(
        trigger: bool,
        repository_id: Option<String>,
        repository_provider_id: Option<String>,
    ) -> Self {
        Self {
            trigger,
            repository_id,
            repository_provider_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Returns this timestamp shifted forward by `by`.
    pub fn plus(self, by: std::time::Duration) -> Self {
        let shifted = chrono::Duration::from_std(by)
            .ok()
            .and_then(|delta| self.0.checked_add_signed(delta));
        Self(shifted.unwrap_or(DateTime::<Utc>::MAX_UTC))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
