//! Response envelopes of the Azure DevOps REST API.
//!
//! Only the fields this adapter reads are declared; serde ignores the rest.
//! Subscriptions and repositories deserialise straight into the `workflow`
//! types, which already use the API's camelCase shape.

use serde::Deserialize;
use workflow::{CommitSha, ConfigFileItem, Repository, Subscription};

/// `{ "count": n, "value": [...] }` list envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    pub value: Vec<T>,
}

pub(crate) type RepositoryList = ListResponse<Repository>;

/// Response of `POST _apis/hooks/subscriptionsquery`.
#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionsQueryResponse {
    #[serde(default)]
    pub results: Vec<Subscription>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeamProject {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GitItem {
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub latest_processed_change: Option<GitCommitRef>,
    #[serde(default)]
    pub commit_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GitCommitRef {
    pub commit_id: String,
}

impl GitItem {
    /// Folders are reported as items too; they never count as a file.
    pub(crate) fn into_config_file(self) -> ConfigFileItem {
        let commit_id = self
            .latest_processed_change
            .map(|change| change.commit_id)
            .or(self.commit_id)
            .and_then(CommitSha::new);

        ConfigFileItem {
            exists: !self.is_folder,
            path: self.path,
            content: self.content.unwrap_or_default(),
            commit_id,
        }
    }
}
