//! Repository enumeration.

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::cancellation::guard;
use crate::{DevOpsClient, Repository, WorkflowError};

/// Lists every repository in `project`, sorted by name.
///
/// Ordering is ordinal (byte-wise), so `"B"` sorts before `"a"`.
#[instrument(skip(client, cancel))]
pub async fn list_repositories(
    client: &dyn DevOpsClient,
    project: &str,
    cancel: &CancellationToken,
) -> Result<Vec<Repository>, WorkflowError> {
    let mut repositories = guard(cancel, "list_repositories", client.list_repositories(project))
        .await?
        .map_err(WorkflowError::remote("list_repositories"))?;

    repositories.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(count = repositories.len(), "Listed repositories");
    Ok(repositories)
}

/// Fetches a single repository by id or name.
#[instrument(skip(client, cancel))]
pub async fn get_repository(
    client: &dyn DevOpsClient,
    project: &str,
    repository: &str,
    cancel: &CancellationToken,
) -> Result<Repository, WorkflowError> {
    guard(cancel, "get_repository", client.get_repository(project, repository))
        .await?
        .map_err(WorkflowError::remote("get_repository"))
}
