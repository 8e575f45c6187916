//! Configuration file discovery.
//!
//! Candidate paths are tried in order and the first file that exists wins.
//! A failed probe only means "not at this path": "not found" is expected, and
//! any other remote failure is logged at `warn` and skipped as well, so a
//! single broken path never hides a valid file further down the list.
//! Cancellation is the one failure that ends the search.

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::cancellation::guard;
use crate::{ConfigFileItem, DevOpsClient, WorkflowError};

/// Returns the first of `candidate_paths` that exists in `repository`, read
/// at the latest processed change, or `None` if none do.
///
/// # Errors
///
/// Only [`WorkflowError::Cancelled`].
#[instrument(skip(client, candidate_paths, cancel))]
pub async fn find_config_file(
    client: &dyn DevOpsClient,
    project: &str,
    repository: &str,
    candidate_paths: &[String],
    cancel: &CancellationToken,
) -> Result<Option<ConfigFileItem>, WorkflowError> {
    for path in candidate_paths {
        match guard(cancel, "get_item", client.get_item(project, repository, path)).await? {
            Ok(item) if item.exists => {
                debug!(path = %path, "Configuration file found");
                return Ok(Some(item));
            }
            Ok(_) => debug!(path = %path, "Configuration file absent"),
            Err(e) if e.is_not_found() => debug!(path = %path, "Configuration file absent"),
            Err(e) => warn!(path = %path, error = %e, "Probe failed; trying next path"),
        }
    }

    Ok(None)
}

#[cfg(test)]
#[path = "config_file_tests.rs"]
mod tests;
