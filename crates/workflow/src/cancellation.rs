use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::WorkflowError;

/// Races `future` against `cancel`.
///
/// The future is dropped (aborting any in-flight request) as soon as the token
/// fires. A token that is already cancelled wins without polling the future.
pub(crate) async fn guard<F>(
    cancel: &CancellationToken,
    operation: &'static str,
    future: F,
) -> Result<F::Output, WorkflowError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WorkflowError::Cancelled { operation }),
        output = future => Ok(output),
    }
}
