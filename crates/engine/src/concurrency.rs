//! Fan-out over a fixed argument list.
//!
//! Every argument gets its own tokio task; all tasks are awaited, none is
//! short-circuited by a sibling's failure, and every failure ends up in one
//! [`AggregateError`].

use std::future::Future;

use tokio_util::sync::CancellationToken;

use herald_common::error::{AggregateError, AppError};

/// Run `run` for every argument concurrently and wait for all of them.
///
/// - A token that is already cancelled fails the call before any task starts.
/// - Started tasks are never interrupted; they are expected to check the
///   token themselves at I/O boundaries.
/// - On success the outcomes are returned in argument order.
/// - `label` names each branch in the aggregated error.
pub async fn run_concurrently<A, T, F, Fut, L>(
    cancel: &CancellationToken,
    args: Vec<A>,
    label: L,
    run: F,
) -> Result<Vec<T>, AppError>
where
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
    L: Fn(usize, &A) -> String,
{
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled(
            "fan-out aborted before start: context already cancelled".to_string(),
        ));
    }
    if args.is_empty() {
        return Ok(Vec::new());
    }

    let total = args.len();
    let mut labels = Vec::with_capacity(total);
    let mut handles = Vec::with_capacity(total);
    for (ix, arg) in args.into_iter().enumerate() {
        labels.push(label(ix, &arg));
        handles.push(tokio::spawn(run(arg)));
    }

    let mut outcomes = Vec::with_capacity(total);
    let mut failures = AggregateError::new(total);
    for (handle, label) in handles.into_iter().zip(labels) {
        match handle.await {
            Ok(Ok(value)) => outcomes.push(value),
            Ok(Err(e)) => failures.push(label, e),
            Err(join_err) => failures.push(
                label,
                AppError::Internal(format!("task did not complete: {join_err}")),
            ),
        }
    }

    failures.into_result()?;
    Ok(outcomes)
}
