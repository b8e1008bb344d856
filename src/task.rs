use std::future::Future;

use tokio::task::JoinHandle;

/// Spawn a detached background task whose failure can never reach the
/// caller. A panic inside `fut` is caught by a supervising task and logged.
///
/// The returned handle belongs to the supervisor and only resolves once the
/// work has finished; callers normally drop it.
pub fn spawn_supervised<F>(name: &'static str, fut: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let work = tokio::spawn(fut);

    tokio::spawn(async move {
        if let Err(e) = work.await {
            if e.is_panic() {
                tracing::error!(task = name, "Background task panicked");
            } else {
                tracing::warn!(task = name, error = %e, "Background task was cancelled");
            }
        }
    })
}
