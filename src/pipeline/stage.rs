//! Timed stage execution shared by the orchestrator and deployment manager

use super::error::{ErrorKind, PipelineError, Stage};
use crate::progress::{ProgressEvent, ProgressHandler};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::error;

/// Runs `fut` under `timeout`, reporting progress and tagging failures with
/// `stage` and `repo_id`. A timeout fails with `timeout_kind`.
pub(crate) async fn run_stage<T, F>(
    progress: &dyn ProgressHandler,
    repo_id: &str,
    stage: Stage,
    timeout: Duration,
    timeout_kind: ErrorKind,
    fut: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    progress.on_progress(&ProgressEvent::StageStarted {
        repo_id: repo_id.to_string(),
        stage,
    });
    let start = Instant::now();

    let result = match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::timed_out(
            timeout_kind,
            stage,
            timeout.as_secs(),
        )),
    };

    match result {
        Ok(value) => {
            progress.on_progress(&ProgressEvent::StageComplete {
                repo_id: repo_id.to_string(),
                stage,
                duration: start.elapsed(),
            });
            Ok(value)
        }
        Err(e) => {
            error!(repo_id = %repo_id, stage = %stage, kind = %e.kind, error = %e, "Stage failed");
            Err(e.at(stage).for_repo(repo_id))
        }
    }
}

/// Emits the terminal progress event for an operation and passes `result` through
pub(crate) fn finish<T>(
    progress: &dyn ProgressHandler,
    repo_id: &str,
    start: Instant,
    result: Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    match &result {
        Ok(_) => progress.on_progress(&ProgressEvent::Completed {
            repo_id: repo_id.to_string(),
            total_time: start.elapsed(),
        }),
        Err(e) => progress.on_progress(&ProgressEvent::Failed {
            repo_id: repo_id.to_string(),
            stage: e.stage,
            error: e.message.clone(),
        }),
    }
    result
}
