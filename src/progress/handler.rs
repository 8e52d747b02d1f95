//! Progress handler trait and events

use crate::pipeline::Stage;
use std::time::Duration;

/// Events emitted while a pipeline or deployment operation runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started { repo_id: String, operation: String },

    StageStarted { repo_id: String, stage: Stage },

    StageComplete {
        repo_id: String,
        stage: Stage,
        duration: Duration,
    },

    /// Intelligent file selection fell back to pattern selection
    SelectionDegraded { repo_id: String, reason: String },

    Completed { repo_id: String, total_time: Duration },

    Failed {
        repo_id: String,
        stage: Option<Stage>,
        error: String,
    },
}

pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
