//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { repo_id, operation } => {
                info!(repo_id = %repo_id, operation = %operation, "Starting operation");
            }
            ProgressEvent::StageStarted { repo_id, stage } => {
                debug!(repo_id = %repo_id, stage = %stage, "Starting stage");
            }
            ProgressEvent::StageComplete {
                repo_id,
                stage,
                duration,
            } => {
                info!(
                    repo_id = %repo_id,
                    stage = %stage,
                    duration_ms = duration.as_millis() as u64,
                    "Stage complete"
                );
            }
            ProgressEvent::SelectionDegraded { repo_id, reason } => {
                warn!(repo_id = %repo_id, reason = %reason, "File selection degraded to pattern matching");
            }
            ProgressEvent::Completed {
                repo_id,
                total_time,
            } => {
                info!(
                    repo_id = %repo_id,
                    total_time_ms = total_time.as_millis() as u64,
                    "Operation complete"
                );
            }
            ProgressEvent::Failed {
                repo_id,
                stage,
                error,
            } => match stage {
                Some(stage) => warn!(repo_id = %repo_id, stage = %stage, error = %error, "Operation failed"),
                None => warn!(repo_id = %repo_id, error = %error, "Operation failed"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Stage;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;
        let events = vec![
            ProgressEvent::Started {
                repo_id: "r1".to_string(),
                operation: "deploy".to_string(),
            },
            ProgressEvent::StageStarted {
                repo_id: "r1".to_string(),
                stage: Stage::Build,
            },
            ProgressEvent::StageComplete {
                repo_id: "r1".to_string(),
                stage: Stage::Build,
                duration: Duration::from_millis(10),
            },
            ProgressEvent::SelectionDegraded {
                repo_id: "r1".to_string(),
                reason: "empty ranking".to_string(),
            },
            ProgressEvent::Completed {
                repo_id: "r1".to_string(),
                total_time: Duration::from_secs(2),
            },
            ProgressEvent::Failed {
                repo_id: "r1".to_string(),
                stage: Some(Stage::Run),
                error: "port in use".to_string(),
            },
            ProgressEvent::Failed {
                repo_id: "r1".to_string(),
                stage: None,
                error: "busy".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
