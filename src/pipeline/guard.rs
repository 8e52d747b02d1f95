//! Single-flight guard keyed by repository id

use super::error::PipelineError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// In-flight repository ids shared by the orchestrator and deployment manager
#[derive(Debug, Clone, Default)]
pub struct RepoLocks {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `repo_id`, failing fast with `Busy` when another operation holds it
    pub fn try_acquire(&self, repo_id: &str) -> Result<RepoGuard, PipelineError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        if !in_flight.insert(repo_id.to_string()) {
            debug!(repo_id = %repo_id, "Rejecting concurrent operation");
            return Err(PipelineError::busy(repo_id));
        }
        Ok(RepoGuard {
            repo_id: repo_id.to_string(),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_busy(&self, repo_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(repo_id)
    }
}

/// Releases the repository id when dropped
#[derive(Debug)]
pub struct RepoGuard {
    repo_id: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Drop for RepoGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.repo_id);
    }
}
