use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_FILES: usize = 20;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// `maxFiles` used when a call does not supply one
    pub max_files: usize,
    /// Bound on archive, extract, analyze, build and run
    pub stage_timeout: Duration,
    /// Bound on a single code-intelligence request
    pub request_timeout: Duration,
    /// Parent of the per-run scratch directories
    pub scratch_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            stage_timeout: Duration::from_secs(120),
            request_timeout: Duration::from_secs(60),
            scratch_dir: std::env::temp_dir().join("repoforge-scratch"),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    /// Generation makes up to four model requests
    pub fn generation_timeout(&self) -> Duration {
        self.request_timeout * 4
    }
}
