//! The analysis and artifact-generation pipeline
//!
//! [`PipelineOrchestrator`] drives archive → extract → analyze → select →
//! persist → generate → cleanup for one repository id at a time, with every
//! collaborator injected through [`PipelineContext`].

pub mod config;
pub mod context;
mod error;
mod guard;
pub mod orchestrator;
mod scratch;
mod stage;

pub use config::{PipelineConfig, DEFAULT_MAX_FILES};
pub use context::PipelineContext;
pub use error::{ErrorKind, PipelineError, Stage};
pub use guard::{RepoGuard, RepoLocks};
pub use orchestrator::{
    AnalyzeOptions, AnalyzeOutcome, InlineOptions, InlineOutcome, PipelineOrchestrator,
};
pub use scratch::ScratchDir;
pub(crate) use stage::{finish, run_stage};
