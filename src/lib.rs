//! repoforge - repositories in, callable tools and container images out
//!
//! A repository is snapshotted, analyzed, reduced to its most important files and
//! handed to a code-intelligence backend that produces tool definitions,
//! developer documentation and a build recipe. The result is kept in a record
//! store and can be deployed as a container.
//!
//! # Example Usage
//!
//! ```no_run
//! use repoforge::pipeline::{AnalyzeOptions, PipelineConfig, PipelineContext, PipelineOrchestrator};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), repoforge::PipelineError> {
//! let orchestrator = PipelineOrchestrator::new(PipelineContext::offline(PipelineConfig::default()));
//! let outcome = orchestrator
//!     .analyze_and_generate("demo", Path::new("./demo"), AnalyzeOptions::default())
//!     .await?;
//! println!("{} tools generated", outcome.record.generated_tools.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`archive`]: workspace snapshots
//! - [`analyzer`]: extraction, language/framework detection, important-file scoring
//! - [`intelligence`] and [`llm`]: tool, documentation and recipe generation
//! - [`selector`]: important-file selection with pattern fallback
//! - [`store`]: repository records
//! - [`pipeline`]: the analyze-and-generate orchestration
//! - [`deploy`]: container build, run and lifecycle
//! - [`tools`]: the tool-call surface and its stdio server

pub mod analyzer;
pub mod archive;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod intelligence;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod selector;
pub mod store;
pub mod tools;
pub mod util;

pub use analyzer::{AnalysisResult, RepositoryAnalyzer, StaticAnalyzer};
pub use config::{ConfigError, ForgeConfig};
pub use deploy::{ContainerRuntime, DeploymentManager, DockerRuntime, StubRuntime};
pub use intelligence::{CodeIntelligence, LlmIntelligence, TemplateIntelligence};
pub use llm::{BackendError, GenAIClient, LLMClient};
pub use pipeline::{ErrorKind, PipelineError, PipelineOrchestrator};
pub use selector::{FileSelector, Selection, SelectionSource};
pub use store::{MemoryRecordStore, RecordStore, RepositoryRecord};
pub use tools::{ToolResponse, ToolServer, ToolSystem};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_repoforge() {
        assert_eq!(NAME, "repoforge");
    }
}
