//! Error handling integration tests
//!
//! Covers:
//! - Missing and invalid workspace roots
//! - Archive and extraction failures from swapped-in collaborators
//! - Busy repositories
//! - Code-intelligence transport errors and malformed responses
//! - Configuration errors

use async_trait::async_trait;
use repoforge::analyzer::{validate_relative_path, AnalyzerError};
use repoforge::archive::{ArchiveError, ArchiveHandle, Archiver};
use repoforge::config::{ConfigError, ForgeConfig, IntelligenceMode};
use repoforge::intelligence::LlmIntelligence;
use repoforge::llm::{BackendError, MockLLMClient, MockResponse};
use repoforge::pipeline::{
    AnalyzeOptions, ErrorKind, PipelineConfig, PipelineContext, PipelineOrchestrator, Stage,
};
use repoforge::progress::NoOpHandler;
use repoforge::store::{MemoryRecordStore, RecordStatus};
use repoforge::{StaticAnalyzer, ToolResponse};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use yare::parameterized;

struct BrokenArchiver;

#[async_trait]
impl Archiver for BrokenArchiver {
    async fn create_archive(
        &self,
        source_root: &Path,
        _out_dir: &Path,
    ) -> Result<ArchiveHandle, ArchiveError> {
        Err(ArchiveError::Failed {
            path: source_root.to_path_buf(),
            message: "permission denied".to_string(),
        })
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Hands back a handle to a file that is not a gzip stream
struct GarbageArchiver;

#[async_trait]
impl Archiver for GarbageArchiver {
    async fn create_archive(
        &self,
        _source_root: &Path,
        out_dir: &Path,
    ) -> Result<ArchiveHandle, ArchiveError> {
        let path = out_dir.join("snapshot.tar.gz");
        fs::write(&path, b"definitely not gzip").map_err(|e| ArchiveError::Failed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(ArchiveHandle {
            path,
            entries: 1,
            size_bytes: 19,
        })
    }

    fn name(&self) -> &str {
        "garbage"
    }
}

/// Takes longer than any stage timeout used here
struct SlowArchiver;

#[async_trait]
impl Archiver for SlowArchiver {
    async fn create_archive(
        &self,
        source_root: &Path,
        _out_dir: &Path,
    ) -> Result<ArchiveHandle, ArchiveError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(ArchiveError::SourceNotFound(source_root.to_path_buf()))
    }

    fn name(&self) -> &str {
        "slow"
    }
}

fn repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.go"), "package main\n\nfunc main() {}\n").unwrap();
    fs::write(dir.path().join("go.mod"), "module example.com/demo\n\ngo 1.22\n").unwrap();
    dir
}

fn orchestrator_with(archiver: Arc<dyn Archiver>, config: PipelineConfig) -> PipelineOrchestrator {
    PipelineOrchestrator::new(PipelineContext::new(
        archiver,
        Arc::new(StaticAnalyzer::new()),
        Arc::new(repoforge::TemplateIntelligence::new()),
        Arc::new(MemoryRecordStore::new()),
        Arc::new(NoOpHandler),
        config,
    ))
}

#[tokio::test]
async fn test_workspace_root_not_found() {
    let scratch = TempDir::new().unwrap();
    let orchestrator = PipelineOrchestrator::new(PipelineContext::offline(
        PipelineConfig::default().with_scratch_dir(scratch.path()),
    ));

    let err = orchestrator
        .analyze_and_generate(
            "r1",
            &PathBuf::from("/nonexistent/repository/path"),
            AnalyzeOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InputValidation);
    assert_eq!(err.repo_id.as_deref(), Some("r1"));
}

#[tokio::test]
async fn test_workspace_root_is_a_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("file.txt");
    fs::write(&file, "content").unwrap();
    let scratch = TempDir::new().unwrap();
    let orchestrator = PipelineOrchestrator::new(PipelineContext::offline(
        PipelineConfig::default().with_scratch_dir(scratch.path()),
    ));

    let err = orchestrator
        .analyze_and_generate("r1", &file, AnalyzeOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InputValidation);
}

#[tokio::test]
async fn test_archive_failure_aborts_before_record() {
    let repo = repo();
    let scratch = TempDir::new().unwrap();
    let orchestrator = orchestrator_with(
        Arc::new(BrokenArchiver),
        PipelineConfig::default().with_scratch_dir(scratch.path()),
    );

    let err = orchestrator
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArchiveFailed);
    assert_eq!(err.stage, Some(Stage::Archive));
    assert_eq!(err.repo_id.as_deref(), Some("r1"));
    assert!(orchestrator.get_record("r1").await.is_err());
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_extraction_failure() {
    let repo = repo();
    let scratch = TempDir::new().unwrap();
    let orchestrator = orchestrator_with(
        Arc::new(GarbageArchiver),
        PipelineConfig::default().with_scratch_dir(scratch.path()),
    );

    let err = orchestrator
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ExtractionFailed);
    assert_eq!(err.stage, Some(Stage::Extract));
    assert!(orchestrator.get_record("r1").await.is_err());
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_stage_timeout_names_the_stage() {
    let repo = repo();
    let scratch = TempDir::new().unwrap();
    let orchestrator = orchestrator_with(
        Arc::new(SlowArchiver),
        PipelineConfig::default()
            .with_scratch_dir(scratch.path())
            .with_stage_timeout(Duration::from_millis(50)),
    );

    let err = orchestrator
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArchiveFailed);
    assert_eq!(err.stage, Some(Stage::Archive));
    assert!(err.message.contains("timed out"));
}

#[tokio::test]
async fn test_busy_repository_fails_fast() {
    let repo = repo();
    let scratch = TempDir::new().unwrap();
    let orchestrator = PipelineOrchestrator::new(PipelineContext::offline(
        PipelineConfig::default().with_scratch_dir(scratch.path()),
    ));

    let guard = orchestrator.locks().try_acquire("r1").unwrap();
    let err = orchestrator
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Busy);

    // other ids are unaffected
    orchestrator
        .analyze_and_generate("r2", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap();

    drop(guard);
    orchestrator
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_malformed_generation_is_generation_failed() {
    let repo = repo();
    let scratch = TempDir::new().unwrap();
    let mock = Arc::new(MockLLMClient::new());
    mock.add_response(MockResponse::text(r#"["main.go"]"#));
    mock.add_response(MockResponse::text("I'd rather not produce JSON today."));

    let orchestrator = PipelineOrchestrator::new(PipelineContext::with_defaults(
        Arc::new(LlmIntelligence::new(mock)),
        Arc::new(MemoryRecordStore::new()),
        PipelineConfig::default().with_scratch_dir(scratch.path()),
    ));

    let err = orchestrator
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::GenerationFailed);

    let record = orchestrator.get_record("r1").await.unwrap();
    assert_eq!(record.status, RecordStatus::GenerationFailed);
    assert!(record.generated_tools.is_empty());
    assert!(record.build_recipe.is_none());
}

#[tokio::test]
async fn test_backend_down_degrades_selection_then_fails_generation() {
    let repo = repo();
    let scratch = TempDir::new().unwrap();
    let mock = Arc::new(MockLLMClient::new());
    mock.add_response(MockResponse::error(BackendError::NetworkError {
        message: "connection refused".to_string(),
    }));
    mock.add_response(MockResponse::error(BackendError::NetworkError {
        message: "connection refused".to_string(),
    }));

    let orchestrator = PipelineOrchestrator::new(PipelineContext::with_defaults(
        Arc::new(LlmIntelligence::new(mock)),
        Arc::new(MemoryRecordStore::new()),
        PipelineConfig::default().with_scratch_dir(scratch.path()),
    ));

    let err = orchestrator
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::GenerationFailed);

    let record = orchestrator.get_record("r1").await.unwrap();
    assert!(!record.warnings.is_empty());
    assert!(record.important_files.iter().any(|f| f.path == "go.mod"));
}

#[parameterized(
    parent = { "../secret" },
    nested_parent = { "src/../../etc/passwd" },
    absolute = { "/etc/passwd" },
    empty = { "" },
)]
fn test_escaping_paths_rejected(path: &str) {
    assert!(matches!(
        validate_relative_path(path),
        Err(AnalyzerError::InvalidPath { .. })
    ));
}

#[test]
fn test_failures_render_as_envelopes() {
    let err = repoforge::PipelineError::new(ErrorKind::BuildFailed, "image wouldn't build")
        .at(Stage::Build)
        .for_repo("r1");
    let value = ToolResponse::failure(&err).to_value();
    assert_eq!(value["success"], false);
    assert_eq!(value["kind"], "BuildFailed");
    assert_eq!(value["stage"], "build");
    assert_eq!(value["repoId"], "r1");
    assert_eq!(value["error"], "image wouldn't build");
}

#[test]
#[serial]
fn test_llm_without_credential_fails_closed() {
    let previous = std::env::var("ANTHROPIC_API_KEY").ok();
    std::env::remove_var("ANTHROPIC_API_KEY");

    let config = ForgeConfig {
        intelligence: IntelligenceMode::Llm,
        provider: genai::adapter::AdapterKind::Anthropic,
        model: Some("claude-3-5-haiku-latest".to_string()),
        ..Default::default()
    };
    let result = config.validate();

    if let Some(v) = previous {
        std::env::set_var("ANTHROPIC_API_KEY", v);
    }
    assert!(matches!(
        result,
        Err(ConfigError::MissingCredential {
            env_var: "ANTHROPIC_API_KEY",
            ..
        })
    ));
}

#[test]
fn test_invalid_configuration_values() {
    let config = ForgeConfig {
        max_files: 1001,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationFailed(_))
    ));
}
