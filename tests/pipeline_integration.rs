//! End-to-end pipeline runs over real temporary repositories
//!
//! Everything here is offline: template intelligence, in-memory store, and a
//! scripted intelligence double where a failure has to be forced.

use async_trait::async_trait;
use repoforge::analyzer::{RepositoryAnalyzer, SelectionMode, StaticAnalyzer};
use repoforge::intelligence::{
    CodeIntelligence, GeneratedArtifacts, GenerationRequest, IntelligenceError, RankRequest,
    TemplateIntelligence,
};
use repoforge::llm::{BackendError, MockLLMClient, MockResponse};
use repoforge::pipeline::{
    AnalyzeOptions, ErrorKind, PipelineConfig, PipelineContext, PipelineOrchestrator, Stage,
};
use repoforge::store::{MemoryRecordStore, RecordStatus};
use repoforge::{LlmIntelligence, SelectionSource};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Ranking always fails; generation delegates to the template backend unless told to fail
struct ScriptedIntelligence {
    template: TemplateIntelligence,
    fail_generation: bool,
}

impl ScriptedIntelligence {
    fn failing_ranking() -> Self {
        Self {
            template: TemplateIntelligence::new(),
            fail_generation: false,
        }
    }

    fn failing_everything() -> Self {
        Self {
            template: TemplateIntelligence::new(),
            fail_generation: true,
        }
    }
}

#[async_trait]
impl CodeIntelligence for ScriptedIntelligence {
    async fn rank_files(&self, _request: &RankRequest) -> Result<Vec<String>, IntelligenceError> {
        Err(IntelligenceError::Backend(BackendError::NetworkError {
            message: "scripted ranking failure".to_string(),
        }))
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifacts, IntelligenceError> {
        if self.fail_generation {
            return Err(IntelligenceError::InvalidResponse(
                "scripted generation failure".to_string(),
            ));
        }
        self.template.generate(request).await
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn sample_node_app() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{"name": "sample-node-app", "main": "server.js", "dependencies": {"express": "^4.18.2"}}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("server.js"),
        "const express = require('express');\nconst app = express();\n\napp.get('/health', (req, res) => res.send('ok'));\n\napp.listen(3000);\n",
    )
    .unwrap();
    dir
}

fn sample_python_app(dir: &Path) {
    fs::write(
        dir.join("main.py"),
        "from fastapi import FastAPI\n\napp = FastAPI()\n\n@app.get(\"/items\")\ndef items():\n    return []\n",
    )
    .unwrap();
    fs::write(dir.join("requirements.txt"), "fastapi==0.110.0\nuvicorn==0.29.0\n").unwrap();
}

fn config(scratch: &Path) -> PipelineConfig {
    PipelineConfig::default().with_scratch_dir(scratch)
}

fn offline(scratch: &Path) -> PipelineOrchestrator {
    PipelineOrchestrator::new(PipelineContext::offline(config(scratch)))
}

fn with_intelligence(scratch: &Path, intelligence: Arc<dyn CodeIntelligence>) -> PipelineOrchestrator {
    PipelineOrchestrator::new(PipelineContext::with_defaults(
        intelligence,
        Arc::new(MemoryRecordStore::new()),
        config(scratch),
    ))
}

#[tokio::test]
async fn test_sample_node_app_scenario() {
    let repo = sample_node_app();
    let scratch = TempDir::new().unwrap();
    let orchestrator = offline(scratch.path());

    let outcome = orchestrator
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap();

    let record = outcome.record;
    assert_eq!(record.id, "r1");
    assert!(record.analysis.file_count >= 1);
    assert!(record.analysis.has_language("JavaScript"));
    assert!(record.important_files.iter().any(|f| f.path == "package.json"));
    assert!(record.important_files.len() <= 20);
    assert!(!record.generated_tools.is_empty());
    assert!(!record.documentation.is_empty());
    assert!(record.build_recipe.as_deref().unwrap().contains("FROM node:18-alpine"));
    assert_eq!(record.status, RecordStatus::Generated);
}

#[tokio::test]
async fn test_max_files_zero_is_empty_selection() {
    let repo = sample_node_app();
    let scratch = TempDir::new().unwrap();
    let mock = Arc::new(MockLLMClient::new());
    let orchestrator = with_intelligence(
        scratch.path(),
        Arc::new(LlmIntelligence::new(mock.clone())),
    );
    mock.add_response(MockResponse::text(
        r#"[{"name": "run-server", "title": "Run server", "description": "Starts the app", "inputSchema": {"type": "object"}}]"#,
    ));
    mock.add_response(MockResponse::text("# sample-node-app\n\nRun `npm start`.\n"));
    mock.add_response(MockResponse::text("FROM node:18-alpine\nCMD [\"npm\", \"start\"]\n"));

    let outcome = orchestrator
        .analyze_and_generate(
            "r-zero",
            repo.path(),
            AnalyzeOptions {
                max_files: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(outcome.record.important_files.is_empty());
    assert!(outcome.warning.is_none());
    // four generation prompts, no ranking prompt; the unanswered server prompt falls back
    assert_eq!(mock.requests().len(), 4);
    assert!(outcome.record.server_files.contains_key("server.ts"));
}

#[tokio::test]
async fn test_important_files_bounded_by_max_files() {
    let repo = sample_node_app();
    fs::write(repo.path().join("README.md"), "# Sample\n\nAn express service.\n").unwrap();
    let scratch = TempDir::new().unwrap();

    for max_files in [1usize, 2, 5] {
        let outcome = offline(scratch.path())
            .analyze_and_generate(
                "bounded",
                repo.path(),
                AnalyzeOptions {
                    max_files: Some(max_files),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(outcome.record.important_files.len() <= max_files);
    }
}

#[tokio::test]
async fn test_failed_ranking_equals_pattern_selection() {
    let repo = sample_node_app();
    fs::write(repo.path().join("README.md"), "# Sample\n\nAn express service.\n").unwrap();
    let scratch = TempDir::new().unwrap();
    let orchestrator = with_intelligence(
        scratch.path(),
        Arc::new(ScriptedIntelligence::failing_ranking()),
    );

    let outcome = orchestrator
        .analyze_and_generate(
            "fallback",
            repo.path(),
            AnalyzeOptions {
                max_files: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let expected = StaticAnalyzer::new()
        .select_important_files(repo.path(), SelectionMode::Pattern { max_files: 2 })
        .await
        .unwrap();

    assert_eq!(outcome.selection_source, SelectionSource::Pattern);
    assert!(outcome
        .warning
        .as_deref()
        .unwrap()
        .contains("scripted ranking failure"));
    assert_eq!(outcome.record.important_files, expected);
    assert_eq!(outcome.record.status, RecordStatus::Generated);
}

#[tokio::test]
async fn test_intelligent_selection_is_tagged() {
    let repo = sample_node_app();
    let scratch = TempDir::new().unwrap();
    let mock = Arc::new(MockLLMClient::new());
    mock.add_response(MockResponse::text(r#"{"files": ["server.js"]}"#));
    mock.add_response(MockResponse::text(
        r#"[{"name": "health-check", "title": "Health check", "description": "Calls /health", "inputSchema": {"type": "object"}}]"#,
    ));
    mock.add_response(MockResponse::text("# Docs\n"));
    mock.add_response(MockResponse::text("```dockerfile\nFROM node:18-alpine\n```"));
    let orchestrator = with_intelligence(scratch.path(), Arc::new(LlmIntelligence::new(mock)));

    let outcome = orchestrator
        .analyze_and_generate("smart", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.selection_source, SelectionSource::Intelligent);
    let paths: Vec<&str> = outcome
        .record
        .important_files
        .iter()
        .map(|f| f.path.as_str())
        .collect();
    assert_eq!(paths, vec!["server.js"]);
    assert_eq!(outcome.record.generated_tools[0].name, "health-check");
    assert_eq!(outcome.record.build_recipe.as_deref(), Some("FROM node:18-alpine\n"));
}

#[tokio::test]
async fn test_reanalysis_overwrites_generation_as_a_unit() {
    let repo = sample_node_app();
    let scratch = TempDir::new().unwrap();
    let orchestrator = offline(scratch.path());

    let first = orchestrator
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap()
        .record;
    assert!(first.generated_tools.iter().any(|t| t.name == "run-npm-commands"));

    fs::remove_file(repo.path().join("package.json")).unwrap();
    fs::remove_file(repo.path().join("server.js")).unwrap();
    sample_python_app(repo.path());

    orchestrator
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap();
    let stored = orchestrator.get_record("r1").await.unwrap();

    assert!(stored.analysis.has_language("Python"));
    assert!(!stored.analysis.has_language("JavaScript"));
    assert!(stored.generated_tools.iter().any(|t| t.name == "run-python-tools"));
    assert!(!stored.generated_tools.iter().any(|t| t.name == "run-npm-commands"));
    assert!(stored.documentation.contains("Python"));
    assert!(stored.build_recipe.as_deref().unwrap().contains("python:3.11-slim"));
    assert!(stored.stored_at >= first.stored_at);
}

#[tokio::test]
async fn test_generation_failure_keeps_partial_record() {
    let repo = sample_node_app();
    let scratch = TempDir::new().unwrap();
    let orchestrator = with_intelligence(
        scratch.path(),
        Arc::new(ScriptedIntelligence::failing_everything()),
    );

    let err = orchestrator
        .analyze_and_generate("partial", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::GenerationFailed);
    assert_eq!(err.stage, Some(Stage::Generate));
    assert_eq!(err.repo_id.as_deref(), Some("partial"));

    let record = orchestrator.get_record("partial").await.unwrap();
    assert_eq!(record.status, RecordStatus::GenerationFailed);
    assert!(record.analysis.has_language("JavaScript"));
    assert!(!record.important_files.is_empty());
    assert!(record.generated_tools.is_empty());
    assert!(record.build_recipe.is_none());
    assert!(record
        .last_error
        .as_deref()
        .unwrap()
        .contains("scripted generation failure"));

    // scratch is released on the failure path too
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_get_record_is_idempotent() {
    let repo = sample_node_app();
    let scratch = TempDir::new().unwrap();
    let orchestrator = offline(scratch.path());
    orchestrator
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap();

    let first = orchestrator.get_record("r1").await.unwrap();
    let second = orchestrator.get_record("r1").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_excluded_directories_are_not_analyzed() {
    let repo = sample_node_app();
    let modules = repo.path().join("node_modules").join("left-pad");
    fs::create_dir_all(&modules).unwrap();
    fs::write(modules.join("index.js"), "module.exports = () => {};\n").unwrap();
    let scratch = TempDir::new().unwrap();

    let record = offline(scratch.path())
        .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
        .await
        .unwrap()
        .record;

    assert_eq!(record.analysis.file_count, 2);
    assert!(!record.tree_structure.contains("node_modules"));
    assert!(!record
        .important_files
        .iter()
        .any(|f| f.path.starts_with("node_modules")));
}

#[tokio::test]
async fn test_list_records_summarises_each_id() {
    let repo = sample_node_app();
    let scratch = TempDir::new().unwrap();
    let orchestrator = offline(scratch.path());

    for id in ["b-repo", "a-repo"] {
        orchestrator
            .analyze_and_generate(id, repo.path(), AnalyzeOptions::default())
            .await
            .unwrap();
    }

    let summaries = orchestrator.list_records().await.unwrap();
    let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a-repo", "b-repo"]);
}
