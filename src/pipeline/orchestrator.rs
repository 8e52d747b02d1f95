use super::context::PipelineContext;
use super::error::{ErrorKind, PipelineError, Stage};
use super::guard::RepoLocks;
use super::scratch::ScratchDir;
use super::stage::{finish, run_stage};
use crate::analyzer::{InlineRepository, ScanReport};
use crate::intelligence::recipe::{exposed_port, recipe_for};
use crate::intelligence::{GeneratedArtifacts, GenerationRequest};
use crate::progress::ProgressEvent;
use crate::selector::{FileSelector, Selection, SelectionSource};
use crate::store::{RecordStatus, RecordSummary, RepositoryRecord, SourceKind};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub project_name: Option<String>,
    pub description: Option<String>,
    /// Falls back to the configured default when `None`
    pub max_files: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct InlineOptions {
    pub project_name: Option<String>,
    pub description: Option<String>,
    pub port: Option<u16>,
    pub generate_recipe: bool,
}

impl Default for InlineOptions {
    fn default() -> Self {
        Self {
            project_name: None,
            description: None,
            port: None,
            generate_recipe: true,
        }
    }
}

/// Result of a successful `analyze_and_generate`
#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    pub record: RepositoryRecord,
    pub selection_source: SelectionSource,
    /// Set when file selection degraded
    pub warning: Option<String>,
    pub elapsed: Duration,
}

/// Result of a successful `store_inline_repository`
#[derive(Debug, Clone)]
pub struct InlineOutcome {
    pub record: RepositoryRecord,
    /// Port declared by the generated recipe
    pub port: Option<u16>,
}

pub struct PipelineOrchestrator {
    context: PipelineContext,
    selector: FileSelector,
    locks: RepoLocks,
}

impl PipelineOrchestrator {
    pub fn new(context: PipelineContext) -> Self {
        Self::with_locks(context, RepoLocks::new())
    }

    /// Shares the single-flight set with other components (the deployment manager)
    pub fn with_locks(context: PipelineContext, locks: RepoLocks) -> Self {
        let selector = FileSelector::new(
            context.analyzer.clone(),
            context.intelligence.clone(),
            context.config.request_timeout,
        );
        Self {
            context,
            selector,
            locks,
        }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn locks(&self) -> &RepoLocks {
        &self.locks
    }

    fn emit(&self, event: ProgressEvent) {
        self.context.progress.on_progress(&event);
    }

    /// Runs one stage under a timeout and tags any failure with the stage and repo id
    async fn stage<T, F>(
        &self,
        repo_id: &str,
        stage: Stage,
        timeout: Duration,
        timeout_kind: ErrorKind,
        fut: F,
    ) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, PipelineError>>,
    {
        run_stage(
            self.context.progress.as_ref(),
            repo_id,
            stage,
            timeout,
            timeout_kind,
            fut,
        )
        .await
    }

    /// Archive, extract, analyze, select, persist, generate, clean up
    ///
    /// A failure at any stage aborts the rest; whatever was persisted before the
    /// failing stage stays in the store. The scratch directory is removed on every
    /// path.
    pub async fn analyze_and_generate(
        &self,
        repo_id: &str,
        workspace_root: &Path,
        options: AnalyzeOptions,
    ) -> Result<AnalyzeOutcome, PipelineError> {
        let repo_id = validate_repo_id(repo_id)?;
        if !workspace_root.is_dir() {
            return Err(PipelineError::input(format!(
                "Workspace root {} does not exist or is not a directory",
                workspace_root.display()
            ))
            .for_repo(repo_id));
        }
        let _guard = self.locks.try_acquire(repo_id)?;

        let start = Instant::now();
        info!(repo_id = %repo_id, root = %workspace_root.display(), "Starting analyze-and-generate");
        self.emit(ProgressEvent::Started {
            repo_id: repo_id.to_string(),
            operation: "analyze-and-generate".to_string(),
        });

        let result = self
            .run_analyze(repo_id, workspace_root, options, start)
            .await;
        finish(self.context.progress.as_ref(), repo_id, start, result)
    }

    async fn run_analyze(
        &self,
        repo_id: &str,
        workspace_root: &Path,
        options: AnalyzeOptions,
        start: Instant,
    ) -> Result<AnalyzeOutcome, PipelineError> {
        let config = &self.context.config;
        let max_files = options.max_files.unwrap_or(config.max_files);

        let scratch = ScratchDir::create(&config.scratch_dir, "analyze").map_err(|e| {
            PipelineError::new(
                ErrorKind::ArchiveFailed,
                format!("Cannot create scratch directory: {}", e),
            )
            .at(Stage::Archive)
            .for_repo(repo_id)
        })?;
        let extract_dir = scratch.join("tree").join(root_label(workspace_root));

        let archiver = self.context.archiver.clone();
        let handle = self
            .stage(
                repo_id,
                Stage::Archive,
                config.stage_timeout,
                ErrorKind::ArchiveFailed,
                async {
                    archiver
                        .create_archive(workspace_root, scratch.path())
                        .await
                        .map_err(PipelineError::from)
                },
            )
            .await?;
        debug!(repo_id = %repo_id, entries = handle.entries, bytes = handle.size_bytes, "Snapshot ready");

        let analyzer = self.context.analyzer.clone();
        self.stage(
            repo_id,
            Stage::Extract,
            config.stage_timeout,
            ErrorKind::ExtractionFailed,
            async {
                analyzer
                    .extract(&handle, &extract_dir)
                    .await
                    .map_err(PipelineError::from)
            },
        )
        .await?;

        let ScanReport {
            analysis,
            tree_structure,
        } = self
            .stage(
                repo_id,
                Stage::Analyze,
                config.stage_timeout,
                ErrorKind::AnalysisFailed,
                async {
                    analyzer
                        .analyze(&extract_dir)
                        .await
                        .map_err(|e| analysis_error(e.into()))
                },
            )
            .await?;

        let selection: Selection = self
            .stage(
                repo_id,
                Stage::Select,
                config.stage_timeout + config.request_timeout,
                ErrorKind::AnalysisFailed,
                async {
                    self.selector
                        .select(&extract_dir, &tree_structure, &analysis, max_files)
                        .await
                        .map_err(|e| analysis_error(e.into()))
                },
            )
            .await?;
        if let Some(reason) = &selection.warning {
            self.emit(ProgressEvent::SelectionDegraded {
                repo_id: repo_id.to_string(),
                reason: reason.clone(),
            });
        }

        // A new analysis replaces the previous record wholesale
        let mut record = RepositoryRecord::new(repo_id, SourceKind::WorkspacePath);
        record.project_name = options.project_name.clone();
        record.description = options.description.clone();
        record.tree_structure = tree_structure;
        record.analysis = analysis;
        record.important_files = selection.files;
        record.selection_source = Some(selection.source);
        record.warnings = selection.warning.iter().cloned().collect();
        record.status = RecordStatus::Generating;

        let store = self.context.store.clone();
        let persisted = record.clone();
        self.stage(
            repo_id,
            Stage::Persist,
            config.stage_timeout,
            ErrorKind::Internal,
            async { store.put(persisted).await.map_err(PipelineError::from) },
        )
        .await?;

        let request = GenerationRequest {
            repo_id: repo_id.to_string(),
            project_name: record.project_name.clone(),
            description: record.description.clone(),
            tree_structure: record.tree_structure.clone(),
            analysis: record.analysis.clone(),
            important_files: record.important_files.clone(),
            port: None,
        };
        let intelligence = self.context.intelligence.clone();
        let generated = self
            .stage(
                repo_id,
                Stage::Generate,
                config.generation_timeout(),
                ErrorKind::GenerationFailed,
                async {
                    intelligence
                        .generate(&request)
                        .await
                        .map_err(PipelineError::from)
                },
            )
            .await;

        let record = match generated {
            Ok(artifacts) => self.store_generation(repo_id, artifacts).await?,
            Err(e) => {
                self.mark_generation_failed(repo_id, &e).await;
                return Err(e);
            }
        };

        self.emit(ProgressEvent::StageStarted {
            repo_id: repo_id.to_string(),
            stage: Stage::Cleanup,
        });
        let cleanup_start = Instant::now();
        if let Err(e) = scratch.close() {
            warn!(repo_id = %repo_id, error = %e, "Scratch cleanup failed");
        }
        self.emit(ProgressEvent::StageComplete {
            repo_id: repo_id.to_string(),
            stage: Stage::Cleanup,
            duration: cleanup_start.elapsed(),
        });

        info!(
            repo_id = %repo_id,
            files = record.important_files.len(),
            tools = record.generated_tools.len(),
            source = %selection.source,
            "Analyze-and-generate complete"
        );

        Ok(AnalyzeOutcome {
            record,
            selection_source: selection.source,
            warning: selection.warning,
            elapsed: start.elapsed(),
        })
    }

    /// Writes tools, documentation, recipe and server files in one store update
    async fn store_generation(
        &self,
        repo_id: &str,
        artifacts: GeneratedArtifacts,
    ) -> Result<RepositoryRecord, PipelineError> {
        self.context
            .store
            .update(
                repo_id,
                Box::new(move |record| record.apply_generation(artifacts)),
            )
            .await
            .map_err(|e| PipelineError::from(e).at(Stage::Persist).for_repo(repo_id))
    }

    async fn mark_generation_failed(&self, repo_id: &str, error: &PipelineError) {
        let message = error.message.clone();
        let result = self
            .context
            .store
            .update(
                repo_id,
                Box::new(move |record| {
                    record.status = RecordStatus::GenerationFailed;
                    record.last_error = Some(message);
                    record.touch();
                }),
            )
            .await;
        if let Err(e) = result {
            warn!(repo_id = %repo_id, error = %e, "Could not record generation failure");
        }
    }

    /// Analyzes a caller-supplied path→content map without touching the filesystem
    ///
    /// Every path is validated before anything is stored; one bad path rejects the
    /// whole map.
    pub async fn store_inline_repository(
        &self,
        repo_id: &str,
        file_map: &BTreeMap<String, String>,
        options: InlineOptions,
    ) -> Result<InlineOutcome, PipelineError> {
        let repo_id = validate_repo_id(repo_id)?;
        if file_map.is_empty() {
            return Err(PipelineError::input("fileMap must contain at least one file").for_repo(repo_id));
        }
        let repository = InlineRepository::from_map(file_map)
            .map_err(|e| PipelineError::from(e).for_repo(repo_id))?;
        let _guard = self.locks.try_acquire(repo_id)?;

        let start = Instant::now();
        self.emit(ProgressEvent::Started {
            repo_id: repo_id.to_string(),
            operation: "store-inline-repository".to_string(),
        });

        let result = self
            .run_inline(repo_id, repository, options)
            .await;
        finish(self.context.progress.as_ref(), repo_id, start, result)
    }

    async fn run_inline(
        &self,
        repo_id: &str,
        repository: InlineRepository,
        options: InlineOptions,
    ) -> Result<InlineOutcome, PipelineError> {
        let config = &self.context.config;
        let root_name = options
            .project_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| repo_id.to_string());

        let report = self
            .stage(
                repo_id,
                Stage::Analyze,
                config.stage_timeout,
                ErrorKind::AnalysisFailed,
                async { Ok(repository.analyze(&root_name)) },
            )
            .await?;

        let files = self
            .stage(
                repo_id,
                Stage::Select,
                config.stage_timeout,
                ErrorKind::AnalysisFailed,
                async { Ok(repository.select(config.max_files)) },
            )
            .await?;

        let mut record = RepositoryRecord::new(repo_id, SourceKind::InlineFileMap);
        record.project_name = options.project_name;
        record.description = options.description;
        record.tree_structure = report.tree_structure;
        record.analysis = report.analysis;
        record.important_files = files;
        record.selection_source = Some(SelectionSource::Pattern);

        if options.generate_recipe {
            let recipe = recipe_for(&record.analysis, options.port);
            debug!(repo_id = %repo_id, port = ?exposed_port(&recipe), "Generated template build recipe");
            record.build_recipe = Some(recipe);
        }

        let store = self.context.store.clone();
        let persisted = record.clone();
        self.stage(
            repo_id,
            Stage::Persist,
            config.stage_timeout,
            ErrorKind::Internal,
            async { store.put(persisted).await.map_err(PipelineError::from) },
        )
        .await?;

        info!(
            repo_id = %repo_id,
            files = record.analysis.file_count,
            languages = ?record.analysis.languages,
            "Inline repository stored"
        );

        let port = record.build_recipe.as_deref().and_then(exposed_port);
        Ok(InlineOutcome { record, port })
    }

    pub async fn get_record(&self, repo_id: &str) -> Result<RepositoryRecord, PipelineError> {
        let repo_id = validate_repo_id(repo_id)?;
        self.context
            .store
            .get(repo_id)
            .await?
            .ok_or_else(|| PipelineError::record_not_found(repo_id))
    }

    pub async fn list_records(&self) -> Result<Vec<RecordSummary>, PipelineError> {
        Ok(self.context.store.list().await?)
    }
}

fn validate_repo_id(repo_id: &str) -> Result<&str, PipelineError> {
    let trimmed = repo_id.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::input("repoId must be a non-empty string"));
    }
    Ok(trimmed)
}

/// Extraction and scanning failures surface as `AnalysisFailed` past the extract stage
fn analysis_error(mut err: PipelineError) -> PipelineError {
    if err.kind == ErrorKind::ExtractionFailed {
        err.kind = ErrorKind::AnalysisFailed;
    }
    err
}

fn root_label(workspace_root: &Path) -> String {
    std::fs::canonicalize(workspace_root)
        .ok()
        .as_deref()
        .unwrap_or(workspace_root)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && !n.starts_with('.'))
        .unwrap_or("repository")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineConfig;
    use std::fs;
    use tempfile::TempDir;

    fn orchestrator(scratch: &Path) -> PipelineOrchestrator {
        PipelineOrchestrator::new(PipelineContext::offline(
            PipelineConfig::default().with_scratch_dir(scratch),
        ))
    }

    fn node_app() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "sample", "dependencies": {"express": "^4.18.0"}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("index.js"),
            "const express = require('express');\nconst app = express();\napp.get('/users', (req, res) => res.json([]));\napp.listen(3000);\n",
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_analyze_and_generate_populates_record() {
        let repo = node_app();
        let scratch = TempDir::new().unwrap();
        let orchestrator = orchestrator(scratch.path());

        let outcome = orchestrator
            .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
            .await
            .unwrap();

        let record = outcome.record;
        assert_eq!(record.status, RecordStatus::Generated);
        assert!(record.analysis.has_language("JavaScript"));
        assert!(record.important_files.iter().any(|f| f.path == "package.json"));
        assert!(!record.generated_tools.is_empty());
        assert!(!record.documentation.is_empty());
        assert!(record.has_build_recipe());
        assert_eq!(outcome.selection_source, SelectionSource::Pattern);

        // scratch runs are gone
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_root_is_input_error() {
        let scratch = TempDir::new().unwrap();
        let err = orchestrator(scratch.path())
            .analyze_and_generate("r1", Path::new("/definitely/not/here"), AnalyzeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InputValidation);
    }

    #[tokio::test]
    async fn test_empty_repo_id_rejected() {
        let scratch = TempDir::new().unwrap();
        let err = orchestrator(scratch.path()).get_record("  ").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InputValidation);
    }

    #[tokio::test]
    async fn test_busy_repo_rejected() {
        let repo = node_app();
        let scratch = TempDir::new().unwrap();
        let orchestrator = orchestrator(scratch.path());

        let _held = orchestrator.locks().try_acquire("r1").unwrap();
        let err = orchestrator
            .analyze_and_generate("r1", repo.path(), AnalyzeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Busy);
        assert!(orchestrator.get_record("r1").await.is_err());
    }

    #[tokio::test]
    async fn test_inline_repository_with_port() {
        let scratch = TempDir::new().unwrap();
        let orchestrator = orchestrator(scratch.path());
        let mut files = BTreeMap::new();
        files.insert("main.py".to_string(), "from fastapi import FastAPI\napp = FastAPI()\n\n@app.get(\"/health\")\ndef health():\n    return {}\n".to_string());
        files.insert("requirements.txt".to_string(), "fastapi\nuvicorn\n".to_string());

        let outcome = orchestrator
            .store_inline_repository(
                "inline-1",
                &files,
                InlineOptions {
                    port: Some(9000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.port, Some(9000));
        assert_eq!(outcome.record.source_kind, SourceKind::InlineFileMap);
        assert!(outcome.record.analysis.has_language("Python"));
        assert_eq!(outcome.record.analysis.api_endpoints.len(), 1);
    }

    #[tokio::test]
    async fn test_inline_traversal_rejected_before_store() {
        let scratch = TempDir::new().unwrap();
        let orchestrator = orchestrator(scratch.path());
        let mut files = BTreeMap::new();
        files.insert("ok.js".to_string(), "console.log(1)".to_string());
        files.insert("../../etc/passwd".to_string(), "root".to_string());

        let err = orchestrator
            .store_inline_repository("r1", &files, InlineOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InputValidation);
        assert!(orchestrator.list_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inline_without_recipe() {
        let scratch = TempDir::new().unwrap();
        let orchestrator = orchestrator(scratch.path());
        let mut files = BTreeMap::new();
        files.insert("README.md".to_string(), "# notes".to_string());

        let outcome = orchestrator
            .store_inline_repository(
                "docs",
                &files,
                InlineOptions {
                    generate_recipe: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(outcome.record.build_recipe.is_none());
        assert!(outcome.port.is_none());
    }

    #[test]
    fn test_root_label() {
        assert_eq!(root_label(Path::new("/tmp/sample-node-app")), "sample-node-app");
        assert_eq!(root_label(Path::new("/")), "repository");
    }
}
