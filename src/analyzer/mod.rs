//! Static repository analysis
//!
//! [`RepositoryAnalyzer`] is the boundary the pipeline consumes: unpack a snapshot,
//! scan it deterministically, and pick the files worth handing to code
//! intelligence. [`StaticAnalyzer`] implements it over the local filesystem;
//! [`InlineRepository`] runs the same detection over a caller-supplied file map.

pub mod detect;
mod inline;
pub mod scoring;
mod static_analyzer;
pub mod tree;
mod types;

pub use inline::{validate_relative_path, InlineRepository};
pub use static_analyzer::StaticAnalyzer;
pub use types::{
    AnalysisResult, ApiEndpoint, FileKind, ImportantFile, ProjectType, ScanReport, SelectionMode,
};

pub(crate) use types::SourceFile;

use crate::archive::ArchiveHandle;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Analysis of {path} failed: {message}")]
    AnalysisFailed { path: PathBuf, message: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

#[async_trait]
pub trait RepositoryAnalyzer: Send + Sync {
    /// Unpacks `archive` into `dest`, which must be absent or empty
    async fn extract(&self, archive: &ArchiveHandle, dest: &Path) -> Result<(), AnalyzerError>;

    /// Deterministic scan; never modifies `dir`
    async fn analyze(&self, dir: &Path) -> Result<ScanReport, AnalyzerError>;

    /// Pattern mode is bounded by `max_files`. Explicit mode keeps the requested
    /// order and silently skips paths that do not resolve to a readable text file.
    async fn select_important_files(
        &self,
        dir: &Path,
        mode: SelectionMode,
    ) -> Result<Vec<ImportantFile>, AnalyzerError>;

    fn name(&self) -> &str;
}

/// Aggregates per-file detection into an [`AnalysisResult`]
pub(crate) fn summarize(files: &[SourceFile]) -> AnalysisResult {
    let mut result = AnalysisResult {
        file_count: files.len(),
        size_bytes: files.iter().map(|f| f.size).sum(),
        ..Default::default()
    };

    for file in files {
        if let Some(language) = detect::language_for_path(&file.path) {
            result.languages.insert(language.to_string());
        }
        if detect::is_config_file(&file.path) {
            result
                .config_files
                .insert(detect::file_name(&file.path).to_string());
        }

        let Some(content) = file.content.as_deref() else {
            continue;
        };
        if detect::is_config_file(&file.path) {
            result
                .frameworks
                .extend(detect::frameworks_from_manifest(&file.path, content));
        }
        if let Some(framework) = detect::framework_from_content(content) {
            result.frameworks.insert(framework.to_string());
        }
        result
            .api_endpoints
            .extend(detect::extract_api_endpoints(&file.path, content));
    }

    result.project_type = detect::classify_project(files);
    result
}
