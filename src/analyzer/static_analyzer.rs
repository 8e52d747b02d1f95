use super::inline::validate_relative_path;
use super::scoring::{looks_binary, score_file, select_by_pattern, to_important, MAX_FILE_BYTES};
use super::tree::render_tree;
use super::{
    summarize, AnalyzerError, ImportantFile, RepositoryAnalyzer, ScanReport, SelectionMode,
    SourceFile,
};
use crate::archive::{is_excluded, ArchiveHandle};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Filesystem-backed analyzer for extracted snapshots
#[derive(Debug, Clone, Default)]
pub struct StaticAnalyzer;

impl StaticAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn unpack(archive: &Path, dest: &Path) -> Result<usize, AnalyzerError> {
        if dest.exists() {
            let occupied = std::fs::read_dir(dest)
                .map_err(|e| AnalyzerError::ExtractionFailed(format!("{}: {}", dest.display(), e)))?
                .next()
                .is_some();
            if occupied {
                return Err(AnalyzerError::ExtractionFailed(format!(
                    "destination {} is not empty",
                    dest.display()
                )));
            }
        }
        std::fs::create_dir_all(dest)
            .map_err(|e| AnalyzerError::ExtractionFailed(format!("{}: {}", dest.display(), e)))?;

        let file = File::open(archive).map_err(|e| {
            AnalyzerError::ExtractionFailed(format!("cannot open {}: {}", archive.display(), e))
        })?;
        let mut tarball = tar::Archive::new(GzDecoder::new(file));
        tarball.set_preserve_permissions(false);

        let mut unpacked = 0usize;
        let entries = tarball
            .entries()
            .map_err(|e| AnalyzerError::ExtractionFailed(format!("corrupt archive: {}", e)))?;
        for entry in entries {
            let mut entry = entry
                .map_err(|e| AnalyzerError::ExtractionFailed(format!("corrupt archive: {}", e)))?;
            // unpack_in refuses entries that would land outside dest
            let inside = entry
                .unpack_in(dest)
                .map_err(|e| AnalyzerError::ExtractionFailed(format!("corrupt archive: {}", e)))?;
            if inside {
                unpacked += 1;
            }
        }
        Ok(unpacked)
    }

    /// Walks `dir` in path order, reading every text file up to [`MAX_FILE_BYTES`]
    pub(crate) fn collect_sources(dir: &Path) -> Result<Vec<SourceFile>, AnalyzerError> {
        if !dir.is_dir() {
            return Err(AnalyzerError::AnalysisFailed {
                path: dir.to_path_buf(),
                message: "not a directory".to_string(),
            });
        }

        let walker = WalkBuilder::new(dir)
            .hidden(false)
            .git_ignore(true)
            .parents(false)
            .follow_links(false)
            .sort_by_file_path(|a, b| a.cmp(b))
            .filter_entry(|entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                match entry.file_name().to_str() {
                    Some(name) if entry.depth() > 0 => !is_excluded(name, is_dir),
                    _ => true,
                }
            })
            .build();

        let mut files = Vec::new();
        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable entry during analysis");
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let path = relative.to_string_lossy().replace('\\', "/");
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let content = read_text(entry.path(), size);
            files.push(SourceFile { path, size, content });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn resolve_explicit(dir: &Path, paths: &[String]) -> Vec<ImportantFile> {
        let mut seen = HashSet::new();
        let mut selected = Vec::new();

        for requested in paths {
            let normalized = match validate_relative_path(requested) {
                Ok(p) => p,
                Err(err) => {
                    debug!(path = %requested, error = %err, "Ignoring unresolvable path");
                    continue;
                }
            };
            if !seen.insert(normalized.clone()) {
                continue;
            }

            let full = dir.join(&normalized);
            let Ok(meta) = std::fs::metadata(&full) else {
                debug!(path = %normalized, "Requested file does not exist");
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Some(content) = read_text(&full, meta.len()) else {
                continue;
            };
            let score = score_file(&normalized, meta.len(), &content);
            selected.push(to_important(&normalized, content, score));
        }

        selected
    }
}

fn read_text(path: &Path, size: u64) -> Option<String> {
    if size > MAX_FILE_BYTES {
        return None;
    }
    let bytes = std::fs::read(path).ok()?;
    if looks_binary(&bytes) {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn root_label(dir: &Path) -> String {
    dir.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("repository")
        .to_string()
}

fn join_error(dir: &Path, err: tokio::task::JoinError) -> AnalyzerError {
    AnalyzerError::AnalysisFailed {
        path: dir.to_path_buf(),
        message: format!("analysis task aborted: {}", err),
    }
}

#[async_trait]
impl RepositoryAnalyzer for StaticAnalyzer {
    async fn extract(&self, archive: &ArchiveHandle, dest: &Path) -> Result<(), AnalyzerError> {
        let archive_path = archive.path.clone();
        let dest_path = dest.to_path_buf();

        let unpacked =
            tokio::task::spawn_blocking(move || Self::unpack(&archive_path, &dest_path))
                .await
                .map_err(|e| AnalyzerError::ExtractionFailed(format!("task aborted: {}", e)))??;

        info!(dest = %dest.display(), entries = unpacked, "Archive extracted");
        Ok(())
    }

    async fn analyze(&self, dir: &Path) -> Result<ScanReport, AnalyzerError> {
        let task_dir: PathBuf = dir.to_path_buf();
        let files = tokio::task::spawn_blocking(move || Self::collect_sources(&task_dir))
            .await
            .map_err(|e| join_error(dir, e))??;

        let analysis = summarize(&files);
        let paths: Vec<String> = files.iter().map(|f| f.path.clone()).collect();
        let tree_structure = render_tree(&root_label(dir), &paths);

        info!(
            dir = %dir.display(),
            file_count = analysis.file_count,
            languages = ?analysis.languages,
            project_type = %analysis.project_type,
            "Repository analyzed"
        );

        Ok(ScanReport {
            analysis,
            tree_structure,
        })
    }

    async fn select_important_files(
        &self,
        dir: &Path,
        mode: SelectionMode,
    ) -> Result<Vec<ImportantFile>, AnalyzerError> {
        let task_dir = dir.to_path_buf();
        let selected = tokio::task::spawn_blocking(move || match mode {
            SelectionMode::Pattern { max_files } => {
                Self::collect_sources(&task_dir).map(|files| select_by_pattern(&files, max_files))
            }
            SelectionMode::Explicit { paths } => Ok(Self::resolve_explicit(&task_dir, &paths)),
        })
        .await
        .map_err(|e| join_error(dir, e))??;

        debug!(dir = %dir.display(), selected = selected.len(), "Important files selected");
        Ok(selected)
    }

    fn name(&self) -> &str {
        "static"
    }
}
