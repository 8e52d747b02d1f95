use super::scoring::{looks_binary, select_by_pattern, MAX_FILE_BYTES};
use super::tree::render_tree;
use super::{summarize, AnalyzerError, ImportantFile, ScanReport, SourceFile};
use crate::archive::is_excluded_path;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

fn invalid(path: &str, reason: &str) -> AnalyzerError {
    AnalyzerError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Normalizes a repository-relative path, rejecting anything that would escape the root.
///
/// Both `/` and `\` are treated as separators. `.` segments are dropped and `..`
/// pops a previous segment; popping past the root is an error, never a truncation.
pub fn validate_relative_path(path: &str) -> Result<String, AnalyzerError> {
    if path.trim().is_empty() {
        return Err(invalid(path, "path is empty"));
    }
    if path.contains('\0') {
        return Err(invalid(path, "path contains a NUL byte"));
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(invalid(path, "absolute paths are not allowed"));
    }
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return Err(invalid(path, "drive-qualified paths are not allowed"));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(invalid(path, "path escapes the repository root"));
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(invalid(path, "path does not name a file"));
    }
    Ok(segments.join("/"))
}

/// A repository supplied as a path to content map
#[derive(Debug, Clone)]
pub struct InlineRepository {
    files: Vec<SourceFile>,
}

impl InlineRepository {
    /// Validates every path up front; one bad path rejects the whole map.
    ///
    /// Entries under excluded directories (`node_modules/`, `.git/`, ...) and
    /// excluded files (`*.log`, ...) are dropped, as the workspace archiver does.
    pub fn from_map(file_map: &BTreeMap<String, String>) -> Result<Self, AnalyzerError> {
        let mut seen = BTreeSet::new();
        let mut files = Vec::with_capacity(file_map.len());
        let mut skipped = 0usize;

        for (raw, content) in file_map {
            let path = validate_relative_path(raw)?;
            if !seen.insert(path.clone()) {
                return Err(invalid(raw, "duplicates another entry after normalization"));
            }
            if is_excluded_path(&path) {
                skipped += 1;
                continue;
            }

            let size = content.len() as u64;
            let text = (size <= MAX_FILE_BYTES && !looks_binary(content.as_bytes()))
                .then(|| content.clone());
            files.push(SourceFile {
                path,
                size,
                content: text,
            });
        }

        if skipped > 0 {
            debug!(skipped, kept = files.len(), "Dropped excluded inline entries");
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    pub fn analyze(&self, root_name: &str) -> ScanReport {
        let paths: Vec<String> = self.files.iter().map(|f| f.path.clone()).collect();
        ScanReport {
            analysis: summarize(&self.files),
            tree_structure: render_tree(root_name, &paths),
        }
    }

    pub fn select(&self, max_files: usize) -> Vec<ImportantFile> {
        select_by_pattern(&self.files, max_files)
    }
}
