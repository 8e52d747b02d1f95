//! Repository snapshotting
//!
//! An [`Archiver`] packs a workspace root into a single compressed blob that the
//! analyzer later extracts into a pipeline-owned scratch directory. Noise
//! directories (dependency caches, VCS metadata, build output) and log/temp files
//! never make it into the snapshot.

mod tarball;

pub use tarball::TarGzArchiver;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory names that are never archived or analyzed
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "venv",
    ".venv",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    "vendor",
    ".idea",
    ".vscode",
    "coverage",
    "htmlcov",
    ".next",
    ".gradle",
];

const EXCLUDED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

const EXCLUDED_SUFFIXES: &[&str] = &[".log", ".tmp", ".temp", ".pyc", ".pyo"];

/// Returns true when an entry with this name must be skipped
pub fn is_excluded(name: &str, is_dir: bool) -> bool {
    if is_dir {
        return EXCLUDED_DIRS.contains(&name);
    }
    EXCLUDED_FILES.contains(&name) || EXCLUDED_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Same rule applied to a `/`-separated relative file path: any excluded
/// directory segment, or an excluded file name
pub fn is_excluded_path(path: &str) -> bool {
    let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
    while let Some(segment) = segments.next() {
        let is_dir = segments.peek().is_some();
        if is_excluded(segment, is_dir) {
            return true;
        }
    }
    false
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Source root does not exist: {0}")]
    SourceNotFound(PathBuf),

    #[error("Source root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Archiving {path} failed: {message}")]
    Failed { path: PathBuf, message: String },
}

/// Reference to an archive produced by an [`Archiver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHandle {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub entries: usize,
}

impl ArchiveHandle {
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

#[async_trait]
pub trait Archiver: Send + Sync {
    /// Packs `source_root` into a new archive inside `out_dir`.
    ///
    /// The caller owns `out_dir` and is responsible for removing it.
    async fn create_archive(
        &self,
        source_root: &Path,
        out_dir: &Path,
    ) -> Result<ArchiveHandle, ArchiveError>;

    fn name(&self) -> &str;
}
