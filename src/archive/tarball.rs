use super::{is_excluded, ArchiveError, ArchiveHandle, Archiver};
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use ignore::WalkBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

const ARCHIVE_FILE_NAME: &str = "snapshot.tar.gz";

/// Native tar + gzip archiver
#[derive(Debug, Clone)]
pub struct TarGzArchiver {
    compression: Compression,
}

impl TarGzArchiver {
    pub fn new() -> Self {
        Self {
            compression: Compression::default(),
        }
    }

    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = Compression::new(level.min(9));
        self
    }

    fn write_archive(
        source_root: &Path,
        archive_path: &Path,
        compression: Compression,
    ) -> Result<usize, ArchiveError> {
        let failed = |message: String| ArchiveError::Failed {
            path: source_root.to_path_buf(),
            message,
        };

        let file = File::create(archive_path)
            .map_err(|e| failed(format!("cannot create {}: {}", archive_path.display(), e)))?;
        let encoder = GzEncoder::new(file, compression);
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(false);

        let mut entries = 0usize;
        let walker = WalkBuilder::new(source_root)
            .hidden(false)
            .git_ignore(true)
            .follow_links(false)
            .filter_entry(|entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                match entry.file_name().to_str() {
                    Some(name) if entry.depth() > 0 => !is_excluded(name, is_dir),
                    _ => true,
                }
            })
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable entry while archiving");
                    continue;
                }
            };

            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let relative = match entry.path().strip_prefix(source_root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };

            builder
                .append_path_with_name(entry.path(), &relative)
                .map_err(|e| failed(format!("cannot add {}: {}", relative.display(), e)))?;
            entries += 1;
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| failed(format!("cannot finish tar stream: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| failed(format!("cannot finish gzip stream: {}", e)))?;

        Ok(entries)
    }
}

impl Default for TarGzArchiver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Archiver for TarGzArchiver {
    async fn create_archive(
        &self,
        source_root: &Path,
        out_dir: &Path,
    ) -> Result<ArchiveHandle, ArchiveError> {
        if !source_root.exists() {
            return Err(ArchiveError::SourceNotFound(source_root.to_path_buf()));
        }
        if !source_root.is_dir() {
            return Err(ArchiveError::NotADirectory(source_root.to_path_buf()));
        }

        let start = Instant::now();
        let source_root = source_root.to_path_buf();
        let archive_path: PathBuf = out_dir.join(ARCHIVE_FILE_NAME);
        let compression = self.compression;

        std::fs::create_dir_all(out_dir).map_err(|e| ArchiveError::Failed {
            path: source_root.clone(),
            message: format!("cannot create {}: {}", out_dir.display(), e),
        })?;

        let task_root = source_root.clone();
        let task_path = archive_path.clone();
        let entries = tokio::task::spawn_blocking(move || {
            Self::write_archive(&task_root, &task_path, compression)
        })
        .await
        .map_err(|e| ArchiveError::Failed {
            path: source_root.clone(),
            message: format!("archive task aborted: {}", e),
        })??;

        let size_bytes = std::fs::metadata(&archive_path)
            .map(|m| m.len())
            .map_err(|e| ArchiveError::Failed {
                path: source_root.clone(),
                message: format!("archive missing after write: {}", e),
            })?;

        info!(
            source = %source_root.display(),
            entries,
            size_bytes,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Archive created"
        );
        debug!(archive = %archive_path.display(), "Archive location");

        Ok(ArchiveHandle {
            path: archive_path,
            size_bytes,
            entries,
        })
    }

    fn name(&self) -> &str {
        "tar.gz"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use tempfile::TempDir;

    fn archived_paths(handle: &ArchiveHandle) -> Vec<String> {
        let file = File::open(&handle.path).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        let mut paths: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect();
        paths.sort();
        paths
    }

    #[tokio::test]
    async fn test_archive_excludes_noise() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(source.path().join("package.json"), "{}").unwrap();
        fs::create_dir_all(source.path().join("src")).unwrap();
        fs::write(source.path().join("src/index.js"), "console.log(1)").unwrap();
        fs::create_dir_all(source.path().join("node_modules/left-pad")).unwrap();
        fs::write(source.path().join("node_modules/left-pad/index.js"), "x").unwrap();
        fs::write(source.path().join("server.log"), "noise").unwrap();

        let handle = TarGzArchiver::new()
            .create_archive(source.path(), out.path())
            .await
            .unwrap();

        assert_eq!(handle.entries, 2);
        assert!(handle.size_bytes > 0);
        assert_eq!(archived_paths(&handle), vec!["package.json", "src/index.js"]);
    }

    #[tokio::test]
    async fn test_archive_missing_source() {
        let out = TempDir::new().unwrap();
        let result = TarGzArchiver::new()
            .create_archive(Path::new("/nonexistent/repoforge/source"), out.path())
            .await;

        assert!(matches!(result, Err(ArchiveError::SourceNotFound(_))));
    }

    #[tokio::test]
    async fn test_archive_rejects_file_source() {
        let source = TempDir::new().unwrap();
        let file = source.path().join("file.txt");
        fs::write(&file, "content").unwrap();

        let result = TarGzArchiver::new().create_archive(&file, source.path()).await;
        assert!(matches!(result, Err(ArchiveError::NotADirectory(_))));
    }

    #[tokio::test]
    async fn test_archive_of_empty_dir_is_empty() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let handle = TarGzArchiver::new()
            .create_archive(source.path(), out.path())
            .await
            .unwrap();
        assert!(handle.is_empty());
    }
}
