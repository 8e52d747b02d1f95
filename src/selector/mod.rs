//! Important-file selection with graceful degradation
//!
//! The selector asks code intelligence for a ranking first and resolves those
//! exact paths. Any failure there (error, timeout, empty or unresolvable list)
//! downgrades to the analyzer's pattern ranking and is reported as a warning on
//! the [`Selection`], never as an error.

use crate::analyzer::{AnalysisResult, AnalyzerError, ImportantFile, RepositoryAnalyzer, SelectionMode};
use crate::intelligence::{CodeIntelligence, RankRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    Intelligent,
    Pattern,
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionSource::Intelligent => f.write_str("intelligent"),
            SelectionSource::Pattern => f.write_str("pattern"),
        }
    }
}

/// Files chosen for generation plus how they were chosen
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub files: Vec<ImportantFile>,
    pub source: SelectionSource,
    /// Set when intelligent selection degraded or nothing could be selected
    pub warning: Option<String>,
}

impl Selection {
    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }
}

pub struct FileSelector {
    analyzer: Arc<dyn RepositoryAnalyzer>,
    intelligence: Arc<dyn CodeIntelligence>,
    rank_timeout: Duration,
}

impl FileSelector {
    pub fn new(
        analyzer: Arc<dyn RepositoryAnalyzer>,
        intelligence: Arc<dyn CodeIntelligence>,
        rank_timeout: Duration,
    ) -> Self {
        Self {
            analyzer,
            intelligence,
            rank_timeout,
        }
    }

    /// Ranks through code intelligence; `Err` carries the reason to degrade
    async fn try_intelligent(
        &self,
        dir: &Path,
        tree_structure: &str,
        analysis: &AnalysisResult,
        max_files: usize,
    ) -> Result<Vec<ImportantFile>, String> {
        let request = RankRequest {
            tree_structure: tree_structure.to_string(),
            analysis: analysis.clone(),
            max_files,
        };

        let paths = match tokio::time::timeout(self.rank_timeout, self.intelligence.rank_files(&request)).await {
            Ok(Ok(paths)) => paths,
            Ok(Err(e)) => return Err(e.to_string()),
            Err(_) => {
                return Err(format!(
                    "ranking timed out after {}s",
                    self.rank_timeout.as_secs()
                ))
            }
        };
        if paths.is_empty() {
            return Err("ranking returned no paths".to_string());
        }

        let mut files = self
            .analyzer
            .select_important_files(dir, SelectionMode::Explicit { paths })
            .await
            .map_err(|e| e.to_string())?;
        if files.is_empty() {
            return Err("none of the ranked paths exist".to_string());
        }
        files.truncate(max_files);
        Ok(files)
    }

    pub async fn select(
        &self,
        dir: &Path,
        tree_structure: &str,
        analysis: &AnalysisResult,
        max_files: usize,
    ) -> Result<Selection, AnalyzerError> {
        if max_files == 0 {
            debug!("maxFiles is 0, selecting nothing");
            return Ok(Selection {
                files: Vec::new(),
                source: SelectionSource::Pattern,
                warning: None,
            });
        }

        let mut warning = None;
        if self.intelligence.supports_ranking() {
            match self
                .try_intelligent(dir, tree_structure, analysis, max_files)
                .await
            {
                Ok(files) => {
                    info!(count = files.len(), source = "intelligent", "Important files selected");
                    return Ok(Selection {
                        files,
                        source: SelectionSource::Intelligent,
                        warning: None,
                    });
                }
                Err(reason) => {
                    warn!(
                        backend = self.intelligence.name(),
                        reason = %reason,
                        "Intelligent file selection degraded, falling back to pattern selection"
                    );
                    warning = Some(format!(
                        "Intelligent file selection failed ({}); used pattern-based selection",
                        reason
                    ));
                }
            }
        }

        let files = self
            .analyzer
            .select_important_files(dir, SelectionMode::Pattern { max_files })
            .await?;

        if files.is_empty() && analysis.file_count > 0 {
            let note = "No important files could be selected; generation proceeds without file context";
            warn!("{}", note);
            warning = Some(match warning {
                Some(previous) => format!("{}. {}", previous, note),
                None => note.to_string(),
            });
        }

        info!(count = files.len(), source = "pattern", "Important files selected");
        Ok(Selection {
            files,
            source: SelectionSource::Pattern,
            warning,
        })
    }
}
