//! Analysis result types shared by the on-disk and inline analyzers

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Coarse classification of what a repository is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    WebFrontend,
    WebBackend,
    Fullstack,
    Mobile,
    Desktop,
    Cli,
    Library,
    Microservice,
    DataScience,
    #[default]
    Unknown,
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectType::WebFrontend => "web_frontend",
            ProjectType::WebBackend => "web_backend",
            ProjectType::Fullstack => "fullstack",
            ProjectType::Mobile => "mobile",
            ProjectType::Desktop => "desktop",
            ProjectType::Cli => "cli",
            ProjectType::Library => "library",
            ProjectType::Microservice => "microservice",
            ProjectType::DataScience => "data_science",
            ProjectType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// An HTTP route found in source code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub method: String,
    pub path: String,
    pub file: String,
    pub framework: String,
}

/// Static scan of a repository
///
/// Field names stay snake_case on the wire; downstream generators key on
/// `file_count` and `config_files`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_count: usize,
    pub size_bytes: u64,
    pub languages: BTreeSet<String>,
    pub config_files: BTreeSet<String>,
    #[serde(default)]
    pub frameworks: BTreeSet<String>,
    #[serde(default)]
    pub project_type: ProjectType,
    #[serde(default)]
    pub api_endpoints: Vec<ApiEndpoint>,
}

impl AnalysisResult {
    pub fn has_language(&self, language: &str) -> bool {
        self.languages.contains(language)
    }

    pub fn has_config(&self, file_name: &str) -> bool {
        self.config_files.contains(file_name)
    }
}

/// What a file is for, as far as generation is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Config,
    Test,
    Docs,
    Api,
    Model,
    Source,
}

/// A file chosen as generation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportantFile {
    pub path: String,
    pub content: String,
    pub file_type: FileKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub score: f32,
}

/// Output of [`super::RepositoryAnalyzer::analyze`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub analysis: AnalysisResult,
    pub tree_structure: String,
}

/// How `select_important_files` chooses files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    /// Heuristic ranking, at most `max_files` entries
    Pattern { max_files: usize },
    /// Resolve exactly these repository-relative paths, in order
    Explicit { paths: Vec<String> },
}

/// A text file seen during a scan
#[derive(Debug, Clone)]
pub(crate) struct SourceFile {
    pub path: String,
    pub size: u64,
    /// `None` for binary or oversized files
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_result_serializes_snake_case() {
        let mut analysis = AnalysisResult {
            file_count: 2,
            ..Default::default()
        };
        analysis.config_files.insert("package.json".to_string());

        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["file_count"], 2);
        assert_eq!(json["config_files"][0], "package.json");
        assert_eq!(json["project_type"], "unknown");
    }

    #[test]
    fn test_important_file_serializes_camel_case() {
        let file = ImportantFile {
            path: "src/main.rs".to_string(),
            content: "fn main() {}".to_string(),
            file_type: FileKind::Source,
            language: Some("Rust".to_string()),
            score: 9.5,
        };

        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["fileType"], "source");
        assert_eq!(json["language"], "Rust");
    }

    #[test]
    fn test_project_type_display() {
        assert_eq!(ProjectType::DataScience.to_string(), "data_science");
        assert_eq!(ProjectType::default().to_string(), "unknown");
    }
}
