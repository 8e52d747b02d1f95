//! The repository record aggregate and its wire shape

use crate::analyzer::{AnalysisResult, ImportantFile};
use crate::intelligence::{GeneratedArtifacts, ToolDescriptor};
use crate::selector::SelectionSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Where a repository's files came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    WorkspacePath,
    InlineFileMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Analyzed,
    Generating,
    Generated,
    GenerationFailed,
    Deployed,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordStatus::Analyzed => "analyzed",
            RecordStatus::Generating => "generating",
            RecordStatus::Generated => "generated",
            RecordStatus::GenerationFailed => "generation_failed",
            RecordStatus::Deployed => "deployed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Running,
    Stopped,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentStatus::Running => f.write_str("running"),
            DeploymentStatus::Stopped => f.write_str("stopped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub deployment_id: String,
    pub port: u16,
    pub url: String,
    pub container_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    pub status: DeploymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything known about one repository id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source_kind: SourceKind,
    pub tree_structure: String,
    pub analysis: AnalysisResult,
    pub important_files: Vec<ImportantFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_source: Option<SelectionSource>,
    pub generated_tools: Vec<ToolDescriptor>,
    pub documentation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_recipe: Option<String>,
    /// Generated MCP server implementation, keyed by path under `mcp-server/`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub server_files: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Deployment>,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub stored_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepositoryRecord {
    pub fn new(id: impl Into<String>, source_kind: SourceKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            project_name: None,
            description: None,
            source_kind,
            tree_structure: String::new(),
            analysis: AnalysisResult::default(),
            important_files: Vec::new(),
            selection_source: None,
            generated_tools: Vec::new(),
            documentation: String::new(),
            build_recipe: None,
            server_files: BTreeMap::new(),
            deployment: None,
            status: RecordStatus::Analyzed,
            last_error: None,
            warnings: Vec::new(),
            stored_at: now,
            updated_at: now,
        }
    }

    pub fn has_build_recipe(&self) -> bool {
        self.build_recipe
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
    }

    /// Writes tools, documentation, recipe and server files together
    pub fn apply_generation(&mut self, artifacts: GeneratedArtifacts) {
        self.generated_tools = artifacts.tools;
        self.documentation = artifacts.documentation;
        self.build_recipe = Some(artifacts.build_recipe);
        self.server_files = artifacts.server_files;
        self.status = RecordStatus::Generated;
        self.last_error = None;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            id: self.id.clone(),
            project_name: self.project_name.clone(),
            source_kind: self.source_kind,
            status: self.status,
            file_count: self.analysis.file_count,
            languages: self.analysis.languages.clone(),
            important_file_count: self.important_files.len(),
            tool_count: self.generated_tools.len(),
            has_build_recipe: self.has_build_recipe(),
            deployment_status: self.deployment.as_ref().map(|d| d.status),
            last_error: self.last_error.clone(),
            stored_at: self.stored_at,
        }
    }
}

/// Compact listing entry for `list-repositories`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub source_kind: SourceKind,
    pub status: RecordStatus,
    pub file_count: usize,
    pub languages: BTreeSet<String>,
    pub important_file_count: usize,
    pub tool_count: usize,
    pub has_build_recipe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_status: Option<DeploymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub stored_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_shape() {
        let record = RepositoryRecord::new("r1", SourceKind::InlineFileMap);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], "r1");
        assert_eq!(json["sourceKind"], "inline-file-map");
        assert_eq!(json["status"], "analyzed");
        assert_eq!(json["analysis"]["file_count"], 0);
        assert!(json.get("storedAt").is_some());
        assert!(json.get("deployment").is_none());
        assert!(json.get("buildRecipe").is_none());
        assert!(json.get("serverFiles").is_none());
    }

    #[test]
    fn test_apply_generation_sets_all_fields() {
        let mut record = RepositoryRecord::new("r1", SourceKind::WorkspacePath);
        record.status = RecordStatus::Generating;
        record.last_error = Some("earlier failure".to_string());

        record.apply_generation(GeneratedArtifacts {
            tools: Vec::new(),
            documentation: "# Guide".to_string(),
            build_recipe: "FROM alpine\n".to_string(),
            server_files: BTreeMap::from([("server.ts".to_string(), "// server".to_string())]),
        });

        assert_eq!(record.status, RecordStatus::Generated);
        assert_eq!(record.server_files.len(), 1);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["serverFiles"]["server.ts"], "// server");
        assert!(record.has_build_recipe());
        assert_eq!(record.documentation, "# Guide");
        assert!(record.last_error.is_none());
    }

    #[test]
    fn test_blank_recipe_does_not_count() {
        let mut record = RepositoryRecord::new("r1", SourceKind::WorkspacePath);
        record.build_recipe = Some("  ".to_string());
        assert!(!record.has_build_recipe());
    }

    #[test]
    fn test_summary() {
        let mut record = RepositoryRecord::new("r1", SourceKind::WorkspacePath);
        record.project_name = Some("demo".to_string());
        record.analysis.file_count = 4;

        let summary = record.summary();
        assert_eq!(summary.file_count, 4);
        assert!(!summary.has_build_recipe);
        assert_eq!(summary.project_name.as_deref(), Some("demo"));
    }
}
