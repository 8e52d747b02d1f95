//! Code intelligence: turning repository context into tools, docs and a build recipe
//!
//! [`CodeIntelligence`] is the pipeline's only view of generation. Two backends
//! exist: [`LlmIntelligence`] prompts a model through [`crate::llm::LLMClient`],
//! [`TemplateIntelligence`] derives everything deterministically from the static
//! analysis and needs no network. Both also produce the MCP server file set that
//! serves the generated tools once deployed.

mod llm_backed;
mod prompt;
pub mod recipe;
mod response;
mod server;
mod template;

pub use llm_backed::LlmIntelligence;
pub use response::{
    extract_json, parse_dockerfile, parse_ranked_paths, parse_server_files, parse_tools,
};
pub use server::SERVER_DIR;
pub use template::TemplateIntelligence;

use crate::analyzer::{AnalysisResult, ImportantFile};
use crate::llm::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntelligenceError {
    #[error("Model backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Malformed generation response: {0}")]
    InvalidResponse(String),

    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
}

/// A callable tool generated for a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    #[serde(alias = "input_schema")]
    pub input_schema: Value,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, alias = "example_input", skip_serializing_if = "Value::is_null")]
    pub example_input: Value,
}

fn default_category() -> String {
    "development".to_string()
}

/// Input for [`CodeIntelligence::rank_files`]
#[derive(Debug, Clone)]
pub struct RankRequest {
    pub tree_structure: String,
    pub analysis: AnalysisResult,
    pub max_files: usize,
}

/// Input for [`CodeIntelligence::generate`], built from the persisted partial record
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub repo_id: String,
    pub project_name: Option<String>,
    pub description: Option<String>,
    pub tree_structure: String,
    pub analysis: AnalysisResult,
    pub important_files: Vec<ImportantFile>,
    /// Port the container should listen on, when the caller chose one
    pub port: Option<u16>,
}

impl GenerationRequest {
    pub fn display_name(&self) -> &str {
        self.project_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.repo_id)
    }
}

/// Everything a successful generation produces; persisted as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedArtifacts {
    pub tools: Vec<ToolDescriptor>,
    pub documentation: String,
    pub build_recipe: String,
    /// Server implementation keyed by path under [`SERVER_DIR`]
    pub server_files: BTreeMap<String, String>,
}

#[async_trait]
pub trait CodeIntelligence: Send + Sync {
    /// Repository-relative paths worth reading, most important first
    async fn rank_files(&self, request: &RankRequest) -> Result<Vec<String>, IntelligenceError>;

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifacts, IntelligenceError>;

    fn name(&self) -> &str;

    fn model_info(&self) -> Option<String> {
        None
    }

    /// When false the selector goes straight to pattern selection
    fn supports_ranking(&self) -> bool {
        true
    }
}
