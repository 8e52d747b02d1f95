//! Tool registry
//!
//! Holds the eight operations of the tool-invocation contract.

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use super::implementations::*;
use super::trait_def::Tool;
use crate::deploy::DeploymentManager;
use crate::pipeline::PipelineOrchestrator;

/// Catalogue entry returned by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator>,
        deployments: Arc<DeploymentManager>,
        workspace_root: PathBuf,
    ) -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(AnalyzeAndGenerateTool::new(
                Arc::clone(&orchestrator),
                workspace_root,
            )),
            Arc::new(StoreInlineRepositoryTool::new(Arc::clone(&orchestrator))),
            Arc::new(ListRepositoriesTool::new(Arc::clone(&orchestrator))),
            Arc::new(GetRepositoryRecordTool::new(orchestrator)),
            Arc::new(DeployTool::new(Arc::clone(&deployments))),
            Arc::new(ListContainersTool::new(Arc::clone(&deployments))),
            Arc::new(StopContainerTool::new(Arc::clone(&deployments))),
            Arc::new(GetContainerLogsTool::new(deployments)),
        ];

        Self { tools }
    }

    pub fn catalogue(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.schema(),
            })
            .collect()
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
