use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::registry::{ToolInfo, ToolRegistry};
use super::response::ToolResponse;
use crate::config::{ConfigError, ForgeConfig};
use crate::deploy::{ContainerRuntime, DeployConfig, DeploymentManager};
use crate::pipeline::{ErrorKind, PipelineContext, PipelineError, PipelineOrchestrator, RepoLocks};
use crate::store::MemoryRecordStore;

/// Dispatches tool calls and converts every outcome into a [`ToolResponse`]
pub struct ToolSystem {
    registry: ToolRegistry,
    orchestrator: Arc<PipelineOrchestrator>,
    deployments: Arc<DeploymentManager>,
}

impl ToolSystem {
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator>,
        deployments: Arc<DeploymentManager>,
        workspace_root: std::path::PathBuf,
    ) -> Self {
        Self {
            registry: ToolRegistry::new(
                Arc::clone(&orchestrator),
                Arc::clone(&deployments),
                workspace_root,
            ),
            orchestrator,
            deployments,
        }
    }

    /// Wires orchestrator and deployment manager over one store and one lock set
    pub fn assemble(
        context: PipelineContext,
        runtime: Arc<dyn ContainerRuntime>,
        deploy_config: DeployConfig,
        workspace_root: std::path::PathBuf,
    ) -> Self {
        let locks = RepoLocks::new();
        let deployments = Arc::new(DeploymentManager::new(
            Arc::clone(&context.store),
            runtime,
            locks.clone(),
            Arc::clone(&context.progress),
            deploy_config,
        ));
        let orchestrator = Arc::new(PipelineOrchestrator::with_locks(context, locks));
        Self::new(orchestrator, deployments, workspace_root)
    }

    pub fn from_config(config: &ForgeConfig) -> Result<Self, ConfigError> {
        let intelligence = config.create_intelligence()?;
        let runtime = config.create_runtime()?;
        let context = PipelineContext::with_defaults(
            intelligence,
            Arc::new(MemoryRecordStore::new()),
            config.pipeline_config(),
        );
        Ok(Self::assemble(
            context,
            runtime,
            config.deploy_config(),
            config.workspace_root.clone(),
        ))
    }

    pub fn orchestrator(&self) -> &Arc<PipelineOrchestrator> {
        &self.orchestrator
    }

    pub fn deployments(&self) -> &Arc<DeploymentManager> {
        &self.deployments
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.registry.catalogue()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.registry.tool_names()
    }

    /// Runs a tool; failures and panics come back as `success: false`
    pub async fn execute(&self, tool_name: &str, arguments: Value) -> ToolResponse {
        info!(tool = tool_name, "Executing tool");

        let Some(tool) = self.registry.get_tool(tool_name) else {
            warn!(tool = tool_name, "Unknown tool");
            return ToolResponse::failure(&PipelineError::input(format!(
                "Unknown tool: {}",
                tool_name
            )));
        };

        let result = match tokio::spawn(async move { tool.execute(arguments).await }).await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::new(
                ErrorKind::Internal,
                format!("Tool {} aborted: {}", tool_name, e),
            )),
        };

        match &result {
            Ok(output) => {
                let preview = serde_json::to_string(output).unwrap_or_default();
                let preview: String = preview.chars().take(200).collect();
                info!(tool = tool_name, "Tool execution completed");
                debug!(tool = tool_name, output_preview = %preview, "Tool output preview");
            }
            Err(e) => {
                warn!(tool = tool_name, kind = %e.kind, error = %e, "Tool execution failed");
            }
        }

        ToolResponse::from(result)
    }
}
