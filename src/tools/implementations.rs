use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::trait_def::{parse_input, Tool};
use crate::analyzer::validate_relative_path;
use crate::deploy::{DeployOptions, DeploymentManager};
use crate::pipeline::{AnalyzeOptions, InlineOptions, PipelineError, PipelineOrchestrator};

/// Upper bound accepted for `maxFiles`
pub const MAX_FILES_LIMIT: usize = 1000;

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, PipelineError> {
    serde_json::to_value(value).map_err(|e| {
        PipelineError::new(
            crate::pipeline::ErrorKind::Internal,
            format!("Cannot serialize response: {}", e),
        )
    })
}

fn repo_id_property() -> Value {
    json!({ "type": "string", "minLength": 1, "description": "Repository identifier" })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AnalyzeInput {
    repo_id: String,
    project_name: Option<String>,
    description: Option<String>,
    max_files: Option<usize>,
    subdirectory: Option<String>,
}

pub struct AnalyzeAndGenerateTool {
    orchestrator: Arc<PipelineOrchestrator>,
    workspace_root: PathBuf,
}

impl AnalyzeAndGenerateTool {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, workspace_root: PathBuf) -> Self {
        Self {
            orchestrator,
            workspace_root,
        }
    }
}

#[async_trait]
impl Tool for AnalyzeAndGenerateTool {
    fn name(&self) -> &'static str {
        "analyze-and-generate"
    }

    fn description(&self) -> &'static str {
        "Analyze the configured workspace, select important files and generate tools, documentation and a build recipe"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repoId": repo_id_property(),
                "projectName": { "type": "string" },
                "description": { "type": "string" },
                "maxFiles": { "type": "integer", "minimum": 0, "maximum": MAX_FILES_LIMIT, "default": 20 },
                "subdirectory": { "type": "string", "description": "Path below the workspace root to analyze" }
            },
            "required": ["repoId"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, PipelineError> {
        let input: AnalyzeInput = parse_input(self.name(), arguments)?;
        if input.max_files.is_some_and(|n| n > MAX_FILES_LIMIT) {
            return Err(PipelineError::input(format!(
                "maxFiles must be at most {}",
                MAX_FILES_LIMIT
            )));
        }
        let root = match input.subdirectory.as_deref() {
            Some(sub) => self.workspace_root.join(
                validate_relative_path(sub).map_err(|e| PipelineError::from(e).for_repo(&input.repo_id))?,
            ),
            None => self.workspace_root.clone(),
        };

        let outcome = self
            .orchestrator
            .analyze_and_generate(
                &input.repo_id,
                &root,
                AnalyzeOptions {
                    project_name: input.project_name,
                    description: input.description,
                    max_files: input.max_files,
                },
            )
            .await?;

        let record = &outcome.record;
        let important: Vec<&str> = record.important_files.iter().map(|f| f.path.as_str()).collect();
        let mut data = json!({
            "repoId": record.id,
            "selectionSource": outcome.selection_source,
            "analysis": record.analysis,
            "importantFiles": important,
            "generatedTools": record.generated_tools,
            "hasBuildRecipe": record.has_build_recipe(),
            "status": record.status,
            "elapsedMs": outcome.elapsed.as_millis() as u64,
        });
        if let Some(warning) = outcome.warning {
            data["warning"] = Value::String(warning);
        }
        Ok(data)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct InlineInput {
    repo_id: String,
    file_map: BTreeMap<String, String>,
    project_name: Option<String>,
    description: Option<String>,
    port: Option<u16>,
    generate_recipe: Option<bool>,
}

pub struct StoreInlineRepositoryTool {
    orchestrator: Arc<PipelineOrchestrator>,
}

impl StoreInlineRepositoryTool {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Tool for StoreInlineRepositoryTool {
    fn name(&self) -> &'static str {
        "store-inline-repository"
    }

    fn description(&self) -> &'static str {
        "Store a repository supplied as a path to content map, analyze it in memory and generate a build recipe"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repoId": repo_id_property(),
                "fileMap": {
                    "type": "object",
                    "additionalProperties": { "type": "string" },
                    "description": "Repository-relative path to file content"
                },
                "projectName": { "type": "string" },
                "description": { "type": "string" },
                "port": { "type": "integer", "minimum": 1, "maximum": 65535 },
                "generateRecipe": { "type": "boolean", "default": true }
            },
            "required": ["repoId", "fileMap"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, PipelineError> {
        let input: InlineInput = parse_input(self.name(), arguments)?;
        if input.port == Some(0) {
            return Err(PipelineError::input("port must be between 1 and 65535"));
        }

        let outcome = self
            .orchestrator
            .store_inline_repository(
                &input.repo_id,
                &input.file_map,
                InlineOptions {
                    project_name: input.project_name,
                    description: input.description,
                    port: input.port,
                    generate_recipe: input.generate_recipe.unwrap_or(true),
                },
            )
            .await?;

        let record = &outcome.record;
        Ok(json!({
            "repoId": record.id,
            "analysis": record.analysis,
            "importantFiles": record.important_files.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(),
            "hasBuildRecipe": record.has_build_recipe(),
            "port": outcome.port,
            "status": record.status,
        }))
    }
}

pub struct ListRepositoriesTool {
    orchestrator: Arc<PipelineOrchestrator>,
}

impl ListRepositoriesTool {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoInput {}

#[async_trait]
impl Tool for ListRepositoriesTool {
    fn name(&self) -> &'static str {
        "list-repositories"
    }

    fn description(&self) -> &'static str {
        "List summaries of every stored repository record"
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {}, "additionalProperties": false })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, PipelineError> {
        let _: NoInput = parse_input(self.name(), arguments)?;
        let summaries = self.orchestrator.list_records().await?;
        Ok(json!({
            "count": summaries.len(),
            "repositories": to_json(&summaries)?,
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RepoIdInput {
    repo_id: String,
}

pub struct GetRepositoryRecordTool {
    orchestrator: Arc<PipelineOrchestrator>,
}

impl GetRepositoryRecordTool {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Tool for GetRepositoryRecordTool {
    fn name(&self) -> &'static str {
        "get-repository-record"
    }

    fn description(&self) -> &'static str {
        "Return the full stored record for one repository"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "repoId": repo_id_property() },
            "required": ["repoId"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, PipelineError> {
        let input: RepoIdInput = parse_input(self.name(), arguments)?;
        let record = self.orchestrator.get_record(&input.repo_id).await?;
        Ok(json!({
            "repoId": record.id,
            "record": to_json(&record)?,
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DeployInput {
    repo_id: String,
    subdomain: Option<String>,
    port: Option<u16>,
}

pub struct DeployTool {
    deployments: Arc<DeploymentManager>,
}

impl DeployTool {
    pub fn new(deployments: Arc<DeploymentManager>) -> Self {
        Self { deployments }
    }
}

#[async_trait]
impl Tool for DeployTool {
    fn name(&self) -> &'static str {
        "deploy"
    }

    fn description(&self) -> &'static str {
        "Build and run the repository's generated build recipe as a container"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repoId": repo_id_property(),
                "subdomain": { "type": "string", "pattern": "^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$" },
                "port": { "type": "integer", "minimum": 1, "maximum": 65535 }
            },
            "required": ["repoId"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, PipelineError> {
        let input: DeployInput = parse_input(self.name(), arguments)?;
        let outcome = self
            .deployments
            .deploy(
                &input.repo_id,
                DeployOptions {
                    port: input.port,
                    subdomain: input.subdomain,
                },
            )
            .await?;

        Ok(json!({
            "repoId": input.repo_id.trim(),
            "containerId": outcome.container.id,
            "imageId": outcome.image_id,
            "deployment": to_json(&outcome.deployment)?,
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ListContainersInput {
    repo_id: Option<String>,
}

pub struct ListContainersTool {
    deployments: Arc<DeploymentManager>,
}

impl ListContainersTool {
    pub fn new(deployments: Arc<DeploymentManager>) -> Self {
        Self { deployments }
    }
}

#[async_trait]
impl Tool for ListContainersTool {
    fn name(&self) -> &'static str {
        "list-containers"
    }

    fn description(&self) -> &'static str {
        "List containers started by this process, optionally for one repository"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "repoId": repo_id_property() },
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, PipelineError> {
        let input: ListContainersInput = parse_input(self.name(), arguments)?;
        let containers = self.deployments.list(input.repo_id.as_deref());
        debug!(count = containers.len(), "Listing containers");
        Ok(json!({
            "count": containers.len(),
            "containers": to_json(&containers)?,
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ContainerInput {
    container_id: String,
}

fn container_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "containerId": { "type": "string", "minLength": 1 } },
        "required": ["containerId"],
        "additionalProperties": false
    })
}

pub struct StopContainerTool {
    deployments: Arc<DeploymentManager>,
}

impl StopContainerTool {
    pub fn new(deployments: Arc<DeploymentManager>) -> Self {
        Self { deployments }
    }
}

#[async_trait]
impl Tool for StopContainerTool {
    fn name(&self) -> &'static str {
        "stop-container"
    }

    fn description(&self) -> &'static str {
        "Stop a running container; stopping it again reports AlreadyStopped"
    }

    fn schema(&self) -> Value {
        container_schema()
    }

    async fn execute(&self, arguments: Value) -> Result<Value, PipelineError> {
        let input: ContainerInput = parse_input(self.name(), arguments)?;
        let container = self.deployments.stop(&input.container_id).await?;
        Ok(json!({
            "containerId": container.id,
            "repoId": container.repo_id,
            "container": to_json(&container)?,
        }))
    }
}

pub struct GetContainerLogsTool {
    deployments: Arc<DeploymentManager>,
}

impl GetContainerLogsTool {
    pub fn new(deployments: Arc<DeploymentManager>) -> Self {
        Self { deployments }
    }
}

#[async_trait]
impl Tool for GetContainerLogsTool {
    fn name(&self) -> &'static str {
        "get-container-logs"
    }

    fn description(&self) -> &'static str {
        "Fetch the log output of a container started by this process"
    }

    fn schema(&self) -> Value {
        container_schema()
    }

    async fn execute(&self, arguments: Value) -> Result<Value, PipelineError> {
        let input: ContainerInput = parse_input(self.name(), arguments)?;
        let logs = self.deployments.logs(&input.container_id).await?;
        Ok(json!({
            "containerId": input.container_id,
            "logs": logs,
        }))
    }
}
