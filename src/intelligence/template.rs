use super::recipe::recipe_for;
use super::server::template_server_files;
use super::{CodeIntelligence, GeneratedArtifacts, GenerationRequest, IntelligenceError, RankRequest, ToolDescriptor};
use crate::analyzer::AnalysisResult;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::Write;
use tracing::debug;

/// Deterministic generation from the static analysis alone
#[derive(Debug, Clone, Default)]
pub struct TemplateIntelligence;

impl TemplateIntelligence {
    pub fn new() -> Self {
        Self
    }
}

fn tool(
    name: &str,
    title: &str,
    description: String,
    input_schema: Value,
    category: &str,
    example_input: Value,
) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        title: title.to_string(),
        description,
        input_schema,
        category: category.to_string(),
        example_input,
    }
}

fn string_param(name: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": { name: { "type": "string", "description": description } },
        "required": [name]
    })
}

fn languages_phrase(analysis: &AnalysisResult) -> String {
    if analysis.languages.is_empty() {
        "repository".to_string()
    } else {
        let names: Vec<&str> = analysis.languages.iter().map(String::as_str).collect();
        format!("{} project", names.join("/"))
    }
}

pub(crate) fn template_tools(analysis: &AnalysisResult) -> Vec<ToolDescriptor> {
    let mut tools = vec![tool(
        "analyze-project-structure",
        "Analyze Project Structure",
        format!(
            "Summarize the layout of this {} ({} files)",
            languages_phrase(analysis),
            analysis.file_count
        ),
        json!({"type": "object", "properties": {}}),
        "development",
        json!({}),
    )];

    if analysis.has_language("JavaScript") || analysis.has_language("TypeScript") {
        tools.push(tool(
            "run-npm-commands",
            "Run npm Commands",
            "Execute npm scripts to build, test or start the Node.js project".to_string(),
            string_param("script", "npm script name, e.g. test or build"),
            "development",
            json!({"script": "test"}),
        ));
    }
    if analysis.has_language("Rust") {
        tools.push(tool(
            "run-cargo-commands",
            "Run Cargo Commands",
            "Execute cargo subcommands to build, test or run the Rust project".to_string(),
            string_param("command", "cargo subcommand, e.g. build or test"),
            "development",
            json!({"command": "test"}),
        ));
    }
    if analysis.has_language("Python") {
        tools.push(tool(
            "run-python-tools",
            "Run Python Tools",
            "Run pytest, linters or other Python project tooling".to_string(),
            string_param("tool", "tool to run, e.g. pytest"),
            "development",
            json!({"tool": "pytest"}),
        ));
    }
    if analysis.has_language("Go") {
        tools.push(tool(
            "run-go-commands",
            "Run Go Commands",
            "Execute go subcommands to build, test or vet the module".to_string(),
            string_param("command", "go subcommand, e.g. test ./..."),
            "development",
            json!({"command": "test ./..."}),
        ));
    }
    if analysis.has_config("Dockerfile") {
        tools.push(tool(
            "docker-operations",
            "Docker Operations",
            "Build and manage the project's Docker image and containers".to_string(),
            string_param("action", "docker action, e.g. build or run"),
            "development",
            json!({"action": "build"}),
        ));
    }
    if let Some(first) = analysis.api_endpoints.first() {
        let example_method = if first.method == "ANY" { "GET" } else { first.method.as_str() };
        let routes: Vec<String> = analysis
            .api_endpoints
            .iter()
            .map(|e| format!("{} {}", e.method, e.path))
            .collect();
        tools.push(tool(
            "test-api-endpoint",
            "Test API Endpoint",
            format!("Send a request to one of the detected routes: {}", routes.join(", ")),
            json!({
                "type": "object",
                "properties": {
                    "method": { "type": "string", "enum": ["GET", "POST", "PUT", "DELETE", "PATCH"] },
                    "path": { "type": "string" },
                    "body": { "type": "object" }
                },
                "required": ["method", "path"]
            }),
            "api",
            json!({"method": example_method, "path": first.path}),
        ));
    }
    if !analysis.config_files.is_empty() {
        let manifests: Vec<&str> = analysis.config_files.iter().map(String::as_str).collect();
        tools.push(tool(
            "analyze-dependencies",
            "Analyze Dependencies",
            format!("Inspect declared dependencies in {}", manifests.join(", ")),
            json!({"type": "object", "properties": {}}),
            "development",
            json!({}),
        ));
    }

    tools
}

pub(crate) fn template_documentation(request: &GenerationRequest, tools: &[ToolDescriptor]) -> String {
    let analysis = &request.analysis;
    let mut doc = String::new();
    let _ = writeln!(doc, "# {} - Developer Guide\n", request.display_name());

    let _ = writeln!(doc, "## Project Overview\n");
    if let Some(description) = request.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(doc, "{}\n", description);
    }
    let _ = writeln!(
        doc,
        "A {} classified as `{}` with {} files ({} bytes).\n",
        languages_phrase(analysis),
        analysis.project_type,
        analysis.file_count,
        analysis.size_bytes
    );

    let _ = writeln!(doc, "## Languages\n");
    for language in &analysis.languages {
        let _ = writeln!(doc, "- {}", language);
    }
    if analysis.languages.is_empty() {
        let _ = writeln!(doc, "- none detected");
    }

    if !analysis.frameworks.is_empty() {
        let _ = writeln!(doc, "\n## Frameworks\n");
        for framework in &analysis.frameworks {
            let _ = writeln!(doc, "- {}", framework);
        }
    }

    if !analysis.api_endpoints.is_empty() {
        let _ = writeln!(doc, "\n## API Reference\n");
        let _ = writeln!(doc, "| Method | Path | File |");
        let _ = writeln!(doc, "|---|---|---|");
        for endpoint in &analysis.api_endpoints {
            let _ = writeln!(doc, "| {} | `{}` | {} |", endpoint.method, endpoint.path, endpoint.file);
        }
    }

    let _ = writeln!(doc, "\n## Available Tools\n");
    for t in tools {
        let _ = writeln!(doc, "### {}\n\n`{}`: {}\n", t.title, t.name, t.description);
    }

    if !request.important_files.is_empty() {
        let _ = writeln!(doc, "## Key Files\n");
        for file in &request.important_files {
            let _ = writeln!(doc, "- `{}`", file.path);
        }
    }

    doc.trim_end().to_string()
}

#[async_trait]
impl CodeIntelligence for TemplateIntelligence {
    async fn rank_files(&self, _request: &RankRequest) -> Result<Vec<String>, IntelligenceError> {
        Err(IntelligenceError::Unsupported("file ranking"))
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifacts, IntelligenceError> {
        let tools = template_tools(&request.analysis);
        let documentation = template_documentation(request, &tools);
        let build_recipe = recipe_for(&request.analysis, request.port);
        let server_files = template_server_files(request, &tools);

        debug!(repo_id = %request.repo_id, tools = tools.len(), "Template generation complete");
        Ok(GeneratedArtifacts {
            tools,
            documentation,
            build_recipe,
            server_files,
        })
    }

    fn name(&self) -> &str {
        "template"
    }

    fn supports_ranking(&self) -> bool {
        false
    }
}
