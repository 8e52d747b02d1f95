use super::{GenerationRequest, RankRequest, ToolDescriptor};
use crate::analyzer::AnalysisResult;
use std::fmt::Write;

pub const RANK_SYSTEM: &str = "You are a senior engineer triaging an unfamiliar repository. \
Pick the files that best explain what the project does and how to run it. \
Respond with a JSON array of repository-relative paths only.";

pub const TOOLS_SYSTEM: &str = "You are an expert at creating practical developer tools. \
Generate tools developers would actually want to use. Return a valid JSON array only.";

pub const DOCS_SYSTEM: &str = "You are a technical writer creating developer documentation. \
Write clear, practical markdown that helps developers understand and use the codebase.";

pub const DOCKERFILE_SYSTEM: &str = "You write production-ready Dockerfiles. \
Return only the Dockerfile contents, no commentary.";

pub const SERVER_SYSTEM: &str = "You are an expert Node.js developer creating production-ready MCP servers. \
Generate complete, working TypeScript with proper error handling. Return a JSON object only.";

const MAX_CONTEXT_FILES: usize = 10;
const MAX_FILE_CHARS: usize = 2000;
const MAX_TREE_CHARS: usize = 6000;

fn truncate(text: &str, limit: usize) -> (&str, bool) {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

fn join(set: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    let items: Vec<String> = set.into_iter().map(|s| s.as_ref().to_string()).collect();
    if items.is_empty() {
        "none detected".to_string()
    } else {
        items.join(", ")
    }
}

fn analysis_block(analysis: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "- Languages: {}", join(&analysis.languages));
    let _ = writeln!(out, "- Config files: {}", join(&analysis.config_files));
    let _ = writeln!(out, "- Frameworks: {}", join(&analysis.frameworks));
    let _ = writeln!(out, "- Project type: {}", analysis.project_type);
    let _ = writeln!(out, "- File count: {}", analysis.file_count);
    let _ = writeln!(out, "- Size: {} bytes", analysis.size_bytes);
    if !analysis.api_endpoints.is_empty() {
        let _ = writeln!(out, "- API endpoints:");
        for endpoint in &analysis.api_endpoints {
            let _ = writeln!(
                out,
                "  - {} {} ({}, {})",
                endpoint.method, endpoint.path, endpoint.file, endpoint.framework
            );
        }
    }
    out
}

fn tree_block(tree: &str) -> String {
    let (tree, cut) = truncate(tree, MAX_TREE_CHARS);
    if cut {
        format!("{}\n... [truncated]", tree)
    } else {
        tree.to_string()
    }
}

pub fn rank_prompt(request: &RankRequest) -> String {
    format!(
        "PROJECT STRUCTURE:\n{tree}\n\nBASIC ANALYSIS:\n{analysis}\n\
         Select at most {max} files that matter most for understanding, building and \
         running this project (manifests, entry points, routes, models). \
         Use paths exactly as they appear in the structure.\n\
         Respond with a JSON array such as [\"package.json\", \"src/index.js\"].",
        tree = tree_block(&request.tree_structure),
        analysis = analysis_block(&request.analysis),
        max = request.max_files,
    )
}

/// Shared repository context for the generation prompts
pub fn repository_context(request: &GenerationRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Repository: {}", request.display_name());
    if let Some(description) = request.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "Description: {}", description);
    }
    let _ = writeln!(out, "\nPROJECT STRUCTURE:\n{}", tree_block(&request.tree_structure));
    let _ = writeln!(out, "\nBASIC ANALYSIS:\n{}", analysis_block(&request.analysis));

    if !request.important_files.is_empty() {
        let _ = writeln!(out, "KEY FILES (first {}):", MAX_CONTEXT_FILES);
        for file in request.important_files.iter().take(MAX_CONTEXT_FILES) {
            let (content, cut) = truncate(&file.content, MAX_FILE_CHARS);
            let _ = writeln!(out, "\n--- {} ---\n{}", file.path, content);
            if cut {
                let _ = writeln!(out, "... [truncated]");
            }
        }
    }
    out
}

pub fn tools_prompt(context: &str) -> String {
    format!(
        "{context}\n\
         Based on this repository, generate 5-8 useful tools that help developers work \
         with this specific project: API testing tools for detected endpoints, business \
         logic tools, data tools, and build/test/deploy tools.\n\n\
         Return a JSON array where every element has this structure:\n\
         {{\n  \"name\": \"kebab-case-name\",\n  \"title\": \"Human Readable Title\",\n  \
         \"description\": \"What this tool does\",\n  \"input_schema\": {{\"type\": \"object\", \
         \"properties\": {{}}}},\n  \"category\": \"api|business_logic|database|integration|development\",\n  \
         \"example_input\": {{}}\n}}"
    )
}

pub fn docs_prompt(context: &str, tools: &[ToolDescriptor], project: &str) -> String {
    let tool_list = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());
    format!(
        "{context}\n\
         Generated tools:\n{tool_list}\n\n\
         Write developer documentation in markdown titled \"# {project} - Developer Guide\" \
         with sections: Project Overview, API Reference, Key Functions & Business Logic, \
         Available Tools, Development Guide. Be concrete and use code examples where helpful."
    )
}

pub fn dockerfile_prompt(context: &str, template: &str, port: u16) -> String {
    format!(
        "{context}\n\
         Write a Dockerfile that builds and runs this project. The container must listen on \
         port {port} and declare it with EXPOSE {port}. A generic starting point:\n\n\
         {template}\n\
         Adapt it to the actual project files."
    )
}

pub fn server_prompt(tools: &[ToolDescriptor], project: &str) -> String {
    let tool_list = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Generate a deployable MCP server for {project} that implements these tools:\n{tool_list}\n\n\
         Requirements:\n\
         - Use @modelcontextprotocol/sdk with the stdio transport\n\
         - Implement every tool with input validation and error handling\n\
         - Expose ../DOCUMENTATION.md as a markdown resource\n\
         - TypeScript compiled with tsc; `npm start` runs the compiled server\n\n\
         Return a JSON object mapping file paths to file contents, with at least:\n\
         {{\"package.json\": \"...\", \"server.ts\": \"...\", \"tsconfig.json\": \"...\", \"README.md\": \"...\"}}"
    )
}
