//! Shape validation for raw model output

use super::recipe::has_from_instruction;
use super::{IntelligenceError, ToolDescriptor};
use crate::analyzer::validate_relative_path;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn fence_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_-]*[ \t]*\n?([\s\S]*?)\n?```").ok())
        .as_ref()
}

fn kebab_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").ok())
        .as_ref()
}

fn invalid(message: impl Into<String>) -> IntelligenceError {
    IntelligenceError::InvalidResponse(message.into())
}

/// Body of the first fenced block, or the trimmed text when there is none
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    fence_re()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed)
}

/// Pulls a JSON array or object out of free text, fenced or not
pub fn extract_json(response: &str) -> Result<Value, IntelligenceError> {
    let trimmed = response.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let fenced = strip_fences(trimmed);
    if fenced != trimmed {
        if let Ok(value) = serde_json::from_str::<Value>(fenced) {
            return Ok(value);
        }
    }

    // whichever bracket opens first is the outermost value
    let mut spans: Vec<(usize, char)> = [('[', ']'), ('{', '}')]
        .into_iter()
        .filter_map(|(open, close)| trimmed.find(open).map(|start| (start, close)))
        .collect();
    spans.sort_unstable();

    for (start, close) in spans {
        if let Some(end) = trimmed.rfind(close) {
            if start < end {
                if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }

    Err(invalid(format!(
        "no JSON found in response: {}",
        trimmed.chars().take(100).collect::<String>()
    )))
}

fn validate_tool(tool: &ToolDescriptor) -> Result<(), IntelligenceError> {
    if !kebab_re().is_some_and(|re| re.is_match(&tool.name)) {
        return Err(invalid(format!("tool name '{}' is not kebab-case", tool.name)));
    }
    if tool.title.trim().is_empty() {
        return Err(invalid(format!("tool '{}' has no title", tool.name)));
    }
    if tool.description.trim().is_empty() {
        return Err(invalid(format!("tool '{}' has no description", tool.name)));
    }
    if !tool.input_schema.is_object() {
        return Err(invalid(format!(
            "tool '{}' input_schema must be an object",
            tool.name
        )));
    }
    Ok(())
}

/// Parses and validates a generated tool list; one bad tool rejects the list
pub fn parse_tools(response: &str) -> Result<Vec<ToolDescriptor>, IntelligenceError> {
    let value = extract_json(response)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("tools") {
            Some(Value::Array(items)) => items,
            _ => return Err(invalid("expected a JSON array of tools")),
        },
        _ => return Err(invalid("expected a JSON array of tools")),
    };
    if items.is_empty() {
        return Err(invalid("tool list is empty"));
    }

    let mut tools = Vec::with_capacity(items.len());
    for item in items {
        let tool: ToolDescriptor = serde_json::from_value(item)
            .map_err(|e| invalid(format!("tool does not match the descriptor shape: {}", e)))?;
        validate_tool(&tool)?;
        if tools.iter().any(|t: &ToolDescriptor| t.name == tool.name) {
            return Err(invalid(format!("duplicate tool name '{}'", tool.name)));
        }
        tools.push(tool);
    }

    debug!(count = tools.len(), "Parsed generated tools");
    Ok(tools)
}

/// Accepts `["a", "b"]` or `{"files": ["a", "b"]}`; non-string entries are dropped
pub fn parse_ranked_paths(response: &str) -> Result<Vec<String>, IntelligenceError> {
    let value = extract_json(response)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("files") {
            Some(Value::Array(items)) => items,
            _ => return Err(invalid("expected a JSON array of paths")),
        },
        _ => return Err(invalid("expected a JSON array of paths")),
    };

    let total = items.len();
    let paths: Vec<String> = items
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
        .collect();
    if paths.len() < total {
        warn!(dropped = total - paths.len(), "Ignoring non-path entries in ranking");
    }
    Ok(paths)
}

/// Strips fences and checks the result is a Dockerfile
pub fn parse_dockerfile(response: &str) -> Result<String, IntelligenceError> {
    let body = strip_fences(response);
    if !has_from_instruction(body) {
        return Err(invalid("build recipe has no FROM instruction"));
    }
    Ok(format!("{}\n", body.trim_end()))
}

/// Parses a `{"path": "contents"}` object into a server file set
///
/// Paths are normalized and must stay inside the server directory; a
/// `package.json` is required. An optional `files` wrapper is accepted.
pub fn parse_server_files(response: &str) -> Result<BTreeMap<String, String>, IntelligenceError> {
    let map = match extract_json(response)? {
        Value::Object(mut map) => {
            if map.len() == 1 && map.get("files").is_some_and(Value::is_object) {
                match map.remove("files") {
                    Some(Value::Object(inner)) => inner,
                    _ => map,
                }
            } else {
                map
            }
        }
        _ => return Err(invalid("expected a JSON object of server files")),
    };

    let mut files = BTreeMap::new();
    for (raw, content) in map {
        let Value::String(content) = content else {
            return Err(invalid(format!("server file '{}' is not a string", raw)));
        };
        let path = validate_relative_path(&raw)
            .map_err(|e| invalid(format!("server file path rejected: {}", e)))?;
        files.insert(path, content);
    }
    if !files.contains_key("package.json") {
        return Err(invalid("server files have no package.json"));
    }

    debug!(count = files.len(), "Parsed server files");
    Ok(files)
}

pub fn parse_documentation(response: &str) -> Result<String, IntelligenceError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(invalid("documentation is empty"));
    }
    Ok(trimmed.to_string())
}
