//! Rendering of tool responses, the tool catalogue and health reports

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::tools::{ToolInfo, ToolResponse};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

/// Availability of one backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub available: bool,
    pub message: String,
    pub details: Option<String>,
}

impl HealthStatus {
    pub fn available(message: impl Into<String>) -> Self {
        Self {
            available: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            available: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub configuration: BTreeMap<String, String>,
    pub backends: BTreeMap<String, HealthStatus>,
}

impl HealthReport {
    pub fn new(configuration: HashMap<String, String>) -> Self {
        Self {
            configuration: configuration.into_iter().collect(),
            backends: BTreeMap::new(),
        }
    }

    pub fn with_backend(mut self, name: impl Into<String>, status: HealthStatus) -> Self {
        self.backends.insert(name.into(), status);
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.backends.values().all(|s| s.available)
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn structured<T: Serialize>(&self, value: &T, what: &str) -> Result<String> {
        match self.format {
            OutputFormat::Yaml => {
                serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
            }
            _ => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
        }
    }

    pub fn format_response(&self, response: &ToolResponse) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.human_response(response)),
            _ => self.structured(response, "tool response"),
        }
    }

    pub fn format_tools(&self, tools: &[ToolInfo]) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.human_tools(tools)),
            _ => self.structured(&tools, "tool catalogue"),
        }
    }

    pub fn format_health(&self, report: &HealthReport) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.human_health(report)),
            _ => self.structured(report, "health report"),
        }
    }

    fn human_response(&self, response: &ToolResponse) -> String {
        let mut output = String::new();

        if response.success {
            output.push_str("\u{2713} Success\n");
        } else {
            output.push_str("\u{2717} Failed\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        if let Some(error) = &response.error {
            output.push_str(&format!("Error:     {}\n", error));
        }
        if let Some(kind) = &response.kind {
            output.push_str(&format!("Kind:      {}\n", kind));
        }
        if let Some(stage) = &response.stage {
            output.push_str(&format!("Stage:     {}\n", stage));
        }
        if let Some(repo_id) = &response.repo_id {
            output.push_str(&format!("Repo:      {}\n", repo_id));
        }
        if let Some(container_id) = &response.container_id {
            output.push_str(&format!("Container: {}\n", container_id));
        }

        for (key, value) in &response.data {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(_) | Value::Bool(_) => value.to_string(),
                other => serde_json::to_string_pretty(other).unwrap_or_default(),
            };
            if rendered.contains('\n') {
                output.push_str(&format!("\n{}:\n{}\n", key, rendered));
            } else {
                output.push_str(&format!("{}: {}\n", key, rendered));
            }
        }

        output
    }

    fn human_tools(&self, tools: &[ToolInfo]) -> String {
        let mut output = String::new();
        output.push_str(&format!("Available Tools ({})\n", tools.len()));
        output.push_str(RULE);
        output.push_str("\n\n");

        for tool in tools {
            output.push_str(&format!("{}\n", tool.name));
            output.push_str(&format!("  {}\n", tool.description));

            let required: Vec<&str> = tool.input_schema["required"]
                .as_array()
                .map(|r| r.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            if let Some(properties) = tool.input_schema["properties"].as_object() {
                for name in properties.keys() {
                    let marker = if required.contains(&name.as_str()) { "*" } else { " " };
                    output.push_str(&format!("  {} {}\n", marker, name));
                }
            }
            output.push('\n');
        }

        output.push_str("* = required\n");
        output
    }

    fn human_health(&self, report: &HealthReport) -> String {
        let mut output = String::new();

        output.push_str("repoforge Health\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        for (name, status) in &report.backends {
            let symbol = if status.available { "\u{2713}" } else { "\u{2717}" };
            output.push_str(&format!("{} {}\n", symbol, name));
            output.push_str(&format!(
                "  Status: {}\n",
                if status.available { "Available" } else { "Unavailable" }
            ));
            output.push_str(&format!("  Message: {}\n", status.message));
            if let Some(details) = &status.details {
                output.push_str(&format!("  Details: {}\n", details));
            }
            output.push('\n');
        }

        output.push_str("Configuration:\n");
        for (key, value) in &report.configuration {
            output.push_str(&format!("  {}: {}\n", key, value));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineError;
    use serde_json::json;

    fn report() -> HealthReport {
        let mut config = HashMap::new();
        config.insert("runtime".to_string(), "stub".to_string());
        HealthReport::new(config)
            .with_backend("intelligence", HealthStatus::available("template"))
            .with_backend(
                "runtime",
                HealthStatus::unavailable("docker unreachable").with_details("connection refused"),
            )
    }

    #[test]
    fn test_response_json_is_envelope() {
        let response = ToolResponse::ok(json!({"repoId": "demo", "count": 2}));
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_response(&response)
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["repoId"], "demo");
        assert_eq!(parsed["count"], 2);
    }

    #[test]
    fn test_response_yaml() {
        let response = ToolResponse::ok(json!({"count": 0}));
        let output = OutputFormatter::new(OutputFormat::Yaml)
            .format_response(&response)
            .unwrap();
        let parsed: Value = serde_yaml::from_str(&output).unwrap();
        assert_eq!(parsed["success"], true);
    }

    #[test]
    fn test_failure_human() {
        let response = ToolResponse::failure(&PipelineError::record_not_found("ghost"));
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_response(&response)
            .unwrap();
        assert!(output.contains("Failed"));
        assert!(output.contains("ghost"));
        assert!(output.contains("RecordNotFound"));
    }

    #[test]
    fn test_tools_human_marks_required() {
        let tools = vec![ToolInfo {
            name: "get-repository-record".to_string(),
            description: "Fetch a record".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"repoId": {"type": "string"}},
                "required": ["repoId"]
            }),
        }];
        let output = OutputFormatter::new(OutputFormat::Human).format_tools(&tools).unwrap();
        assert!(output.contains("Available Tools (1)"));
        assert!(output.contains("* repoId"));
    }

    #[test]
    fn test_health_formats() {
        let report = report();
        assert!(!report.is_healthy());

        let human = OutputFormatter::new(OutputFormat::Human).format_health(&report).unwrap();
        assert!(human.contains("\u{2713} intelligence"));
        assert!(human.contains("Unavailable"));
        assert!(human.contains("runtime: stub"));

        let json_out = OutputFormatter::new(OutputFormat::Json).format_health(&report).unwrap();
        let parsed: Value = serde_json::from_str(&json_out).unwrap();
        assert_eq!(parsed["backends"]["runtime"]["available"], false);
    }
}
