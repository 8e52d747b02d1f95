//! The envelope every tool call answers with

use crate::pipeline::{ErrorKind, PipelineError, Stage};
use serde::Serialize;
use serde_json::{Map, Value};

/// `{success, error?, kind?, stage?, repoId?, containerId?, ...data}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ToolResponse {
    pub fn ok(data: Value) -> Self {
        let mut data = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                map
            }
        };
        let repo_id = take_string(&mut data, "repoId");
        let container_id = take_string(&mut data, "containerId");
        Self {
            success: true,
            error: None,
            kind: None,
            stage: None,
            repo_id,
            container_id,
            data,
        }
    }

    pub fn failure(err: &PipelineError) -> Self {
        Self {
            success: false,
            error: Some(err.message.clone()),
            kind: Some(err.kind),
            stage: err.stage,
            repo_id: err.repo_id.clone(),
            container_id: err.container_id.clone(),
            data: Map::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "success": false,
                "error": format!("Response serialization failed: {}", e),
                "kind": ErrorKind::Internal,
            })
        })
    }
}

impl From<Result<Value, PipelineError>> for ToolResponse {
    fn from(result: Result<Value, PipelineError>) -> Self {
        match result {
            Ok(data) => ToolResponse::ok(data),
            Err(e) => ToolResponse::failure(&e),
        }
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_flattens_data() {
        let value = ToolResponse::ok(json!({"repoId": "r1", "count": 2})).to_value();
        assert_eq!(value, json!({"success": true, "repoId": "r1", "count": 2}));
    }

    #[test]
    fn test_failure_envelope() {
        let err = PipelineError::container_not_found("c9");
        let value = ToolResponse::failure(&err).to_value();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Container c9 not found");
        assert_eq!(value["kind"], "RecordNotFound");
        assert_eq!(value["containerId"], "c9");
        assert!(value.get("repoId").is_none());
    }

    #[test]
    fn test_scalar_payload() {
        let value = ToolResponse::ok(json!("done")).to_value();
        assert_eq!(value["result"], "done");
    }
}
