use crate::pipeline::PipelineError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the input object
    fn schema(&self) -> Value;
    /// Success payload fields; merged into the response envelope
    async fn execute(&self, arguments: Value) -> Result<Value, PipelineError>;
}

/// Deserializes tool arguments, treating a missing object as `{}`
pub fn parse_input<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, PipelineError> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| PipelineError::input(format!("Invalid input for {}: {}", tool, e)))
}
