//! Line-delimited JSON server over stdio
//!
//! Each request is one line: `{"id": .., "method": "tools/list"}` or
//! `{"id": .., "method": "tools/call", "params": {"name": .., "arguments": {..}}}`.
//! Each reply is one line `{"id": .., "result": ..}`. Malformed requests get a
//! failure envelope as their result; the server never answers with a transport error.

use super::response::ToolResponse;
use super::system::ToolSystem;
use crate::pipeline::PipelineError;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub struct ToolServer<'a> {
    system: &'a ToolSystem,
}

impl<'a> ToolServer<'a> {
    pub fn new(system: &'a ToolSystem) -> Self {
        Self { system }
    }

    /// Answers one request line
    pub async fn handle_line(&self, line: &str) -> Value {
        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Malformed request line");
                let err = PipelineError::input(format!("Malformed request: {}", e));
                return json!({ "id": Value::Null, "result": ToolResponse::failure(&err).to_value() });
            }
        };

        let result = match request.method.as_str() {
            "tools/list" => json!({ "tools": self.system.list_tools() }),
            "tools/call" => match serde_json::from_value::<CallParams>(request.params) {
                Ok(params) => self
                    .system
                    .execute(&params.name, params.arguments)
                    .await
                    .to_value(),
                Err(e) => ToolResponse::failure(&PipelineError::input(format!(
                    "Invalid tools/call params: {}",
                    e
                )))
                .to_value(),
            },
            other => ToolResponse::failure(&PipelineError::input(format!(
                "Unknown method: {}",
                other
            )))
            .to_value(),
        };

        json!({ "id": request.id, "result": result })
    }

    /// Serves until `reader` reaches end of input
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(tools = self.system.tool_names().len(), "Tool server listening on stdio");
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            debug!(bytes = line.len(), "Request received");
            let reply = self.handle_line(&line).await;
            let mut frame = serde_json::to_string(&reply).unwrap_or_else(|e| {
                json!({"id": Value::Null, "result": {"success": false, "error": e.to_string(), "kind": "Internal"}})
                    .to_string()
            });
            frame.push('\n');
            writer.write_all(frame.as_bytes()).await?;
            writer.flush().await?;
        }
        info!("Input closed, tool server stopping");
        Ok(())
    }
}
