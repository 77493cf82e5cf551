use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use bchat_core::tools::{Tool, ToolContext, ToolError, ToolResult};

/// Connectivity check tool: reflects its input back.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo input text for testing the connection"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to echo back"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let text = args.get("text").and_then(|v| v.as_str()).unwrap_or("");
        if text.is_empty() {
            return Ok(ToolResult::error("Error: No text provided", start.elapsed()));
        }
        Ok(ToolResult::text(format!("Echo: {text}"), start.elapsed()))
    }
}
