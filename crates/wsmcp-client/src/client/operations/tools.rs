//! Tool operations.

use tracing::debug;
use wsmcp_protocol::{Error, ListToolsResult, Result, Tool, ToolCall, ToolResult, methods};

use crate::client::core::Client;

impl Client {
    /// List the tools the server offers. An empty list is a valid answer.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let result: ListToolsResult = self.typed_request(methods::TOOLS_LIST, None).await?;
        debug!(count = result.tools.len(), "tools listed");
        Ok(result.tools)
    }

    /// Names of the tools the server offers.
    pub async fn list_tool_names(&self) -> Result<Vec<String>> {
        let tools = self.list_tools().await?;
        Ok(tools.into_iter().map(|tool| tool.name).collect())
    }

    /// Invoke a tool.
    ///
    /// A tool that reports failure still returns `Ok`, with
    /// [`ToolResult::is_error`] set exactly as the server sent it. Only
    /// protocol-level failures (including a server `error` object) are `Err`.
    pub async fn call_tool(&self, call: ToolCall) -> Result<ToolResult> {
        let name = call.name.clone();
        let params = serde_json::to_value(&call).map_err(|e| Error::Encode(e.to_string()))?;
        let result: ToolResult = self.typed_request(methods::TOOLS_CALL, Some(params)).await?;
        debug!(tool = %name, is_error = result.is_error, "tool called");
        Ok(result)
    }
}
