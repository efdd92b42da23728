//! Request handling: what the server answers to each method.

use std::time::Duration;

use serde_json::{Value, json};
use wsmcp_protocol::{
    InitializeResult, Message, RpcError, ServerCapabilities, ServerInfo, Tool, ToolCall,
    ToolResult, methods, PROTOCOL_VERSION,
};

use crate::{SERVER_NAME, SERVER_VERSION};

/// Longest delay the `sleep` tool accepts, in milliseconds.
pub const MAX_SLEEP_MS: u64 = 60_000;

/// The tools this server advertises.
pub fn tool_list() -> Vec<Tool> {
    vec![
        Tool {
            name: "echo".to_owned(),
            description: Some("Echo back the input".to_owned()),
            input_schema: json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            }),
        },
        Tool {
            name: "sleep".to_owned(),
            description: Some("Wait for the given number of milliseconds".to_owned()),
            input_schema: json!({
                "type": "object",
                "properties": {"ms": {"type": "integer", "minimum": 0}},
                "required": ["ms"]
            }),
        },
        Tool {
            name: "fail".to_owned(),
            description: Some("Always reports a tool error".to_owned()),
            input_schema: json!({"type": "object"}),
        },
    ]
}

/// Payload of the `initialize` reply.
pub fn initialize_result() -> InitializeResult {
    InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_owned(),
        capabilities: ServerCapabilities {
            tools: Some(json!({})),
            ..ServerCapabilities::default()
        },
        server_info: ServerInfo {
            name: SERVER_NAME.to_owned(),
            version: SERVER_VERSION.to_owned(),
        },
    }
}

/// Compute the reply to an inbound message, if it deserves one.
pub async fn respond(request: &Message) -> Option<Message> {
    let method = request.method.as_deref()?;
    let reply = match method {
        methods::PING => return Some(Message::pong(request.id.clone())),
        methods::INITIALIZE => to_value(&initialize_result()),
        methods::TOOLS_LIST => Ok(json!({ "tools": tool_list() })),
        methods::TOOLS_CALL => call_tool(request.params.clone()).await,
        _ => {
            tracing::info!(method, "unknown method; not answering");
            return None;
        }
    };

    let mut message = match reply {
        Ok(result) => Message::response(request.id.clone()?, result),
        Err(error) => Message::error_response(request.id.clone(), error),
    };
    message.method = Some(method.to_owned());
    Some(message)
}

async fn call_tool(params: Option<Value>) -> Result<Value, RpcError> {
    let call: ToolCall = serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| RpcError::invalid_params(format!("invalid tools/call params: {e}")))?;
    tracing::info!(tool = %call.name, arguments = ?call.arguments, "tool call");

    let result = match call.name.as_str() {
        "echo" => match call.arguments.get("message").and_then(Value::as_str) {
            Some(message) => ToolResult::text(format!("Echo: {message}")),
            None => ToolResult::error("missing string argument 'message'"),
        },
        "sleep" => match call.arguments.get("ms").and_then(Value::as_u64) {
            Some(ms) if ms <= MAX_SLEEP_MS => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                ToolResult::text(format!("Slept {ms}ms"))
            }
            _ => ToolResult::error(format!("'ms' must be an integer between 0 and {MAX_SLEEP_MS}")),
        },
        "fail" => ToolResult::error("Tool failed as requested"),
        other => return Err(RpcError::invalid_params(format!("Unknown tool: {other}"))),
    };
    to_value(&result)
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wsmcp_protocol::MessageId;

    fn request(method: &str, params: Option<Value>) -> Message {
        Message::request(MessageId::from("1"), method, params)
    }

    #[tokio::test]
    async fn test_initialize_reply_echoes_method() {
        let reply = respond(&request("initialize", Some(json!({})))).await.unwrap();
        assert_eq!(reply.id, Some(MessageId::from("1")));
        assert_eq!(reply.method.as_deref(), Some("initialize"));
        let result: InitializeResult = serde_json::from_value(reply.result.unwrap()).unwrap();
        assert_eq!(result.server_info.name, "test-mcp-server");
        assert!(result.capabilities.supports_tools());
    }

    #[tokio::test]
    async fn test_echo_tool() {
        let params = json!({"name": "echo", "arguments": {"message": "hi"}});
        let reply = respond(&request("tools/call", Some(params))).await.unwrap();
        assert_eq!(
            reply.result,
            Some(json!({"content": [{"type": "text", "text": "Echo: hi"}], "isError": false}))
        );
    }

    #[tokio::test]
    async fn test_echo_without_message_is_tool_error() {
        let params = json!({"name": "echo", "arguments": {}});
        let reply = respond(&request("tools/call", Some(params))).await.unwrap();
        let result: ToolResult = serde_json::from_value(reply.result.unwrap()).unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_rpc_error() {
        let params = json!({"name": "nope", "arguments": {}});
        let reply = respond(&request("tools/call", Some(params))).await.unwrap();
        assert_eq!(reply.error.map(|e| e.code), Some(RpcError::INVALID_PARAMS));
    }

    #[tokio::test]
    async fn test_ping_and_unknown_methods() {
        let pong = respond(&request("ping", None)).await.unwrap();
        assert_eq!(pong, Message::pong(Some(MessageId::from("1"))));
        assert!(respond(&request("resources/list", None)).await.is_none());
        assert!(
            respond(&Message::response(MessageId::from("1"), json!({})))
                .await
                .is_none()
        );
    }
}
