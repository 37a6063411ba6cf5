//! JSON-RPC 2.0 envelopes for the two MCP methods discovery needs.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{QueryError, QueryResult};

use super::types::ToolInfo;

/// Protocol revision sent in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Client name reported in `initialize`.
pub const CLIENT_NAME: &str = "mcp-toolscan";

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: u64,
}

/// `initialize` handshake, always id 1.
pub fn initialize_request() -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0",
        method: "initialize",
        params: Some(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })),
        id: 1,
    }
}

/// `tools/list`, always id 2 and without params.
pub fn tools_list_request() -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0",
        method: "tools/list",
        params: None,
        id: 2,
    }
}

/// Serialize a request as one newline-terminated line for stdio servers.
pub fn to_line(request: &JsonRpcRequest) -> QueryResult<String> {
    Ok(serde_json::to_string(request)? + "\n")
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Tool record as advertised in `result.tools`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl RawTool {
    pub fn into_tool_info(self, server: &str) -> ToolInfo {
        ToolInfo::new(server, self.name, self.description)
    }
}

/// Extract `result.tools` from a `tools/list` response body.
///
/// A missing `result` or `tools` member means the server advertises nothing.
pub fn parse_tools(body: Value) -> QueryResult<Vec<RawTool>> {
    let response: JsonRpcResponse = serde_json::from_value(body)?;
    if let Some(err) = response.error {
        return Err(QueryError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    let tools = response
        .result
        .and_then(|mut r| r.get_mut("tools").map(Value::take))
        .unwrap_or_else(|| json!([]));
    Ok(serde_json::from_value(tools)?)
}

/// Parse a raw line (stdio) into tool records.
pub fn parse_tools_line(line: &str) -> QueryResult<Vec<RawTool>> {
    let body: Value = serde_json::from_str(line.trim())?;
    parse_tools(body)
}

/// Namespace raw tool records under `server`.
pub fn to_tool_infos(server: &str, tools: Vec<RawTool>) -> Vec<ToolInfo> {
    tools.into_iter().map(|t| t.into_tool_info(server)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_envelope_shape() {
        let v = serde_json::to_value(initialize_request()).unwrap();
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["method"], "initialize");
        assert_eq!(v["id"], 1);
        assert_eq!(v["params"]["protocolVersion"], "2024-11-05");
        assert_eq!(v["params"]["capabilities"], json!({}));
        assert_eq!(v["params"]["clientInfo"]["name"], CLIENT_NAME);
    }

    #[test]
    fn tools_list_line_omits_params() {
        let line = to_line(&tools_list_request()).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.contains("\"method\":\"tools/list\""));
        assert!(line.contains("\"id\":2"));
        assert!(!line.contains("params"));
    }

    #[test]
    fn parse_tools_maps_names_and_descriptions() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {"tools": [
                {"name": "browser_click", "description": "Click"},
                {"name": "browser_navigate", "inputSchema": {}}
            ]}
        });
        let tools = to_tool_infos("playwright", parse_tools(body).unwrap());
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].full_name, "mcp__playwright__browser_click");
        assert_eq!(tools[0].description.as_deref(), Some("Click"));
        assert_eq!(tools[1].full_name, "mcp__playwright__browser_navigate");
        assert!(tools[1].description.is_none());
    }

    #[test]
    fn missing_tools_is_empty() {
        let tools = parse_tools(json!({"jsonrpc": "2.0", "id": 2, "result": {}})).unwrap();
        assert!(tools.is_empty());
    }

    #[test]
    fn rpc_error_is_surfaced() {
        let body = json!({"jsonrpc": "2.0", "id": 2, "error": {"code": -32601, "message": "Method not found"}});
        let err = parse_tools(body).unwrap_err();
        assert!(matches!(err, QueryError::Rpc { code: -32601, .. }));
    }

    #[test]
    fn garbage_line_is_json_error() {
        assert!(matches!(
            parse_tools_line("not json"),
            Err(QueryError::Json(_))
        ));
    }
}
