//! MCP (Model Context Protocol) server.
//!
//! Newline-delimited JSON-RPC 2.0 over stdin/stdout. Logs never go to
//! stdout since the host reads protocol messages from it.

use crate::tools::{get_tool_definitions, ToolExecutor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

/// Protocol revision the server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

/// MCP request structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    /// `None` only when the member is absent; `"id": null` still gets a reply.
    #[serde(default, deserialize_with = "present_id")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// MCP response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

/// MCP error structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Dispatches MCP requests to the tool executor.
pub struct McpServer {
    executor: ToolExecutor,
    server_name: String,
    server_version: String,
}

impl McpServer {
    pub fn new(executor: ToolExecutor) -> Self {
        Self {
            executor,
            server_name: env!("CARGO_PKG_NAME").to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Handle a request. Notifications get no response.
    pub async fn handle(&self, request: McpRequest) -> Option<McpResponse> {
        if request.jsonrpc != "2.0" {
            return request
                .id
                .map(|id| McpResponse::error(id, INVALID_REQUEST, "Invalid JSON-RPC version"));
        }

        let Some(id) = request.id else {
            debug!("Notification: {}", request.method);
            if request.method == "notifications/initialized" {
                info!("Client initialized");
            }
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => McpResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, &request.params).await,
            other => McpResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Value) -> McpResponse {
        info!("Initializing MCP session");
        McpResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version
                }
            }),
        )
    }

    fn handle_list_tools(&self, id: Value) -> McpResponse {
        McpResponse::success(id, json!({ "tools": get_tool_definitions() }))
    }

    async fn handle_call_tool(&self, id: Value, params: &Value) -> McpResponse {
        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(name) => name,
            None => return McpResponse::error(id, INVALID_PARAMS, "Missing tool name"),
        };

        if !self.executor.has_tool(name) {
            return McpResponse::error(id, INVALID_PARAMS, format!("Unknown tool: {}", name));
        }

        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args @ Value::Object(_)) => args.clone(),
            Some(_) => {
                return McpResponse::error(id, INVALID_PARAMS, "Tool arguments must be an object")
            }
        };

        let result = self.executor.execute(name, &arguments).await;
        McpResponse::success(
            id,
            json!({
                "content": [{
                    "type": "text",
                    "text": result.output
                }],
                "isError": !result.success
            }),
        )
    }

    /// Parse and handle one line of input.
    pub async fn handle_json(&self, line: &str) -> Option<McpResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                return Some(McpResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<McpRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => Some(McpResponse::error(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                format!("Invalid request: {}", e),
            )),
        }
    }

    /// Serve requests from `reader` until it closes.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    self.handle_json(line).await
                }
                Err(e) => {
                    warn!("Dropping input line that is not UTF-8: {}", e);
                    Some(McpResponse::error(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: invalid UTF-8 ({})", e),
                    ))
                }
            };

            if let Some(response) = response {
                write_response(&mut writer, &response).await?;
            }
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    /// Serve on stdin/stdout.
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        info!("MCP server running on stdio");
        let reader = BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout()).await
    }
}

/// Write a response as one line.
async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &McpResponse,
) -> std::io::Result<()> {
    match serde_json::to_string(response) {
        Ok(json) => {
            writer.write_all(json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::testing::{feed, rss_document, FakeFetcher, TestEnv};
    use std::sync::Arc;

    const TC: &str = "https://techcrunch.example.com/feed";

    fn server(env: &TestEnv) -> McpServer {
        McpServer::new(ToolExecutor::new(Arc::clone(&env.service), None))
    }

    fn env() -> TestEnv {
        let fetcher = FakeFetcher::default().with(
            TC,
            rss_document("TC", &[("OpenAI ships an AI agent", "For developers", 1)]),
        );
        TestEnv::new(vec![feed("tc", TC, &[])], fetcher)
    }

    async fn call(server: &McpServer, request: Value) -> Value {
        let response = server.handle_json(&request.to_string()).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn test_mcp_response_shapes() {
        let ok = serde_json::to_value(McpResponse::success(json!(1), json!({"ok": true}))).unwrap();
        assert_eq!(ok["jsonrpc"], "2.0");
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(McpResponse::error(Value::Null, PARSE_ERROR, "bad")).unwrap();
        assert_eq!(err["id"], Value::Null);
        assert_eq!(err["error"]["code"], -32700);
        assert!(err.get("result").is_none());
    }

    #[tokio::test]
    async fn test_initialize_and_ping() {
        let env = env();
        let server = server(&env);

        let init = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;
        assert_eq!(init["id"], 1);
        assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(init["result"]["serverInfo"]["name"], "newswire");
        assert!(init["result"]["capabilities"]["tools"].is_object());

        let pong = call(&server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"})).await;
        assert_eq!(pong["id"], "p");
        assert_eq!(pong["result"], json!({}));
    }

    #[test]
    fn test_notifications_get_no_response() {
        let env = env();
        let server = server(&env);
        let line = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
        assert!(tokio_test::block_on(server.handle_json(&line)).is_none());

        // Any request without an id is a notification, even a tool call
        let call = json!({"jsonrpc": "2.0", "method": "tools/call", "params": {"name": "refresh_all_feeds"}});
        assert!(tokio_test::block_on(server.handle_json(&call.to_string())).is_none());
        assert_eq!(env.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_null_id_is_a_request() {
        let env = env();
        let server = server(&env);

        let pong = call(&server, json!({"jsonrpc": "2.0", "id": null, "method": "ping"})).await;
        assert_eq!(pong["id"], Value::Null);
        assert_eq!(pong["result"], json!({}));

        let version = call(&server, json!({"jsonrpc": "1.0", "id": null, "method": "ping"})).await;
        assert_eq!(version["error"]["code"], INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_serve_survives_invalid_utf8() {
        let env = env();
        let server = server(&env);

        let mut input = b"{\"jsonrpc\": \"2.0\", \"id\": 1, \"method\": \"ping\xff\"}\n".to_vec();
        input.extend_from_slice(json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}).to_string().as_bytes());
        input.push(b'\n');

        let mut output = Vec::new();
        server.serve(input.as_slice(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], Value::Null);
        assert_eq!(lines[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(lines[1]["id"], 2);
        assert_eq!(lines[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let env = env();
        let server = server(&env);

        let parse = server.handle_json("{not json").await.unwrap();
        assert_eq!(parse.error.unwrap().code, PARSE_ERROR);

        let version = call(&server, json!({"jsonrpc": "1.0", "id": 2, "method": "ping"})).await;
        assert_eq!(version["error"]["code"], INVALID_REQUEST);

        let shape = call(&server, json!({"jsonrpc": "2.0", "id": 3})).await;
        assert_eq!(shape["error"]["code"], INVALID_REQUEST);
        assert_eq!(shape["id"], 3);

        let method = call(&server, json!({"jsonrpc": "2.0", "id": 4, "method": "resources/list"})).await;
        assert_eq!(method["error"]["code"], METHOD_NOT_FOUND);

        let no_name = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {}}),
        )
        .await;
        assert_eq!(no_name["error"]["code"], INVALID_PARAMS);

        let unknown = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call", "params": {"name": "nope"}}),
        )
        .await;
        assert_eq!(unknown["error"]["code"], INVALID_PARAMS);
        assert_eq!(unknown["error"]["message"], "Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let env = env();
        let server = server(&env);

        let list = call(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
        let tools = list["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 18);
        assert!(tools.iter().all(|t| t.get("inputSchema").is_some()));

        let fetched = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {"name": "fetch_rss_feed", "arguments": {"feed_id": "tc"}}
            }),
        )
        .await;
        assert_eq!(fetched["result"]["isError"], false);
        let text = fetched["result"]["content"][0]["text"].as_str().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["articles"][0]["title"], "OpenAI ships an AI agent");

        let failed = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "fetch_rss_feed", "arguments": {"feed_id": "missing"}}
            }),
        )
        .await;
        assert_eq!(failed["result"]["isError"], true);
        assert!(failed["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Feed configuration not found: missing"));
    }

    #[tokio::test]
    async fn test_serve_writes_one_line_per_response() {
        let env = env();
        let server = server(&env);

        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}).to_string(),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
            String::new(),
            json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}).to_string(),
        ]
        .join("\n");

        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
    }
}
