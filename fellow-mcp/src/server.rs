//! MCP server implementation
//!
//! This module provides the MCP server exposing the Fellow tools and resource
//! templates, and the newline-delimited JSON-RPC loop that serves it over
//! stdio. Requests are handled concurrently; responses are written by a single
//! writer task so lines never interleave.

use crate::client::FellowClient;
use crate::resources::{resource_templates, FellowResource};
use crate::tools::all_tools;
use crate::types::*;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

/// MCP server error types.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Tool not found
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool execution failed
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    /// Invalid parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for MCP server operations.
pub type McpServerResult<T> = Result<T, McpServerError>;

impl From<McpServerError> for McpError {
    fn from(err: McpServerError) -> Self {
        match err {
            McpServerError::ToolNotFound(_) | McpServerError::InvalidParams(_) => {
                McpError::invalid_params(err.to_string())
            }
            McpServerError::ResourceNotFound(ref uri) => McpError::resource_not_found(uri),
            McpServerError::ExecutionError(_) | McpServerError::Internal(_) => {
                McpError::internal_error(err.to_string())
            }
        }
    }
}

/// Trait for tool implementations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with given arguments.
    async fn execute(&self, args: serde_json::Value) -> McpServerResult<ToolResult>;
}

/// Fellow MCP server.
pub struct McpServer {
    /// Server info
    info: ServerInfo,

    /// Server capabilities
    capabilities: ServerCapabilities,

    /// Registered tools
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,

    /// Client backing resource reads
    client: Option<FellowClient>,
}

impl McpServer {
    /// Create a new MCP server with no tools.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities {
                    list_changed: false,
                }),
                resources: Some(ResourceCapabilities {
                    subscribe: false,
                    list_changed: false,
                }),
                experimental: HashMap::new(),
            },
            tools: Arc::new(RwLock::new(HashMap::new())),
            client: None,
        }
    }

    /// Create the server with every Fellow tool and resource bound to `client`.
    pub fn fellow(client: FellowClient) -> Self {
        let tools = all_tools(&client)
            .into_iter()
            .map(|tool| (tool.definition().name, tool))
            .collect();

        Self {
            tools: Arc::new(RwLock::new(tools)),
            client: Some(client),
            ..Self::new("fellow-mcp", env!("CARGO_PKG_VERSION"))
        }
    }

    /// Register a tool.
    pub async fn register_tool(&self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        let mut tools = self.tools.write().await;
        tools.insert(name, tool);
    }

    /// Get all tool definitions, sorted by name.
    pub async fn list_tools(&self) -> Vec<ToolDefinition> {
        let tools = self.tools.read().await;
        let mut definitions: Vec<_> = tools.values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Get resource templates; empty without a client.
    pub fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        if self.client.is_some() {
            resource_templates()
        } else {
            Vec::new()
        }
    }

    /// Execute a tool.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> McpServerResult<ToolResult> {
        let tool = {
            let tools = self.tools.read().await;
            tools
                .get(name)
                .cloned()
                .ok_or_else(|| McpServerError::ToolNotFound(name.to_string()))?
        };

        tool.execute(arguments).await
    }

    /// Read a resource by URI.
    pub async fn read_resource(&self, uri: &str) -> McpServerResult<ResourceContents> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| McpServerError::ResourceNotFound(uri.to_string()))?;
        let resource = FellowResource::parse(uri)
            .ok_or_else(|| McpServerError::ResourceNotFound(uri.to_string()))?;

        resource.read(client, uri).await
    }

    /// Handle an MCP request. Notifications yield no response.
    pub async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        let Some(id) = request.id.clone() else {
            debug!(method = %request.method, "Received notification");
            return None;
        };

        // Requests must carry a string or number id.
        if request.jsonrpc != "2.0" || id == RequestId::Null {
            return Some(McpResponse::error(id, McpError::invalid_request()));
        }

        let result = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => Ok(serde_json::json!({ "tools": self.list_tools().await })),
            "tools/call" => self.handle_tools_call(request.params).await,
            "resources/list" => Ok(serde_json::json!({ "resources": [] })),
            "resources/templates/list" => Ok(serde_json::json!({
                "resourceTemplates": self.list_resource_templates()
            })),
            "resources/read" => self.handle_resources_read(request.params).await,
            _ => Err(McpError::method_not_found(&request.method)),
        };

        Some(match result {
            Ok(value) => McpResponse::success(id, value),
            Err(e) => McpResponse::error(id, e),
        })
    }

    fn handle_initialize(&self) -> serde_json::Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": self.capabilities,
            "serverInfo": self.info
        })
    }

    async fn handle_tools_call(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        let params = params.ok_or_else(|| McpError::invalid_params("Missing params"))?;
        let call: ToolCall =
            serde_json::from_value(params).map_err(|e| McpError::invalid_params(e.to_string()))?;

        let result = self.call_tool(&call.name, call.arguments).await?;
        serde_json::to_value(result).map_err(|e| McpError::internal_error(e.to_string()))
    }

    async fn handle_resources_read(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        #[derive(Deserialize)]
        struct ReadParams {
            uri: String,
        }

        let params = params.ok_or_else(|| McpError::invalid_params("Missing params"))?;
        let ReadParams { uri } =
            serde_json::from_value(params).map_err(|e| McpError::invalid_params(e.to_string()))?;

        let contents = self.read_resource(&uri).await?;
        Ok(serde_json::json!({ "contents": [contents] }))
    }

    /// Serve newline-delimited JSON-RPC from `reader`, writing responses to `writer`.
    ///
    /// Each request runs on its own task. Returns the writer once the input
    /// is exhausted and every in-flight request has answered.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> std::io::Result<W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<McpResponse>();

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(response) = rx.recv().await {
                let payload = match serde_json::to_string(&response) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("Failed to serialize response: {}", e);
                        continue;
                    }
                };
                writer.write_all(payload.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<_, std::io::Error>(writer)
        });

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed: serde_json::Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Unparseable message: {}", e);
                    let _ = tx.send(McpResponse::error(RequestId::Null, McpError::parse_error()));
                    continue;
                }
            };

            let request: McpRequest = match serde_json::from_value(parsed.clone()) {
                Ok(request) => request,
                Err(_) => {
                    let id = parsed
                        .get("id")
                        .cloned()
                        .and_then(|id| serde_json::from_value(id).ok())
                        .unwrap_or(RequestId::Null);
                    let _ = tx.send(McpResponse::error(id, McpError::invalid_request()));
                    continue;
                }
            };

            let server = Arc::clone(&self);
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_request(request).await {
                    let _ = tx.send(response);
                }
            });
        }

        drop(tx);
        info!("Input closed, waiting for in-flight requests");

        writer_task
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
    }

    /// Serve over the process's stdin/stdout.
    pub async fn run_stdio(self: Arc<Self>) -> std::io::Result<()> {
        let reader = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Echo the arguments back")
        }

        async fn execute(&self, args: serde_json::Value) -> McpServerResult<ToolResult> {
            Ok(ToolResult::structured("echo", args))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("slow", "Answer after a pause")
        }

        async fn execute(&self, _args: serde_json::Value) -> McpServerResult<ToolResult> {
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            Ok(ToolResult::structured("slow done", serde_json::json!({})))
        }
    }

    async fn server() -> Arc<McpServer> {
        let server = McpServer::new("test-server", "0.0.0");
        server.register_tool(Arc::new(EchoTool)).await;
        server.register_tool(Arc::new(SlowTool)).await;
        Arc::new(server)
    }

    #[tokio::test]
    async fn test_register_and_call_tool() {
        let server = server().await;
        let tools = server.list_tools().await;
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "slow"]);

        let result = server
            .call_tool("echo", serde_json::json!({"a": 1}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.structured_content, Some(serde_json::json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let server = server().await;
        let response = server
            .handle_request(
                McpRequest::new(1i64, "tools/call")
                    .with_params(serde_json::json!({"name": "nope", "arguments": {}})),
            )
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, McpError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = server().await;
        let response = server
            .handle_request(McpRequest::new("1", "initialize"))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "test-server");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let server = server().await;
        let response = server
            .handle_request(McpRequest::notification("notifications/initialized"))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let server = server().await;
        let response = server
            .handle_request(McpRequest::new("9", "prompts/list"))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, McpError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resource_read_without_client() {
        let server = server().await;
        let response = server
            .handle_request(
                McpRequest::new("2", "resources/read")
                    .with_params(serde_json::json!({"uri": "fellow://note/abc"})),
            )
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, McpError::RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_null_id_is_invalid_request() {
        let server = server().await;
        let request: McpRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap();
        let response = server.handle_request(request).await.unwrap();
        assert_eq!(response.id, RequestId::Null);
        assert_eq!(response.error.unwrap().code, McpError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_slow_call_does_not_block_later_requests() {
        let server = server().await;
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"slow\"}}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n",
        );

        let output = server
            .serve(tokio::io::BufReader::new(input.as_bytes()), Vec::new())
            .await
            .unwrap();

        let responses: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 2);
        assert_eq!(responses[0]["result"], serde_json::json!({}));
        assert_eq!(responses[1]["id"], 1);
        assert_eq!(responses[1]["result"]["content"][0]["text"], "slow done");
    }

    #[tokio::test]
    async fn test_serve_lines() {
        let server = server().await;
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
            "not json\n",
            "\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"tools/call\",\"params\":{\"name\":\"echo\",\"arguments\":{\"x\":true}}}\n",
        );

        let output = server
            .serve(tokio::io::BufReader::new(input.as_bytes()), Vec::new())
            .await
            .unwrap();

        let responses: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 4);

        let by_id = |id: serde_json::Value| {
            responses
                .iter()
                .find(|r| r["id"] == id)
                .cloned()
                .unwrap()
        };
        assert_eq!(by_id(serde_json::json!(1))["result"], serde_json::json!({}));
        assert_eq!(
            by_id(serde_json::Value::Null)["error"]["code"],
            McpError::PARSE_ERROR
        );
        assert_eq!(
            by_id(serde_json::json!(2))["error"]["code"],
            McpError::INVALID_REQUEST
        );
        assert_eq!(
            by_id(serde_json::json!(3))["result"]["structuredContent"]["x"],
            true
        );
    }
}
