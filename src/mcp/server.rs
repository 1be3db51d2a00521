//! MCP Server implementation
//!
//! Dispatches JSON-RPC messages to the tool, resource and prompt handlers.
//! The same dispatcher backs the stdio transport and the HTTP endpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::context::AppContext;
use crate::error::{GmailMcpError, McpError, Result};
use crate::mcp::prompts::PromptHandler;
use crate::mcp::resources::ResourceHandler;
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;

/// MCP Server info
pub const SERVER_NAME: &str = "Gmail MCP Server";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for Gmail
pub struct McpServer {
    context: Arc<AppContext>,
    tool_handler: ToolHandler,
    resource_handler: ResourceHandler,
    prompt_handler: PromptHandler,

    /// Set once the client confirms initialization
    initialized: AtomicBool,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(context: Arc<AppContext>) -> Self {
        Self {
            tool_handler: ToolHandler::new(context.clone()),
            resource_handler: ResourceHandler::new(context.clone()),
            prompt_handler: PromptHandler::new(context.clone()),
            context,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    /// Names of the registered tools
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_handler
            .list_tools()
            .into_iter()
            .map(|tool| tool.name)
            .collect()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    /// Run the server on stdio, one JSON message per line
    pub async fn run_stdio(&self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        tracing::info!("MCP server listening on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match self.handle_message(&line).await {
                Ok(Some(response)) => {
                    let mut response_str = serde_json::to_string(&response)?;
                    response_str.push('\n');
                    stdout.write_all(response_str.as_bytes()).await?;
                    stdout.flush().await?;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Error handling message: {}", e);
                }
            }
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle a raw JSON-RPC message
    ///
    /// Returns `None` for notifications.
    pub async fn handle_message(&self, message: &str) -> Result<Option<JsonRpcResponse>> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                return Ok(Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                )));
            }
        };

        self.handle_request(request).await
    }

    /// Handle a parsed JSON-RPC request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Result<Option<JsonRpcResponse>> {
        if request.is_notification() {
            if request.method == methods::INITIALIZED {
                self.initialized.store(true, Ordering::Relaxed);
            } else {
                tracing::debug!("Ignoring notification {}", request.method);
            }
            return Ok(None);
        }

        let id = request.id.clone();
        let outcome = match request.method.as_str() {
            methods::INITIALIZE => to_value(self.handle_initialize()),
            methods::PING => Ok(serde_json::json!({})),
            methods::LIST_TOOLS => to_value(ListToolsResult {
                tools: self.tool_handler.list_tools(),
            }),
            methods::CALL_TOOL => self.handle_call_tool(request.params).await,
            methods::LIST_RESOURCES => to_value(ListResourcesResult {
                resources: self.resource_handler.list_resources(),
            }),
            methods::READ_RESOURCE => self.handle_read_resource(request.params).await,
            methods::LIST_PROMPTS => to_value(ListPromptsResult {
                prompts: self.prompt_handler.list_prompts(),
            }),
            methods::GET_PROMPT => self.handle_get_prompt(request.params).await,
            _ => Err(JsonRpcError::method_not_found(&request.method)),
        };

        Ok(Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        }))
    }

    fn handle_initialize(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
                resources: Some(ResourcesCapability::default()),
                prompts: Some(PromptsCapability::default()),
            },
        }
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> RpcResult {
        let params: CallToolParams = parse_params(params)?;
        let result = self
            .tool_handler
            .call_tool(&params.name, params.arguments)
            .await;
        to_value(result)
    }

    async fn handle_read_resource(&self, params: Option<Value>) -> RpcResult {
        let params: ReadResourceParams = parse_params(params)?;
        let result = self
            .resource_handler
            .read_resource(&params.uri)
            .await
            .map_err(rpc_error)?;
        to_value(result)
    }

    async fn handle_get_prompt(&self, params: Option<Value>) -> RpcResult {
        let params: GetPromptParams = parse_params(params)?;
        let result = self
            .prompt_handler
            .get_prompt(&params.name)
            .await
            .map_err(rpc_error)?;
        to_value(result)
    }
}

type RpcResult = std::result::Result<Value, JsonRpcError>;

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> std::result::Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing parameters"))?;
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn to_value<T: Serialize>(value: T) -> RpcResult {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

fn rpc_error(error: GmailMcpError) -> JsonRpcError {
    match error {
        GmailMcpError::Mcp(McpError::UnknownResource { .. } | McpError::UnknownPrompt { .. }) => {
            JsonRpcError::invalid_params(error.to_string())
        }
        other => JsonRpcError::internal_error(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    async fn server(dir: &std::path::Path) -> McpServer {
        let mut config = Config::with_app_dir(dir).unwrap();
        config.completion.api_key = None;
        McpServer::new(Arc::new(AppContext::new(config).await.unwrap()))
    }

    #[tokio::test]
    async fn test_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path()).await;
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap()
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["resources"].is_object());
        assert!(result["capabilities"]["prompts"].is_object());
    }

    #[tokio::test]
    async fn test_initialized_notification() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path()).await;
        assert!(!server.is_initialized());
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .unwrap();
        assert!(response.is_none());
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path()).await;
        let response = server.handle_message("{not json").await.unwrap().unwrap();
        assert!(response.id.is_none());
        assert_eq!(response.error.unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_unknown_prompt_is_invalid_params() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path()).await;
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":"a","method":"prompts/get","params":{"name":"nope"}}"#,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.id, Some(RequestId::String("a".to_string())));
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_call_tool_without_params() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path()).await;
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call"}"#)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32602);
    }
}
