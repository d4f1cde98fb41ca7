//! MCP server exposing the `log_work` tool.
//!
//! The handler is transport agnostic; the binary serves it over stdio.

use breadcrumbs_protocol::{SERVER_NAME, SERVER_VERSION, ToolAck, ToolError};
use breadcrumbs_tools::LogWorkTool;
use log::{debug, info};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ErrorCode, Implementation, JsonObject,
    ListToolsResult, PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use serde_json::{Value, json};
use std::sync::Arc;

/// MCP handler wrapping a single [`LogWorkTool`].
#[derive(Clone)]
pub struct BreadcrumbsServer {
    tool: Arc<LogWorkTool>,
}

impl BreadcrumbsServer {
    pub fn new(tool: Arc<LogWorkTool>) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &Arc<LogWorkTool> {
        &self.tool
    }

    /// Tool definition advertised through `tools/list`.
    pub fn tool_definition(&self) -> Tool {
        Tool::new(
            self.tool.name(),
            self.tool.description(),
            Arc::new(self.tool.input_schema()),
        )
    }

    /// Route a `tools/call` request.
    ///
    /// Unknown tool names are protocol errors. Everything the tool itself
    /// rejects is reported inside the result with `isError` set.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        if name != self.tool.name() {
            debug!("rejecting call for unknown tool (name={})", name);
            let err = ToolError::ToolNotFound(name.to_string());
            return Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                err.to_string(),
                None,
            ));
        }
        let arguments = Value::Object(arguments.unwrap_or_default());
        Ok(match self.tool.call(arguments).await {
            Ok(ack) => ack_result(&ack),
            Err(err) => error_result(&err),
        })
    }
}

/// Successful result: the ack as text plus the same object as structured content.
pub fn ack_result(ack: &ToolAck) -> CallToolResult {
    let value = json!({ "ok": ack.ok, "log_id": ack.log_id });
    let mut result = CallToolResult::success(vec![Content::text(value.to_string())]);
    result.structured_content = Some(value);
    result
}

/// Failed result carrying the error text as a single text item.
pub fn error_result(err: &ToolError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(err.to_string())])
}

impl ServerHandler for BreadcrumbsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(vec![self.tool_definition()]))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!("tool call received (name={})", request.name);
        self.dispatch(&request.name, request.arguments).await
    }
}
