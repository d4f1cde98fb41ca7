//! Wire types shared by the breadcrumbs tool, sinks and server.

mod record;
mod tool;

pub use record::{LogRecord, PersistedRecord};
pub use tool::{LoggingMode, ToolAck, ToolArguments, ToolError};

/// Name of the single tool exposed to agents.
pub const TOOL_NAME: &str = "log_work";
/// Server name announced to MCP clients.
pub const SERVER_NAME: &str = "agent-breadcrumbs";
/// Server version announced to MCP clients.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
