use crate::record::LogRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// When agents are told to call the tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoggingMode {
    /// Log on meaningful progress or completion.
    #[default]
    Completion,
    /// Log periodically.
    Time,
}

impl LoggingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completion => "completion",
            Self::Time => "time",
        }
    }
}

impl fmt::Display for LoggingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated arguments of a `log_work` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolArguments {
    /// Optional per-call override of the default logging mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_mode: Option<LoggingMode>,
    /// The work record to persist.
    pub log_record: LogRecord,
}

/// Acknowledgement returned after a record was persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolAck {
    pub ok: bool,
    pub log_id: String,
}

impl ToolAck {
    pub fn persisted(log_id: impl Into<String>) -> Self {
        Self {
            ok: true,
            log_id: log_id.into(),
        }
    }
}

/// Errors returned by the `log_work` tool.
///
/// The display text of each variant is what callers see in the tool result.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool name was not recognised.
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),
    /// Arguments failed schema validation.
    #[error("Invalid log_work arguments: {0}")]
    InvalidArguments(String),
    /// A guardrail rejected the call before any sink interaction.
    #[error("{0}")]
    Rejected(String),
    /// The sink did not confirm the write.
    #[error("Failed to persist log record: {0}")]
    PersistFailed(String),
}
