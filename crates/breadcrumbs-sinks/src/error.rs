//! Error taxonomy for sink construction and delivery.
//!
//! Each networked sink classifies a failure exactly once, where the I/O error
//! is observed. The retry loop and callers only ever see these variants.

use crate::retry::Retryable;
use thiserror::Error;

/// HTTP statuses worth another attempt.
const RETRYABLE_STATUSES: &[u16] = &[408, 425, 429, 500, 502, 503, 504];

/// Query error codes that are transient despite not being connection errors.
const RETRYABLE_QUERY_CODES: &[&str] = &["40001", "40P01", "53300", "57P01", "57P02", "57P03"];

/// SQLSTATE class for connection exceptions.
pub(crate) const CONNECTION_EXCEPTION_CLASS: &str = "08";

/// Errors returned by sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink settings were rejected at construction time.
    #[error("invalid sink config: {0}")]
    InvalidConfig(String),
    /// Local file I/O failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The envelope could not be encoded.
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    /// Webhook delivery failed.
    #[error(transparent)]
    Webhook(#[from] WebhookError),
    /// Postgres delivery failed.
    #[error(transparent)]
    Postgres(#[from] PostgresError),
    /// The sink was closed before the write started.
    #[error("sink {0} is closed")]
    Closed(&'static str),
}

/// Classified webhook failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// A response arrived with a non-2xx status.
    #[error("Webhook endpoint responded with status {status}.")]
    Http { status: u16 },
    /// The attempt did not complete within the timeout.
    #[error("Webhook request timed out after {timeout_ms}ms.")]
    Timeout { timeout_ms: u64 },
    /// The request failed before any response was received.
    #[error("Webhook transport error: {message}")]
    Transport { message: String },
}

impl Retryable for WebhookError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Http { status } => RETRYABLE_STATUSES.contains(status),
        }
    }
}

/// Classified postgres failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostgresError {
    /// The server rejected the credentials or the role lacks privileges.
    #[error("Postgres authentication failed.")]
    Auth,
    /// The attempt exceeded the timeout, or the server cancelled the statement.
    #[error("Postgres timeout after {timeout_ms}ms.")]
    Timeout { timeout_ms: u64 },
    /// Connection-level failure.
    #[error("Postgres transport error: {message}")]
    Transport { message: String },
    /// Any other database-reported error.
    #[error("Postgres query error{}: {message}", render_code(.code))]
    Query {
        code: Option<String>,
        message: String,
    },
}

impl Retryable for PostgresError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Auth => false,
            Self::Query { code, .. } => code.as_deref().is_some_and(|code| {
                RETRYABLE_QUERY_CODES.contains(&code) || code.starts_with(CONNECTION_EXCEPTION_CLASS)
            }),
        }
    }
}

fn render_code(code: &Option<String>) -> String {
    code.as_ref()
        .map(|code| format!(" ({code})"))
        .unwrap_or_default()
}
