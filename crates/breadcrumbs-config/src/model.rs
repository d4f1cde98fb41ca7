//! Configuration schema for agent-breadcrumbs.

use breadcrumbs_protocol::LoggingMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root config for the breadcrumbs server.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BreadcrumbsConfig {
    #[serde(default, rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
    /// Custom `log_record.properties`; `None` keeps the default record schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Map<String, Value>>,
    #[serde(default)]
    pub logging_mode: LoggingMode,
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Overrides applied on top of the file config, typically from CLI flags
/// or environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub logging_mode: Option<LoggingMode>,
    pub log_file: Option<PathBuf>,
    pub schema: Option<Map<String, Value>>,
}

impl BreadcrumbsConfig {
    /// Apply overrides. `log_file` only affects the JSONL sink.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(mode) = overrides.logging_mode {
            self.logging_mode = mode;
        }
        if let Some(schema) = overrides.schema {
            self.schema = Some(schema);
        }
        if let (Some(path), SinkConfig::Jsonl(jsonl)) = (overrides.log_file, &mut self.sink) {
            jsonl.log_file = path;
        }
    }
}

/// Delivery target for persisted records. Exactly one sink is active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "name", content = "config", rename_all = "lowercase")]
pub enum SinkConfig {
    Jsonl(JsonlSinkConfig),
    Webhook(WebhookSinkConfig),
    Postgres(PostgresSinkConfig),
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::Jsonl(JsonlSinkConfig::default())
    }
}

impl SinkConfig {
    /// Sink name as written in config.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Jsonl(_) => "jsonl",
            Self::Webhook(_) => "webhook",
            Self::Postgres(_) => "postgres",
        }
    }
}

/// Append-only JSONL file sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonlSinkConfig {
    #[serde(default = "crate::loader::default_log_file_path")]
    pub log_file: PathBuf,
}

impl Default for JsonlSinkConfig {
    fn default() -> Self {
        Self {
            log_file: crate::loader::default_log_file_path(),
        }
    }
}

/// HTTP webhook sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookSinkConfig {
    pub url: String,
    /// Extra request headers, merged over `content-type: application/json`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl WebhookSinkConfig {
    /// Config for `url` with every optional setting at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_ms: default_webhook_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Default per-attempt webhook timeout in milliseconds.
fn default_webhook_timeout_ms() -> u64 {
    3000
}

/// Relational (Postgres) sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostgresSinkConfig {
    pub connection_string: String,
    /// Destination table, `table` or `schema.table`.
    pub table: String,
    #[serde(default = "default_postgres_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl PostgresSinkConfig {
    /// Config for a connection and table with every optional setting at its default.
    pub fn new(connection_string: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            table: table.into(),
            timeout_ms: default_postgres_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Default per-attempt postgres timeout in milliseconds.
fn default_postgres_timeout_ms() -> u64 {
    5000
}

/// Bounded retry policy shared by the networked sinks.
///
/// `max_attempts` counts retries, so a write is attempted
/// `max_attempts + 1` times at most.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    /// Total number of attempts, including the first.
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }

    /// Linear backoff after the given 1-indexed attempt failed.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Default base backoff between attempts in milliseconds.
fn default_backoff_ms() -> u64 {
    250
}
