//! Builds the configured sink.

use crate::{JsonlSink, LogSink, PostgresSink, SinkError, WebhookSink};
use breadcrumbs_config::SinkConfig;
use log::info;
use std::sync::Arc;

/// Construct exactly one sink from config.
///
/// Every setting is validated here so a bad URL, connection string, table
/// identifier or timeout fails at startup, never at first write. Postgres
/// pools connect lazily and must be built inside a tokio runtime.
pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn LogSink>, SinkError> {
    let sink: Arc<dyn LogSink> = match config {
        SinkConfig::Jsonl(jsonl) => {
            if jsonl.log_file.as_os_str().is_empty() {
                return Err(SinkError::InvalidConfig(
                    "jsonl log_file must not be empty".to_string(),
                ));
            }
            Arc::new(JsonlSink::new(&jsonl.log_file))
        }
        SinkConfig::Webhook(webhook) => Arc::new(WebhookSink::new(webhook)?),
        SinkConfig::Postgres(postgres) => Arc::new(PostgresSink::connect_lazy(postgres)?),
    };
    info!("sink ready (name={})", sink.name());
    Ok(sink)
}
