//! HTTP webhook sink.

use crate::retry::{Sleeper, TokioSleeper, deliver_with_retry};
use crate::{LogSink, SinkError, WebhookError};
use async_trait::async_trait;
use breadcrumbs_config::{RetryPolicy, WebhookSinkConfig};
use breadcrumbs_protocol::PersistedRecord;
use log::{debug, info};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;

/// POSTs each envelope to a configured endpoint with a per-attempt timeout
/// and bounded retry.
pub struct WebhookSink {
    client: Client,
    url: Url,
    headers: HeaderMap,
    timeout_ms: u64,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl WebhookSink {
    /// Validate the config and build the sink. Nothing is sent here.
    pub fn new(config: &WebhookSinkConfig) -> Result<Self, SinkError> {
        let url = Url::parse(config.url.trim()).map_err(|err| {
            SinkError::InvalidConfig(format!("invalid webhook url {:?}: {err}", config.url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SinkError::InvalidConfig(format!(
                "webhook url must use http or https (got {})",
                url.scheme()
            )));
        }
        if config.timeout_ms == 0 {
            return Err(SinkError::InvalidConfig(
                "webhook timeout_ms must be > 0".to_string(),
            ));
        }
        let headers = build_headers(config)?;
        let client = Client::builder().build().map_err(|err| {
            SinkError::InvalidConfig(format!("failed to build http client: {err}"))
        })?;

        info!(
            "initialized webhook sink (origin={}, timeout_ms={}, max_attempts={}, backoff_ms={})",
            url.origin().ascii_serialization(),
            config.timeout_ms,
            config.retry.max_attempts,
            config.retry.backoff_ms
        );
        Ok(Self {
            client,
            url,
            headers,
            timeout_ms: config.timeout_ms,
            retry: config.retry,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the backoff sleeper.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    async fn post_once(&self, body: &str, attempt: u32) -> Result<(), WebhookError> {
        debug!("webhook attempt (attempt={}, bytes={})", attempt, body.len());
        let request = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .body(body.to_owned());

        match tokio::time::timeout(Duration::from_millis(self.timeout_ms), request.send()).await {
            Err(_) => Err(WebhookError::Timeout {
                timeout_ms: self.timeout_ms,
            }),
            Ok(Err(err)) if err.is_timeout() => Err(WebhookError::Timeout {
                timeout_ms: self.timeout_ms,
            }),
            Ok(Err(err)) => Err(WebhookError::Transport {
                message: transport_message(&err),
            }),
            Ok(Ok(response)) if response.status().is_success() => Ok(()),
            Ok(Ok(response)) => Err(WebhookError::Http {
                status: response.status().as_u16(),
            }),
        }
    }
}

#[async_trait]
impl LogSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn describe(&self) -> String {
        format!(
            "Sink=webhook: persisted records are POSTed to {}; receivers should dedupe on log_id.",
            self.url.origin().ascii_serialization()
        )
    }

    async fn write(&self, record: &PersistedRecord) -> Result<(), SinkError> {
        let body = serde_json::to_string(record)?;
        deliver_with_retry("webhook", self.retry, self.sleeper.as_ref(), |attempt| {
            self.post_once(&body, attempt)
        })
        .await?;
        debug!("webhook accepted record (log_id={})", record.log_id);
        Ok(())
    }
}

/// `content-type: application/json` with configured headers merged over it.
fn build_headers(config: &WebhookSinkConfig) -> Result<HeaderMap, SinkError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in &config.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
            SinkError::InvalidConfig(format!("invalid webhook header name {name:?}: {err}"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|err| {
            SinkError::InvalidConfig(format!("invalid webhook header value for {name:?}: {err}"))
        })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Flatten the reqwest error chain into one line.
fn transport_message(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
