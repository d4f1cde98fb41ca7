use breadcrumbs_config::{RetryPolicy, WebhookSinkConfig};
use breadcrumbs_protocol::PersistedRecord;
use breadcrumbs_sinks::{LogSink, SinkError, WebhookError, WebhookSink};
use breadcrumbs_test_utils::{RecordingSleeper, ScriptedWebhook, refused_addr};
use pretty_assertions::assert_eq;
use serde_json::{Map, json};
use std::sync::Arc;
use std::time::Duration;

fn record() -> PersistedRecord {
    let mut log_record = Map::new();
    log_record.insert("agent_id".to_string(), json!("agent-7"));
    log_record.insert("work_summary".to_string(), json!("refactored parser"));
    PersistedRecord::stamp(log_record)
}

fn sink(url: String, max_attempts: u32, sleeper: Arc<RecordingSleeper>) -> WebhookSink {
    let config = WebhookSinkConfig {
        retry: RetryPolicy::new(max_attempts, 100),
        ..WebhookSinkConfig::new(url)
    };
    WebhookSink::new(&config)
        .expect("sink")
        .with_sleeper(sleeper)
}

#[tokio::test]
async fn retries_transient_statuses_with_same_log_id() {
    let server = ScriptedWebhook::start(vec![500, 503, 204]).await;
    let sleeper = Arc::new(RecordingSleeper::new());
    let sink = sink(server.url(), 2, sleeper.clone());
    let record = record();

    sink.write(&record).await.expect("write");

    assert_eq!(server.log_ids(), vec![record.log_id.clone(); 3]);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
    let requests = server.requests();
    let first = &requests[0];
    assert_eq!(first.body["server_timestamp"], json!(record.timestamp_text()));
    assert_eq!(first.body["log_record"]["agent_id"], json!("agent-7"));
    assert_eq!(requests[2].body, requests[0].body);
}

#[tokio::test]
async fn client_error_is_never_retried() {
    let server = ScriptedWebhook::start(vec![400]).await;
    let sleeper = Arc::new(RecordingSleeper::new());
    let sink = sink(server.url(), 5, sleeper.clone());

    let err = sink.write(&record()).await.expect_err("400 is terminal");

    assert_eq!(server.requests().len(), 1);
    assert!(sleeper.delays().is_empty());
    assert!(matches!(
        err,
        SinkError::Webhook(WebhookError::Http { status: 400 })
    ));
    assert_eq!(err.to_string(), "Webhook endpoint responded with status 400.");
}

#[tokio::test]
async fn exhausted_retries_surface_last_status() {
    let server = ScriptedWebhook::start(vec![503, 429]).await;
    let sleeper = Arc::new(RecordingSleeper::new());
    let sink = sink(server.url(), 1, sleeper.clone());

    let err = sink.write(&record()).await.expect_err("exhausted");

    assert_eq!(server.requests().len(), 2);
    assert_eq!(err.to_string(), "Webhook endpoint responded with status 429.");
}

#[tokio::test]
async fn sends_json_content_type_and_configured_headers() {
    let server = ScriptedWebhook::start(Vec::new()).await;
    let mut config = WebhookSinkConfig::new(server.url());
    config
        .headers
        .insert("Authorization".to_string(), "Bearer token-1".to_string());
    let sink = WebhookSink::new(&config).expect("sink");

    sink.write(&record()).await.expect("write");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].headers["content-type"], "application/json");
    assert_eq!(requests[0].headers["authorization"], "Bearer token-1");
}

#[tokio::test]
async fn slow_endpoint_is_a_timeout() {
    let server = ScriptedWebhook::start_slow(Duration::from_millis(500)).await;
    let config = WebhookSinkConfig {
        timeout_ms: 50,
        ..WebhookSinkConfig::new(server.url())
    };
    let sink = WebhookSink::new(&config).expect("sink");

    let err = sink.write(&record()).await.expect_err("timeout");

    assert!(matches!(
        err,
        SinkError::Webhook(WebhookError::Timeout { timeout_ms: 50 })
    ));
    assert_eq!(err.to_string(), "Webhook request timed out after 50ms.");
}

#[tokio::test]
async fn refused_connection_is_transport_and_retried() {
    let addr = refused_addr().await;
    let sleeper = Arc::new(RecordingSleeper::new());
    let sink = sink(format!("http://{addr}/hook"), 2, sleeper.clone());

    let err = sink.write(&record()).await.expect_err("refused");

    assert!(matches!(err, SinkError::Webhook(WebhookError::Transport { .. })));
    assert!(err.to_string().starts_with("Webhook transport error: "));
    assert_eq!(sleeper.delays().len(), 2);
}
