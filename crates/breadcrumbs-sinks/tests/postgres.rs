use breadcrumbs_config::{PostgresSinkConfig, RetryPolicy};
use breadcrumbs_protocol::PersistedRecord;
use breadcrumbs_sinks::{DbFailure, LogSink, PostgresError, PostgresSink, SinkError};
use breadcrumbs_test_utils::{RecordingSleeper, ScriptedInserter, refused_addr};
use pretty_assertions::assert_eq;
use serde_json::{Map, json};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn record() -> PersistedRecord {
    let mut log_record = Map::new();
    log_record.insert("work_summary".to_string(), json!("migrated schema"));
    PersistedRecord::stamp(log_record)
}

fn config(max_attempts: u32) -> PostgresSinkConfig {
    PostgresSinkConfig {
        timeout_ms: 10,
        retry: RetryPolicy::new(max_attempts, 25),
        ..PostgresSinkConfig::new("postgres://unused", "public.agent_logs")
    }
}

fn sink(
    max_attempts: u32,
    inserter: Arc<ScriptedInserter>,
    sleeper: Arc<RecordingSleeper>,
) -> PostgresSink {
    PostgresSink::with_inserter(&config(max_attempts), inserter)
        .expect("sink")
        .with_sleeper(sleeper)
}

#[tokio::test]
async fn statement_timeout_then_success_takes_two_attempts() {
    let inserter = Arc::new(ScriptedInserter::new(vec![Err(DbFailure::new(
        Some("57014"),
        "canceling statement due to statement timeout",
    ))]));
    let sleeper = Arc::new(RecordingSleeper::new());
    let sink = sink(1, inserter.clone(), sleeper.clone());
    let record = record();

    sink.write(&record).await.expect("write");

    assert_eq!(inserter.attempts(), 2);
    assert_eq!(inserter.seen_log_ids(), vec![record.log_id.clone(); 2]);
    let seen = inserter.seen();
    assert_eq!(seen[0].server_timestamp, seen[1].server_timestamp);
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(25)]);
}

#[tokio::test]
async fn non_transient_query_error_is_not_retried() {
    let inserter = Arc::new(ScriptedInserter::always(
        DbFailure::new(Some("42P01"), "relation \"public.agent_logs\" does not exist"),
        3,
    ));
    let sleeper = Arc::new(RecordingSleeper::new());
    let sink = sink(2, inserter.clone(), sleeper.clone());

    let err = sink.write(&record()).await.expect_err("terminal");

    assert_eq!(inserter.attempts(), 1);
    assert!(sleeper.delays().is_empty());
    assert!(err.to_string().contains("42P01"), "{err}");
    assert!(matches!(
        err,
        SinkError::Postgres(PostgresError::Query { code: Some(ref code), .. }) if code == "42P01"
    ));
}

#[tokio::test]
async fn deadlock_is_retried_until_budget_runs_out() {
    let inserter = Arc::new(ScriptedInserter::always(
        DbFailure::new(Some("40P01"), "deadlock detected"),
        5,
    ));
    let sleeper = Arc::new(RecordingSleeper::new());
    let sink = sink(2, inserter.clone(), sleeper.clone());

    let err = sink.write(&record()).await.expect_err("exhausted");

    assert_eq!(inserter.attempts(), 3);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_millis(25), Duration::from_millis(50)]
    );
    assert_eq!(err.to_string(), "Postgres query error (40P01): deadlock detected");
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    let inserter = Arc::new(ScriptedInserter::always(
        DbFailure::new(Some("ECONNREFUSED"), "connect ECONNREFUSED 127.0.0.1:5432"),
        1,
    ));
    let sink = sink(0, inserter.clone(), Arc::new(RecordingSleeper::new()));

    let err = sink.write(&record()).await.expect_err("refused");

    assert!(matches!(err, SinkError::Postgres(PostgresError::Transport { .. })));
    assert!(err.to_string().contains("transport error"), "{err}");
}

#[tokio::test]
async fn refused_server_is_reported_as_transport_without_waiting_for_timeout() {
    let addr = refused_addr().await;
    let config = PostgresSinkConfig {
        timeout_ms: 5_000,
        retry: RetryPolicy::new(1, 25),
        ..PostgresSinkConfig::new(format!("postgres://u:p@{addr}/db"), "agent_logs")
    };
    let sleeper = Arc::new(RecordingSleeper::new());
    let sink = PostgresSink::connect_lazy(&config)
        .expect("sink")
        .with_sleeper(sleeper.clone());

    let started = Instant::now();
    let err = sink.write(&record()).await.expect_err("refused");

    assert!(
        matches!(err, SinkError::Postgres(PostgresError::Transport { .. })),
        "{err:?}"
    );
    assert!(err.to_string().contains("transport error"), "{err}");
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(25)]);
    assert!(started.elapsed() < Duration::from_secs(5), "{:?}", started.elapsed());
    sink.close().await.expect("close");
}

#[tokio::test]
async fn connect_lazy_validates_table_once_and_keeps_it() {
    let config = PostgresSinkConfig::new("postgres://u:p@127.0.0.1:1/db", " audit.agent_logs ");
    let sink = PostgresSink::connect_lazy(&config).expect("sink");
    assert_eq!(sink.table().to_string(), "audit.agent_logs");
    assert_eq!(
        sink.describe(),
        "Sink=postgres: persisted records are inserted into audit.agent_logs."
    );

    let unsafe_table = PostgresSinkConfig::new("postgres://u:p@127.0.0.1:1/db", "logs;drop");
    let err = PostgresSink::connect_lazy(&unsafe_table).err().expect("error");
    assert!(err.to_string().contains("invalid table identifier"), "{err}");
}

#[tokio::test]
async fn auth_failure_is_terminal() {
    let inserter = Arc::new(ScriptedInserter::always(
        DbFailure::new(Some("28P01"), "password authentication failed for user \"app\""),
        3,
    ));
    let sink = sink(2, inserter.clone(), Arc::new(RecordingSleeper::new()));

    let err = sink.write(&record()).await.expect_err("auth");

    assert_eq!(inserter.attempts(), 1);
    assert_eq!(err.to_string(), "Postgres authentication failed.");
}

#[tokio::test]
async fn writes_after_close_fail_without_touching_the_pool() {
    let inserter = Arc::new(ScriptedInserter::new(Vec::new()));
    let sink = sink(0, inserter.clone(), Arc::new(RecordingSleeper::new()));

    sink.close().await.expect("close");
    sink.close().await.expect("second close is a no-op");
    let err = sink.write(&record()).await.expect_err("closed");

    assert!(inserter.is_closed());
    assert_eq!(inserter.attempts(), 0);
    assert!(matches!(err, SinkError::Closed("postgres")));
}

#[tokio::test]
async fn concurrent_writes_each_land_once() {
    let inserter = Arc::new(ScriptedInserter::new(Vec::new()));
    let sink = Arc::new(sink(0, inserter.clone(), Arc::new(RecordingSleeper::new())));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let sink = sink.clone();
        handles.push(tokio::spawn(async move { sink.write(&record()).await }));
    }
    for handle in handles {
        handle.await.expect("join").expect("write");
    }

    let mut ids = inserter.seen_log_ids();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[test]
fn rejects_unsafe_table_before_any_write() {
    let config = PostgresSinkConfig::new("postgres://unused", "public.agent_logs;drop_table");
    let err = PostgresSink::with_inserter(&config, Arc::new(ScriptedInserter::new(Vec::new())))
        .err()
        .expect("error");
    assert!(err.to_string().contains("invalid table identifier"), "{err}");
}
