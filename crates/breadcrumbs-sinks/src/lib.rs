//! Delivery sinks for persisted work records.
//!
//! A sink accepts the [`PersistedRecord`](breadcrumbs_protocol::PersistedRecord)
//! envelope and either confirms it was stored or returns a classified error.
//! The webhook and postgres sinks share the bounded retry loop in [`retry`].

pub mod error;
pub mod factory;
pub mod jsonl;
pub mod postgres;
pub mod retry;
pub mod sink;
pub mod webhook;

/// Sink error taxonomy.
pub use error::{PostgresError, SinkError, WebhookError};
/// Sink construction from config.
pub use factory::build_sink;
/// Append-only file sink.
pub use jsonl::JsonlSink;
/// Relational sink and its insert seam.
pub use postgres::{
    DbFailure, FailureClassifier, PgInserter, PostgresSink, RecordInserter, TableIdentifier,
};
/// Retry machinery.
pub use retry::{Retryable, Sleeper, TokioSleeper, deliver_with_retry, should_retry};
/// Sink contract.
pub use sink::LogSink;
/// HTTP webhook sink.
pub use webhook::WebhookSink;
