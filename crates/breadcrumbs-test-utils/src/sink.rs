use async_trait::async_trait;
use breadcrumbs_protocol::PersistedRecord;
use breadcrumbs_sinks::{LogSink, PostgresError, SinkError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory sink that keeps every accepted record.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<PersistedRecord>>,
    fail_with: Option<PostgresError>,
    writes: AtomicUsize,
    closes: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose writes always fail with `error`.
    pub fn failing(error: PostgresError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<PersistedRecord> {
        self.records.lock().clone()
    }

    /// Write calls received, including failed ones.
    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn describe(&self) -> String {
        "Sink=recording: persisted records are kept in memory.".to_string()
    }

    async fn write(&self, record: &PersistedRecord) -> Result<(), SinkError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.fail_with {
            return Err(SinkError::Postgres(error.clone()));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
