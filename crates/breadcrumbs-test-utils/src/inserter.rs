use async_trait::async_trait;
use breadcrumbs_protocol::PersistedRecord;
use breadcrumbs_sinks::{DbFailure, RecordInserter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Replays scripted insert outcomes in order, then succeeds.
#[derive(Debug, Default)]
pub struct ScriptedInserter {
    script: Mutex<VecDeque<Result<(), DbFailure>>>,
    seen: Mutex<Vec<PersistedRecord>>,
    closed: AtomicBool,
}

impl ScriptedInserter {
    pub fn new(script: Vec<Result<(), DbFailure>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Fails every attempt with the same failure.
    pub fn always(failure: DbFailure, attempts: usize) -> Self {
        Self::new(vec![Err(failure); attempts])
    }

    pub fn attempts(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn seen_log_ids(&self) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .map(|record| record.log_id.clone())
            .collect()
    }

    pub fn seen(&self) -> Vec<PersistedRecord> {
        self.seen.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordInserter for ScriptedInserter {
    async fn insert(&self, record: &PersistedRecord) -> Result<(), DbFailure> {
        self.seen.lock().push(record.clone());
        self.script.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
