//! Relational sink: one parameterized insert per record.

mod classify;
mod identifier;
mod inserter;

pub use classify::{DbFailure, FailureClassifier};
pub use identifier::TableIdentifier;
pub use inserter::{PgInserter, RecordInserter};

use crate::retry::{Sleeper, TokioSleeper, deliver_with_retry};
use crate::{LogSink, SinkError};
use async_trait::async_trait;
use breadcrumbs_config::{PostgresSinkConfig, RetryPolicy};
use breadcrumbs_protocol::PersistedRecord;
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Inserts envelopes into a validated table with bounded retry.
pub struct PostgresSink {
    table: TableIdentifier,
    inserter: Arc<dyn RecordInserter>,
    classifier: FailureClassifier,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    closed: AtomicBool,
}

impl PostgresSink {
    /// Validate the config and build a sink over a lazily connected pool.
    pub fn connect_lazy(config: &PostgresSinkConfig) -> Result<Self, SinkError> {
        check_timeout(config)?;
        let table = TableIdentifier::parse(config.table.trim())?;
        let inserter = PgInserter::connect_lazy(config, &table)?;
        Self::from_parts(config, table, Arc::new(inserter))
    }

    /// Build a sink over any inserter. The table name is still validated.
    pub fn with_inserter(
        config: &PostgresSinkConfig,
        inserter: Arc<dyn RecordInserter>,
    ) -> Result<Self, SinkError> {
        check_timeout(config)?;
        let table = TableIdentifier::parse(config.table.trim())?;
        Self::from_parts(config, table, inserter)
    }

    fn from_parts(
        config: &PostgresSinkConfig,
        table: TableIdentifier,
        inserter: Arc<dyn RecordInserter>,
    ) -> Result<Self, SinkError> {
        let classifier = FailureClassifier::new(config.timeout_ms)?;
        info!(
            "initialized postgres sink (table={}, timeout_ms={}, max_attempts={}, backoff_ms={})",
            table, config.timeout_ms, config.retry.max_attempts, config.retry.backoff_ms
        );
        Ok(Self {
            table,
            inserter,
            classifier,
            retry: config.retry,
            sleeper: Arc::new(TokioSleeper),
            closed: AtomicBool::new(false),
        })
    }

    /// Replace the backoff sleeper.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn table(&self) -> &TableIdentifier {
        &self.table
    }
}

fn check_timeout(config: &PostgresSinkConfig) -> Result<(), SinkError> {
    if config.timeout_ms == 0 {
        return Err(SinkError::InvalidConfig(
            "postgres timeout_ms must be > 0".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl LogSink for PostgresSink {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn describe(&self) -> String {
        format!(
            "Sink=postgres: persisted records are inserted into {}.",
            self.table
        )
    }

    async fn write(&self, record: &PersistedRecord) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed(self.name()));
        }
        deliver_with_retry("postgres", self.retry, self.sleeper.as_ref(), |attempt| {
            let inserter = self.inserter.clone();
            let classifier = &self.classifier;
            async move {
                debug!(
                    "postgres attempt (attempt={}, log_id={})",
                    attempt, record.log_id
                );
                inserter
                    .insert(record)
                    .await
                    .map_err(|failure| classifier.classify(&failure))
            }
        })
        .await?;
        debug!("postgres inserted record (log_id={})", record.log_id);
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inserter.close().await;
        info!("closed postgres sink (table={})", self.table);
        Ok(())
    }
}
