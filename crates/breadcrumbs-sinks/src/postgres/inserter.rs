use super::{DbFailure, TableIdentifier};
use crate::SinkError;
use async_trait::async_trait;
use breadcrumbs_config::PostgresSinkConfig;
use breadcrumbs_protocol::PersistedRecord;
use log::{debug, info};
use sqlx::Connection;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// Pool size shared by all writes.
const MAX_CONNECTIONS: u32 = 2;

/// Budget for the direct connect used to explain a pool acquire failure.
const CONNECT_DIAGNOSIS_TIMEOUT: Duration = Duration::from_secs(1);

/// Executes a single insert attempt.
#[async_trait]
pub trait RecordInserter: Send + Sync {
    async fn insert(&self, record: &PersistedRecord) -> Result<(), DbFailure>;

    /// Release connections.
    async fn close(&self) {}
}

/// sqlx-backed inserter over a small lazily connected pool.
pub struct PgInserter {
    pool: PgPool,
    options: PgConnectOptions,
    statement: String,
    timeout: Duration,
}

impl PgInserter {
    /// Build the pool without connecting; the first write opens a connection.
    ///
    /// `timeout_ms` bounds connection acquisition, the server-side
    /// `statement_timeout` and the whole attempt. Connect failures on an
    /// empty pool are reported as the underlying socket error.
    pub fn connect_lazy(
        config: &PostgresSinkConfig,
        table: &TableIdentifier,
    ) -> Result<Self, SinkError> {
        let connection_string = config.connection_string.trim();
        if !connection_string.starts_with("postgres://")
            && !connection_string.starts_with("postgresql://")
        {
            return Err(SinkError::InvalidConfig(
                "invalid connection_string: expected a postgres:// or postgresql:// url".to_string(),
            ));
        }
        let options = PgConnectOptions::from_str(connection_string)
            .map_err(|err| SinkError::InvalidConfig(format!("invalid connection_string: {err}")))?
            .options([("statement_timeout", config.timeout_ms.to_string())]);
        let timeout = config.timeout();
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(timeout)
            .connect_lazy_with(options.clone());
        info!(
            "initialized postgres pool (table={}, max_connections={}, timeout_ms={})",
            table, MAX_CONNECTIONS, config.timeout_ms
        );
        Ok(Self {
            pool,
            options,
            statement: insert_statement(table),
            timeout,
        })
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    async fn execute(&self, record: &PersistedRecord) -> Result<(), sqlx::Error> {
        // sqlx retries connect errors until acquire_timeout, so a cold pool
        // would report a refused or unresolvable host as a timeout.
        if self.pool.size() == 0 {
            let conn = PgConnection::connect_with(&self.options).await?;
            if let Err(err) = conn.close().await {
                debug!("closing preflight connection failed (error={})", err);
            }
        }
        sqlx::query(&self.statement)
            .bind(&record.log_id)
            .bind(record.server_timestamp)
            .bind(Json(&record.log_record))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Connect once outside the pool to recover the error behind a failed acquire.
    async fn diagnose_acquire(&self) -> DbFailure {
        let budget = self.timeout.min(CONNECT_DIAGNOSIS_TIMEOUT);
        match tokio::time::timeout(budget, PgConnection::connect_with(&self.options)).await {
            Ok(Err(err)) => {
                debug!("pool acquire failed, direct connect error (error={})", err);
                DbFailure::from_sqlx(&err)
            }
            Ok(Ok(conn)) => {
                let _ = conn.close().await;
                DbFailure::from_sqlx(&sqlx::Error::PoolTimedOut)
            }
            Err(_) => DbFailure::deadline(self.timeout_ms()),
        }
    }
}

#[async_trait]
impl RecordInserter for PgInserter {
    async fn insert(&self, record: &PersistedRecord) -> Result<(), DbFailure> {
        let deadline = Instant::now() + self.timeout;
        match tokio::time::timeout_at(deadline, self.execute(record)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(sqlx::Error::PoolTimedOut)) if self.pool.size() == 0 => {
                Err(self.diagnose_acquire().await)
            }
            Ok(Err(err)) => Err(DbFailure::from_sqlx(&err)),
            Err(_) if self.pool.size() == 0 => Err(self.diagnose_acquire().await),
            Err(_) => Err(DbFailure::deadline(self.timeout_ms())),
        }
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub(crate) fn insert_statement(table: &TableIdentifier) -> String {
    format!(
        "INSERT INTO {} (log_id, server_timestamp, log_record) VALUES ($1, $2, $3::jsonb)",
        table.quoted()
    )
}
