//! Append-only JSONL file sink.

use crate::{LogSink, SinkError};
use async_trait::async_trait;
use breadcrumbs_protocol::PersistedRecord;
use log::{debug, info};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends one JSON envelope per line to a local file.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    /// Serializes appends so concurrent lines never interleave.
    lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("initialized jsonl sink (path={})", path.display());
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LogSink for JsonlSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn describe(&self) -> String {
        format!(
            "Sink=jsonl: persisted records are appended to {}.",
            self.path.display()
        )
    }

    async fn write(&self, record: &PersistedRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        debug!(
            "appended record (log_id={}, bytes={})",
            record.log_id,
            line.len()
        );
        Ok(())
    }
}
