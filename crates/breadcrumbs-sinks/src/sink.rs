use crate::SinkError;
use async_trait::async_trait;
use breadcrumbs_protocol::PersistedRecord;

#[async_trait]
/// Delivery target for persisted records.
///
/// `write` may be called concurrently. `Ok(())` means the sink accepted the
/// record for durable storage; an error means it was not confirmed.
pub trait LogSink: Send + Sync {
    /// Sink name as written in config.
    fn name(&self) -> &'static str;

    /// One-line description shown to agents in the tool listing.
    fn describe(&self) -> String;

    /// Persist one record, retrying per the sink's policy.
    async fn write(&self, record: &PersistedRecord) -> Result<(), SinkError>;

    /// Release pooled resources. Called once at shutdown.
    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
