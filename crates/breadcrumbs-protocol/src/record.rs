//! The persisted envelope written to every sink.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Caller-supplied work record, kept as an ordered JSON object.
pub type LogRecord = Map<String, Value>;

/// Envelope around a caller record.
///
/// `log_id` and `server_timestamp` are assigned once when the record is
/// accepted and reused by every delivery attempt, so receivers can dedupe
/// retried deliveries on `log_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedRecord {
    /// Unique identifier generated by the server.
    pub log_id: String,
    /// Acceptance instant, rendered as RFC 3339 with millisecond precision.
    #[serde(with = "iso_millis")]
    pub server_timestamp: DateTime<Utc>,
    /// The validated caller record, stored verbatim.
    pub log_record: LogRecord,
}

impl PersistedRecord {
    /// Wrap a record with a fresh id and the current instant.
    pub fn stamp(log_record: LogRecord) -> Self {
        Self {
            log_id: Uuid::new_v4().to_string(),
            server_timestamp: Utc::now(),
            log_record,
        }
    }

    /// Server timestamp in the envelope's text form.
    pub fn timestamp_text(&self) -> String {
        iso_millis::render(&self.server_timestamp)
    }
}

mod iso_millis {
    use super::*;

    pub(super) fn render(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub(super) fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&render(value))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|value| value.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
