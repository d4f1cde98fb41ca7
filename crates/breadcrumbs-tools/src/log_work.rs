//! The `log_work` tool handler.

use crate::describe::full_description;
use crate::guardrails::Guardrails;
use crate::schema::RecordSchema;
use breadcrumbs_protocol::{LoggingMode, PersistedRecord, TOOL_NAME, ToolAck, ToolError};
use breadcrumbs_sinks::LogSink;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Validates a call and hands the stamped record to the sink.
pub struct LogWorkTool {
    sink: Arc<dyn LogSink>,
    schema: RecordSchema,
    guardrails: Guardrails,
    logging_mode: LoggingMode,
}

impl LogWorkTool {
    pub fn new(sink: Arc<dyn LogSink>, schema: RecordSchema, logging_mode: LoggingMode) -> Self {
        Self {
            sink,
            schema,
            guardrails: Guardrails::default(),
            logging_mode,
        }
    }

    /// Replace the default limits.
    pub fn with_guardrails(mut self, guardrails: Guardrails) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn name(&self) -> &'static str {
        TOOL_NAME
    }

    pub fn description(&self) -> String {
        full_description(self.logging_mode, self.schema.source(), &self.sink.describe())
    }

    pub fn input_schema(&self) -> Map<String, Value> {
        self.schema.input_schema()
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    /// Run one call: request size, argument schema, record guardrails,
    /// stamp, then a single sink write.
    ///
    /// Nothing reaches the sink unless every check passed.
    pub async fn call(&self, arguments: Value) -> Result<ToolAck, ToolError> {
        self.guardrails
            .check_request(&arguments)
            .map_err(|violation| ToolError::Rejected(violation.to_string()))?;

        let parsed = self
            .schema
            .validate_arguments(&arguments)
            .map_err(ToolError::InvalidArguments)?;

        if let Some(log_record) = arguments.get("log_record") {
            self.guardrails
                .check_log_record(log_record)
                .map_err(|violation| ToolError::Rejected(violation.to_string()))?;
        }

        let record = PersistedRecord::stamp(parsed.log_record);
        let mode = parsed.logging_mode.unwrap_or(self.logging_mode);
        debug!(
            "persisting record (log_id={}, logging_mode={}, sink={})",
            record.log_id,
            mode,
            self.sink.name()
        );

        if let Err(err) = self.sink.write(&record).await {
            warn!(
                "sink write failed (log_id={}, sink={}, error={})",
                record.log_id,
                self.sink.name(),
                err
            );
            return Err(ToolError::PersistFailed(err.to_string()));
        }
        Ok(ToolAck::persisted(record.log_id))
    }
}

