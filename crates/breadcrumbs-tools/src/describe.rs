//! Human-readable tool descriptions shown in the tool listing.

use crate::schema::SchemaSource;
use breadcrumbs_protocol::LoggingMode;

/// Describe when to call the tool and where its fields come from.
pub fn tool_description(mode: LoggingMode, source: SchemaSource) -> String {
    let mode_guidance = match mode {
        LoggingMode::Completion => "Default mode=completion: call on meaningful progress/completion.",
        LoggingMode::Time => {
            "Default mode=time: call periodically when possible (best-effort on unmanaged clients)."
        }
    };
    let schema_guidance = match source {
        SchemaSource::Custom => {
            "Schema source=custom: persisted fields are defined by inputSchema.properties.log_record.properties."
        }
        SchemaSource::Default => {
            "Schema source=default: persisted fields use the default log_record schema."
        }
    };
    format!(
        "Log agent work. {mode_guidance} Per-call logging_mode may override default. {schema_guidance}"
    )
}

/// Tool description followed by the sink's own description.
pub fn full_description(mode: LoggingMode, source: SchemaSource, sink_description: &str) -> String {
    format!("{} {sink_description}", tool_description(mode, source))
}
