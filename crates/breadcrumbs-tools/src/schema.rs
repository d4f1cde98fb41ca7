//! `log_work` input schema and argument validation.
//!
//! Arguments are checked against the compiled input schema with format
//! assertions enabled and every error collected. Error text follows
//! `<path> <message>` and multiple errors are joined with `; `.

use breadcrumbs_protocol::{LoggingMode, ToolArguments};
use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::{Draft, ValidationError, Validator};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Where the `log_record` properties came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSource {
    Default,
    Custom,
}

impl SchemaSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The configured `log_record` properties do not form a usable schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A property schema failed to compile, e.g. an invalid `pattern`.
    #[error("invalid log_record schema: {0}")]
    Compile(String),
}

/// Properties used when config declares no custom schema.
pub fn default_log_record_properties() -> Map<String, Value> {
    let value = json!({
        "agent_id": { "type": "string" },
        "timestamp": { "type": "string", "format": "date-time" },
        "work_summary": { "type": "string" },
        "additional": { "type": "object" },
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Tool input schema wrapping the given `log_record` properties.
///
/// Extra top-level arguments are allowed; only `log_record` is required.
pub fn build_input_schema(properties: &Map<String, Value>) -> Map<String, Value> {
    let schema = json!({
        "type": "object",
        "properties": {
            "logging_mode": {
                "type": "string",
                "enum": [LoggingMode::Completion.as_str(), LoggingMode::Time.as_str()],
            },
            "log_record": {
                "type": "object",
                "properties": properties,
            },
        },
        "required": ["log_record"],
    });
    match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Resolved `log_record` schema for one server instance, compiled once.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    source: SchemaSource,
    properties: Map<String, Value>,
    validator: Arc<Validator>,
}

impl RecordSchema {
    /// Custom properties when given, otherwise the defaults.
    pub fn resolve(custom: Option<Map<String, Value>>) -> Result<Self, SchemaError> {
        match custom {
            Some(properties) => Self::compile(SchemaSource::Custom, properties),
            None => Self::compile(SchemaSource::Default, default_log_record_properties()),
        }
    }

    fn compile(source: SchemaSource, properties: Map<String, Value>) -> Result<Self, SchemaError> {
        let input = Value::Object(build_input_schema(&properties));
        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .should_validate_formats(true)
            .build(&input)
            .map_err(|err| SchemaError::Compile(err.to_string()))?;
        Ok(Self {
            source,
            properties,
            validator: Arc::new(validator),
        })
    }

    pub fn source(&self) -> SchemaSource {
        self.source
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn input_schema(&self) -> Map<String, Value> {
        build_input_schema(&self.properties)
    }

    /// Validate raw call arguments and decode them.
    pub fn validate_arguments(&self, arguments: &Value) -> Result<ToolArguments, String> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(arguments)
            .map(|error| render_error(&error))
            .collect();
        if !errors.is_empty() {
            return Err(errors.join("; "));
        }
        serde_json::from_value(arguments.clone()).map_err(|err| err.to_string())
    }
}

fn render_error(error: &ValidationError<'_>) -> String {
    let message = render_message(error);
    let path = error.instance_path.to_string();
    if path.is_empty() {
        message
    } else {
        format!("{path} {message}")
    }
}

/// Message wording for the keywords agents hit most; anything else falls
/// back to the validator's own text.
fn render_message(error: &ValidationError<'_>) -> String {
    match &error.kind {
        ValidationErrorKind::Type {
            kind: TypeKind::Single(expected),
        } => format!("must be {expected}"),
        ValidationErrorKind::Type {
            kind: TypeKind::Multiple(expected),
        } => {
            let names: Vec<String> = expected.iter().map(|name| name.to_string()).collect();
            format!("must be {}", names.join(","))
        }
        ValidationErrorKind::Required { property } => format!(
            "must have required property '{}'",
            property.as_str().unwrap_or_default()
        ),
        ValidationErrorKind::Enum { .. } => "must be equal to one of the allowed values".to_string(),
        ValidationErrorKind::Constant { .. } => "must be equal to constant".to_string(),
        ValidationErrorKind::Format { format } => format!("must match format \"{format}\""),
        ValidationErrorKind::Pattern { pattern } => format!("must match pattern \"{pattern}\""),
        ValidationErrorKind::MinLength { limit } => {
            format!("must NOT have fewer than {limit} characters")
        }
        ValidationErrorKind::MaxLength { limit } => {
            format!("must NOT have more than {limit} characters")
        }
        ValidationErrorKind::MinItems { limit } => format!("must NOT have fewer than {limit} items"),
        ValidationErrorKind::MaxItems { limit } => format!("must NOT have more than {limit} items"),
        ValidationErrorKind::Minimum { limit } => format!("must be >= {limit}"),
        ValidationErrorKind::Maximum { limit } => format!("must be <= {limit}"),
        ValidationErrorKind::ExclusiveMinimum { limit } => format!("must be > {limit}"),
        ValidationErrorKind::ExclusiveMaximum { limit } => format!("must be < {limit}"),
        ValidationErrorKind::AdditionalProperties { .. } => {
            "must NOT have additional properties".to_string()
        }
        _ => error.to_string(),
    }
}
