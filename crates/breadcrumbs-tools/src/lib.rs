//! The `log_work` tool: guardrails, argument validation and persistence.

pub mod describe;
pub mod guardrails;
pub mod log_work;
pub mod schema;

/// Tool listing descriptions.
pub use describe::{full_description, tool_description};
/// Structural limits.
pub use guardrails::{GuardrailViolation, Guardrails, Shape, inspect_shape};
/// Tool handler.
pub use log_work::LogWorkTool;
/// Input schema and validation.
pub use schema::{
    RecordSchema, SchemaError, SchemaSource, build_input_schema, default_log_record_properties,
};
