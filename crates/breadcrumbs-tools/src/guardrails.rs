//! Structural limits applied to `log_work` calls before any sink sees them.

use serde_json::Value;
use thiserror::Error;

/// Ceiling on the serialized size of the whole call payload.
pub const MAX_REQUEST_BYTES: usize = 32 * 1024;
/// Ceiling on the serialized size of `log_record`.
pub const MAX_LOG_RECORD_BYTES: usize = 16 * 1024;
/// Ceiling on object keys across the whole `log_record` tree.
pub const MAX_LOG_RECORD_KEYS: usize = 256;
/// Maximum nesting depth of `log_record`; the record itself is depth 1.
pub const MAX_LOG_RECORD_DEPTH: usize = 8;

/// Size and shape limits for incoming records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guardrails {
    pub max_request_bytes: usize,
    pub max_log_record_bytes: usize,
    pub max_log_record_keys: usize,
    pub max_log_record_depth: usize,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self {
            max_request_bytes: MAX_REQUEST_BYTES,
            max_log_record_bytes: MAX_LOG_RECORD_BYTES,
            max_log_record_keys: MAX_LOG_RECORD_KEYS,
            max_log_record_depth: MAX_LOG_RECORD_DEPTH,
        }
    }
}

/// Why a call was rejected. The display text is returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardrailViolation {
    #[error("Request payload exceeds {limit} bytes limit.")]
    RequestTooLarge { limit: usize },
    #[error("Invalid log_work arguments: request payload is not serializable.")]
    RequestNotSerializable,
    #[error("Invalid log_record: payload is not serializable.")]
    RecordNotSerializable,
    #[error("log_record exceeds {limit} bytes limit.")]
    RecordTooLarge { limit: usize },
    #[error("log_record exceeds {limit} total keys limit.")]
    TooManyKeys { limit: usize },
    #[error("log_record exceeds max depth of {limit}.")]
    TooDeep { limit: usize },
}

/// Key count and depth of a JSON value, from one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Shape {
    /// Object entries at every level. Array elements are not keys.
    pub key_count: usize,
    /// Deepest value, counting the root as 1 and every child as one deeper.
    pub max_depth: usize,
}

impl Guardrails {
    /// Check the serialized size of the raw call arguments.
    pub fn check_request(&self, arguments: &Value) -> Result<(), GuardrailViolation> {
        let bytes = serialized_len(arguments).ok_or(GuardrailViolation::RequestNotSerializable)?;
        if bytes > self.max_request_bytes {
            return Err(GuardrailViolation::RequestTooLarge {
                limit: self.max_request_bytes,
            });
        }
        Ok(())
    }

    /// Check size, key count and depth of a schema-valid `log_record`.
    ///
    /// Rules apply in that order and the first failure wins.
    pub fn check_log_record(&self, log_record: &Value) -> Result<(), GuardrailViolation> {
        let bytes = serialized_len(log_record).ok_or(GuardrailViolation::RecordNotSerializable)?;
        if bytes > self.max_log_record_bytes {
            return Err(GuardrailViolation::RecordTooLarge {
                limit: self.max_log_record_bytes,
            });
        }
        let shape = inspect_shape(log_record);
        if shape.key_count > self.max_log_record_keys {
            return Err(GuardrailViolation::TooManyKeys {
                limit: self.max_log_record_keys,
            });
        }
        if shape.max_depth > self.max_log_record_depth {
            return Err(GuardrailViolation::TooDeep {
                limit: self.max_log_record_depth,
            });
        }
        Ok(())
    }

    /// Request check, then the `log_record` checks when a record is present.
    pub fn check(&self, arguments: &Value) -> Result<(), GuardrailViolation> {
        self.check_request(arguments)?;
        match arguments.get("log_record") {
            Some(log_record) => self.check_log_record(log_record),
            None => Ok(()),
        }
    }
}

/// Walk `value` once with an explicit stack, so hostile nesting cannot
/// overflow the call stack.
pub fn inspect_shape(value: &Value) -> Shape {
    let mut shape = Shape::default();
    let mut stack = vec![(value, 1usize)];
    while let Some((current, depth)) = stack.pop() {
        shape.max_depth = shape.max_depth.max(depth);
        match current {
            Value::Array(items) => {
                stack.extend(items.iter().map(|item| (item, depth + 1)));
            }
            Value::Object(entries) => {
                shape.key_count += entries.len();
                stack.extend(entries.values().map(|nested| (nested, depth + 1)));
            }
            _ => {}
        }
    }
    shape
}

fn serialized_len(value: &Value) -> Option<usize> {
    serde_json::to_vec(value).ok().map(|bytes| bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};

    /// An object whose deepest value sits at `depth`.
    fn nested(depth: usize) -> Value {
        let mut value = json!("leaf");
        for _ in 1..depth {
            value = json!({ "n": value });
        }
        value
    }

    #[test]
    fn shape_counts_root_as_depth_one() {
        assert_eq!(inspect_shape(&json!({})), Shape { key_count: 0, max_depth: 1 });
        assert_eq!(
            inspect_shape(&json!({ "a": 1 })),
            Shape { key_count: 1, max_depth: 2 }
        );
    }

    #[test]
    fn array_elements_add_depth_but_not_keys() {
        let shape = inspect_shape(&json!({ "items": [{ "a": 1 }, { "b": 2 }] }));
        assert_eq!(shape, Shape { key_count: 3, max_depth: 4 });
    }

    #[test]
    fn record_at_max_depth_is_accepted() {
        let guardrails = Guardrails::default();
        assert_eq!(inspect_shape(&nested(8)).max_depth, 8);
        assert_eq!(guardrails.check_log_record(&nested(8)), Ok(()));
    }

    #[test]
    fn record_past_max_depth_is_rejected() {
        let err = Guardrails::default()
            .check_log_record(&nested(9))
            .unwrap_err();
        assert_eq!(err.to_string(), "log_record exceeds max depth of 8.");
    }

    #[test]
    fn oversized_record_reports_byte_ceiling() {
        let record = json!({ "work_summary": "x".repeat(MAX_LOG_RECORD_BYTES) });
        let err = Guardrails::default().check_log_record(&record).unwrap_err();
        assert_eq!(err.to_string(), "log_record exceeds 16384 bytes limit.");
    }

    #[test]
    fn record_at_byte_ceiling_is_accepted() {
        // {"s":"..."} adds 8 bytes of framing.
        let record = json!({ "s": "x".repeat(MAX_LOG_RECORD_BYTES - 8) });
        assert_eq!(serialized_len(&record), Some(MAX_LOG_RECORD_BYTES));
        assert_eq!(Guardrails::default().check_log_record(&record), Ok(()));
    }

    #[test]
    fn key_limit_counts_nested_objects() {
        let mut inner = Map::new();
        for idx in 0..200 {
            inner.insert(format!("k{idx}"), json!(idx));
        }
        let mut record = Map::new();
        for idx in 0..56 {
            record.insert(format!("top{idx}"), json!(idx));
        }
        record.insert("inner".to_string(), Value::Object(inner));

        // 56 + 1 + 200 keys.
        let err = Guardrails::default()
            .check_log_record(&Value::Object(record))
            .unwrap_err();
        assert_eq!(err.to_string(), "log_record exceeds 256 total keys limit.");
    }

    #[test]
    fn key_limit_is_checked_before_depth() {
        let guardrails = Guardrails {
            max_log_record_keys: 2,
            max_log_record_depth: 2,
            ..Guardrails::default()
        };
        let err = guardrails
            .check_log_record(&json!({ "a": { "b": { "c": 1 } } }))
            .unwrap_err();
        assert_eq!(err, GuardrailViolation::TooManyKeys { limit: 2 });
    }

    #[test]
    fn oversized_request_is_rejected_first() {
        let arguments = json!({
            "log_record": { "work_summary": "x".repeat(MAX_REQUEST_BYTES) }
        });
        let err = Guardrails::default().check(&arguments).unwrap_err();
        assert_eq!(err.to_string(), "Request payload exceeds 32768 bytes limit.");
    }
}
