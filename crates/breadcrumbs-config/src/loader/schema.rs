//! Key and type validation for raw config values.
//!
//! Runs before serde decoding so unknown keys and wrong types are reported
//! with the config path that caused them.

use crate::ConfigError;
use serde_json::{Map, Value};

const ROOT_KEYS: &[&str] = &["$schema", "schema", "logging_mode", "sink"];
const SINK_KEYS: &[&str] = &["name", "config"];
const SINK_NAMES: &[&str] = &["jsonl", "webhook", "postgres"];
const JSONL_KEYS: &[&str] = &["log_file"];
const WEBHOOK_KEYS: &[&str] = &["url", "headers", "timeout_ms", "retry"];
const POSTGRES_KEYS: &[&str] = &["connection_string", "table", "timeout_ms", "retry"];
const RETRY_KEYS: &[&str] = &["max_attempts", "backoff_ms"];
const LOGGING_MODES: &[&str] = &["completion", "time"];

/// Validate a full config document.
pub(super) fn validate_config(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let root = expect_object(value, layer, "")?;
    ensure_allowed_keys(root, ROOT_KEYS, layer, "")?;

    if let Some(value) = root.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = root.get("schema") {
        validate_properties(value, layer, "schema")?;
    }
    if let Some(value) = root.get("logging_mode") {
        expect_one_of(value, LOGGING_MODES, layer, "logging_mode")?;
    }
    if let Some(value) = root.get("sink") {
        validate_sink(value, layer)?;
    }
    Ok(())
}

/// Validate a `log_record.properties` object: every entry is a schema object.
pub(super) fn validate_properties(
    value: &Value,
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    for (key, entry) in map {
        expect_object(entry, layer, &join_path(path, key))?;
    }
    Ok(())
}

fn validate_sink(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let sink = expect_object(value, layer, "sink")?;
    ensure_allowed_keys(sink, SINK_KEYS, layer, "sink")?;

    let name = match sink.get("name") {
        Some(Value::String(name)) => name.as_str(),
        Some(_) => return Err(invalid_field(layer, "sink.name", "expected string")),
        None => return Err(invalid_field(layer, "sink.name", "missing required field")),
    };
    if !SINK_NAMES.contains(&name) {
        return Err(ConfigError::UnknownSink(name.to_string()));
    }

    let config = sink.get("config");
    match name {
        "jsonl" => match config {
            Some(value) => validate_jsonl(value, layer, "sink.config"),
            None => Ok(()),
        },
        "webhook" => validate_webhook(required(config, layer, "sink.config")?, layer, "sink.config"),
        _ => validate_postgres(required(config, layer, "sink.config")?, layer, "sink.config"),
    }
}

fn validate_jsonl(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, JSONL_KEYS, layer, path)?;
    if let Some(value) = map.get("log_file") {
        expect_non_empty_string(value, layer, &join_path(path, "log_file"))?;
    }
    Ok(())
}

fn validate_webhook(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, WEBHOOK_KEYS, layer, path)?;

    let url_path = join_path(path, "url");
    expect_non_empty_string(required(map.get("url"), layer, &url_path)?, layer, &url_path)?;
    if let Some(value) = map.get("headers") {
        let headers_path = join_path(path, "headers");
        let headers = expect_object(value, layer, &headers_path)?;
        for (key, value) in headers {
            expect_string(value, layer, &join_path(&headers_path, key))?;
        }
    }
    validate_timeout_and_retry(map, layer, path)
}

fn validate_postgres(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, POSTGRES_KEYS, layer, path)?;

    for key in ["connection_string", "table"] {
        let field_path = join_path(path, key);
        expect_non_empty_string(required(map.get(key), layer, &field_path)?, layer, &field_path)?;
    }
    validate_timeout_and_retry(map, layer, path)
}

fn validate_timeout_and_retry(
    map: &Map<String, Value>,
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    if let Some(value) = map.get("timeout_ms") {
        let timeout = expect_u64(value, layer, &join_path(path, "timeout_ms"))?;
        if timeout == 0 {
            return Err(invalid_field(layer, &join_path(path, "timeout_ms"), "must be > 0"));
        }
    }
    if let Some(value) = map.get("retry") {
        let retry_path = join_path(path, "retry");
        let retry = expect_object(value, layer, &retry_path)?;
        ensure_allowed_keys(retry, RETRY_KEYS, layer, &retry_path)?;
        if let Some(value) = retry.get("max_attempts") {
            let attempts_path = join_path(&retry_path, "max_attempts");
            let attempts = expect_u64(value, layer, &attempts_path)?;
            if u32::try_from(attempts).is_err() {
                return Err(invalid_field(layer, &attempts_path, "out of range"));
            }
        }
        if let Some(value) = retry.get("backoff_ms") {
            expect_u64(value, layer, &join_path(&retry_path, "backoff_ms"))?;
        }
    }
    Ok(())
}

fn required<'a>(value: Option<&'a Value>, layer: &str, path: &str) -> Result<&'a Value, ConfigError> {
    value.ok_or_else(|| invalid_field(layer, path, "missing required field"))
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

fn expect_non_empty_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value.as_str() {
        Some(text) if !text.trim().is_empty() => Ok(()),
        _ => Err(invalid_field(layer, path, "must be a non-empty string")),
    }
}

/// Expect a non-negative JSON integer.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<u64, ConfigError> {
    value
        .as_u64()
        .ok_or_else(|| invalid_field(layer, path, "expected non-negative integer"))
}

fn expect_one_of(
    value: &Value,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match value.as_str() {
        Some(text) if allowed.contains(&text) => Ok(()),
        _ => Err(invalid_field(
            layer,
            path,
            &format!("must be one of: {}", allowed.join(", ")),
        )),
    }
}

/// Reject keys not present in the allowlist.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::invalid(format!("{layer}:{normalized_path}"), message)
}
