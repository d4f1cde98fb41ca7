//! Config file loading.
//!
//! A config file is JSON5. It is validated against the key/type schema
//! first so errors point at the offending path, then decoded into
//! [`BreadcrumbsConfig`] with defaults applied and relative paths resolved
//! against the directory of the file.

mod schema;
mod utils;


use crate::{BreadcrumbsConfig, ConfigError, SinkConfig};
use log::{debug, info};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub use utils::{default_config_path, default_log_file_path, resolve_path};

/// Default config directory under the user's home.
const DEFAULT_CONFIG_DIR: &str = ".agent-breadcrumbs";
/// Default config filename inside the config directory.
const DEFAULT_CONFIG_FILE: &str = "config.json5";
/// Default JSONL log filename inside the config directory.
const DEFAULT_LOG_FILE: &str = "logs.jsonl";

impl BreadcrumbsConfig {
    /// Load a config file; relative paths resolve against its directory.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("loading config from path: {}", path.display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config_from_value(value, &path.display().to_string(), &base_dir)
    }

    /// Load config from JSON5 contents; relative paths resolve against the cwd.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        let base_dir = std::env::current_dir()?;
        config_from_value(value, "config", &base_dir)
    }

    /// Load the user config when present, otherwise return defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from_path(path),
            Some(path) => {
                debug!("no user config at {}; using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                debug!("home directory unavailable; using default config");
                Ok(Self::default())
            }
        }
    }

    /// Resolve relative and `~` paths against `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Path) -> Result<(), ConfigError> {
        if let SinkConfig::Jsonl(jsonl) = &mut self.sink {
            jsonl.log_file = resolve_path(&jsonl.log_file, base_dir)?;
        }
        Ok(())
    }

    /// Validate invariants for configs that were built in code rather
    /// than loaded through the schema pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.sink {
            SinkConfig::Jsonl(jsonl) => {
                if jsonl.log_file.as_os_str().is_empty() {
                    return Err(ConfigError::invalid("sink.config.log_file", "must not be empty"));
                }
            }
            SinkConfig::Webhook(webhook) => {
                require_non_empty(&webhook.url, "sink.config.url")?;
                require_positive(webhook.timeout_ms, "sink.config.timeout_ms")?;
            }
            SinkConfig::Postgres(postgres) => {
                require_non_empty(&postgres.connection_string, "sink.config.connection_string")?;
                require_non_empty(&postgres.table, "sink.config.table")?;
                require_positive(postgres.timeout_ms, "sink.config.timeout_ms")?;
            }
        }
        Ok(())
    }
}

/// Load a `log_record.properties` object from a JSON or JSON5 file.
pub fn load_properties_file(path: impl AsRef<Path>) -> Result<Map<String, Value>, ConfigError> {
    let path = path.as_ref();
    info!("loading record properties from path: {}", path.display());
    let contents = fs::read_to_string(path)?;
    let value: Value = json5::from_str(&contents)?;
    let label = path.display().to_string();
    schema::validate_properties(&value, &label, "")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::invalid(format!("{label}:root"), "expected object")),
    }
}

fn config_from_value(
    mut value: Value,
    label: &str,
    base_dir: &Path,
) -> Result<BreadcrumbsConfig, ConfigError> {
    schema::validate_config(&value, label)?;
    normalize_sink(&mut value);
    let mut config: BreadcrumbsConfig = serde_json::from_value(value)?;
    config.resolve_paths(base_dir)?;
    config.validate()?;
    debug!(
        "config decoded (sink={}, logging_mode={}, custom_schema={})",
        config.sink.name(),
        config.logging_mode,
        config.schema.is_some()
    );
    Ok(config)
}

/// A `jsonl` sink may omit its `config` block entirely.
fn normalize_sink(value: &mut Value) {
    let Some(sink) = value.get_mut("sink").and_then(Value::as_object_mut) else {
        return;
    };
    if sink.get("name").and_then(Value::as_str) == Some("jsonl") && !sink.contains_key("config") {
        sink.insert("config".to_string(), Value::Object(Map::new()));
    }
}

fn require_non_empty(value: &str, path: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(path, "must be a non-empty string"));
    }
    Ok(())
}

fn require_positive(value: u64, path: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid(path, "must be > 0"));
    }
    Ok(())
}
