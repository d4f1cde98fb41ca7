//! Configuration models and config file loading.
//!
//! This crate owns the breadcrumbs config schema, its validation, and the
//! defaults applied to every sink before it is constructed.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Path helpers and the standalone properties-file loader.
pub use loader::{default_config_path, default_log_file_path, load_properties_file, resolve_path};
/// Configuration schema models.
pub use model::*;
