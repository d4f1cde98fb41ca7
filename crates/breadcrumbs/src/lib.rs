//! Public surface for agent-breadcrumbs.
//!
//! This crate re-exports the building blocks of the `log_work` server and
//! provides a logging helper so embedders and the binary set up the same way.

/// Re-export for convenience.
pub use breadcrumbs_config as config;
/// Re-export for convenience.
pub use breadcrumbs_protocol as protocol;
pub use breadcrumbs_server as server;
/// Re-export for convenience.
pub use breadcrumbs_sinks as sinks;
pub use breadcrumbs_tools as tools;

/// Initialize `env_logger` with millisecond timestamps, honouring `RUST_LOG`.
///
/// Output goes to stderr; stdout belongs to the MCP stdio transport.
/// Calling this more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .target(env_logger::Target::Stderr)
        .parse_default_env()
        .try_init();
}
