//! Test helpers shared across breadcrumbs crates.

pub mod inserter;
pub mod sink;
pub mod sleeper;
pub mod webhook;

pub use inserter::ScriptedInserter;
pub use sink::RecordingSink;
pub use sleeper::RecordingSleeper;
pub use webhook::{RecordedRequest, ScriptedWebhook, refused_addr};
