//! Shared data model for the fundboard workspace: report summaries, the
//! overview snapshot schema, settings payloads, the published dashboard state
//! and on-disk configuration.

pub mod config;
pub mod overview;
pub mod platform;
pub mod protocol;
pub mod report;
pub mod settings;
