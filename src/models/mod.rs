//! Data models and structures for tcping

pub mod config;
pub mod record;

// Re-export main model types
pub use config::Config;
pub use record::ProbeRecord;
