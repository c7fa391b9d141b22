//! tcping
//!
//! Measures TCP reachability and handshake latency to one or more
//! destinations, using either the operating system's `connect()` or a
//! hand-built SYN over a raw socket as the liveness signal. Ships a
//! single-target prober (`tcping`) and a refreshing multi-target
//! dashboard (`tcping-watchdog`).

pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod packet;
pub mod probe;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use executor::{parse_destinations, RoundReport, TargetSession, WatchdogScheduler};
pub use models::{Config, ProbeRecord};
pub use output::{OutputFormatter, PlainFormatter};
pub use probe::{ConnectProbe, Prober, RawSynProbe};
pub use stats::StatisticsSummary;
pub use types::{OutputLevel, ProbeMode, SessionState};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Version string with build metadata, printed under `--debug`
pub fn long_version() -> String {
    let commit = option_env!("GIT_COMMIT").unwrap_or("unknown");
    format!(
        "{} (commit {}, built {}, {})",
        VERSION,
        commit,
        env!("BUILD_TIME"),
        env!("TARGET_TRIPLE")
    )
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_PORT: u16 = 80;
    pub const DEFAULT_PORT_STR: &str = "80";
    /// Probes per run; `-1` means until interrupted
    pub const DEFAULT_COUNT: i64 = 4;
    /// Seconds; `0` disables the timeout
    pub const DEFAULT_TIMEOUT_SECS: f64 = 0.0;
    pub const DEFAULT_DELAY_SECS: f64 = 0.5;
    /// Upper bound accepted for timeouts and delays, one day
    pub const MAX_INTERVAL_SECS: f64 = 86_400.0;
    pub const DEFAULT_PAYLOAD_SIZE: usize = 0;
    pub const DEFAULT_OUTPUT_LEVEL: u8 = 2;
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    /// Receive budget for raw probes when no timeout is configured
    pub const DEFAULT_RAW_BUDGET: Duration = Duration::from_secs(1);
    /// Upper bound for DNS lookups, kept well below any probe interval
    pub const DNS_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

    /// Concurrent probes per watchdog round
    pub fn default_workers() -> usize {
        (num_cpus::get() * 4).max(4)
    }
}
