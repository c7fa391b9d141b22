//! Configuration data model and validation

use crate::types::{AppError, OutputLevel, ProbeMode, Result};
use serde::{Deserialize, Serialize};
use crate::defaults::MAX_INTERVAL_SECS;
use std::time::Duration;

/// Main application configuration shared by both binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Destination port for single-target mode
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of probes; `-1` keeps probing until interrupted
    #[serde(default = "default_count")]
    pub count: i64,

    /// Probe timeout in seconds; `0` means no timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: f64,

    /// Minimum interval between probes (or rounds) in seconds
    #[serde(default = "default_delay_secs")]
    pub delay_seconds: f64,

    /// Bytes sent after the handshake in connect mode
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,

    /// Resolve and probe over IPv6
    #[serde(default)]
    pub use_ipv6: bool,

    /// 0 summary only, 1 probes only, 2 both
    #[serde(default = "default_output_level")]
    pub output_level: u8,

    /// Handshake measurement strategy
    #[serde(default)]
    pub mode: ProbeMode,

    /// Concurrent probes per watchdog round
    #[serde(default = "default_workers")]
    pub max_workers: usize,

    /// Fixed number of watchdog rounds; `None` runs until interrupted
    #[serde(default)]
    pub rounds: Option<u32>,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            count: default_count(),
            timeout_seconds: default_timeout_secs(),
            delay_seconds: default_delay_secs(),
            payload_size: default_payload_size(),
            use_ipv6: false,
            output_level: default_output_level(),
            mode: ProbeMode::default(),
            max_workers: default_workers(),
            rounds: None,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_seconds > 0.0 {
            Some(seconds_to_duration(self.timeout_seconds))
        } else {
            None
        }
    }

    pub fn delay(&self) -> Duration {
        seconds_to_duration(self.delay_seconds.max(0.0))
    }

    /// Probe count, `None` when unbounded
    pub fn probe_count(&self) -> Option<u32> {
        if self.count < 0 {
            None
        } else {
            Some(self.count.min(u32::MAX as i64) as u32)
        }
    }

    pub fn output(&self) -> Result<OutputLevel> {
        OutputLevel::from_level(self.output_level)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if !is_valid_interval(self.timeout_seconds) {
            return Err(AppError::config(format!(
                "Timeout must be between 0 and {} seconds, got {}",
                MAX_INTERVAL_SECS, self.timeout_seconds
            )));
        }

        if !is_valid_interval(self.delay_seconds) {
            return Err(AppError::config(format!(
                "Delay must be between 0 and {} seconds, got {}",
                MAX_INTERVAL_SECS, self.delay_seconds
            )));
        }

        if self.port == 0 {
            return Err(AppError::config("Port must be between 1 and 65535"));
        }

        if self.count == 0 || self.count < -1 {
            return Err(AppError::config(format!(
                "Count must be a positive number or -1 for unbounded, got {}",
                self.count
            )));
        }

        if self.rounds == Some(0) {
            return Err(AppError::config("Rounds must be greater than 0"));
        }

        if self.max_workers == 0 {
            return Err(AppError::config("Workers must be greater than 0"));
        }

        if self.mode == ProbeMode::Raw && self.use_ipv6 {
            return Err(AppError::config("Raw mode supports IPv4 only"));
        }

        self.output()?;

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("TCPING_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TCPING_PORT value '{}': {}", port, e)))?;
        }

        if let Ok(timeout) = std::env::var("TCPING_TIMEOUT") {
            self.timeout_seconds = timeout
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TCPING_TIMEOUT value '{}': {}", timeout, e)))?;
        }

        if let Ok(delay) = std::env::var("TCPING_DELAY") {
            self.delay_seconds = delay
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TCPING_DELAY value '{}': {}", delay, e)))?;
        }

        if let Ok(count) = std::env::var("TCPING_COUNT") {
            self.count = count
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TCPING_COUNT value '{}': {}", count, e)))?;
        }

        if let Ok(ipv6) = std::env::var("TCPING_IPV6") {
            self.use_ipv6 = ipv6
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TCPING_IPV6 value '{}': {}", ipv6, e)))?;
        }

        if let Ok(mode) = std::env::var("TCPING_MODE") {
            self.mode = mode.parse()?;
        }

        if let Ok(workers) = std::env::var("TCPING_WORKERS") {
            self.max_workers = workers
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TCPING_WORKERS value '{}': {}", workers, e)))?;
        }

        if let Ok(payload) = std::env::var("TCPING_PAYLOAD") {
            self.payload_size = payload
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TCPING_PAYLOAD value '{}': {}", payload, e)))?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_port() -> u16 {
    crate::defaults::DEFAULT_PORT
}

fn default_count() -> i64 {
    crate::defaults::DEFAULT_COUNT
}

fn default_timeout_secs() -> f64 {
    crate::defaults::DEFAULT_TIMEOUT_SECS
}

fn default_delay_secs() -> f64 {
    crate::defaults::DEFAULT_DELAY_SECS
}

fn default_payload_size() -> usize {
    crate::defaults::DEFAULT_PAYLOAD_SIZE
}

fn default_output_level() -> u8 {
    crate::defaults::DEFAULT_OUTPUT_LEVEL
}

fn default_workers() -> usize {
    crate::defaults::default_workers()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

/// Whether `seconds` is usable as a timeout or delay
pub fn is_valid_interval(seconds: f64) -> bool {
    seconds.is_finite() && (0.0..=MAX_INTERVAL_SECS).contains(&seconds)
}

/// Saturates instead of panicking on values a `Duration` cannot hold
fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}
