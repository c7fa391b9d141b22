//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Handshake measurement strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// Operating-system `connect()`; needs no privileges
    #[default]
    Connect,
    /// Hand-built SYN over a raw IPv4 socket (half-open probe)
    Raw,
}

impl ProbeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMode::Connect => "connect",
            ProbeMode::Raw => "raw",
        }
    }
}

impl fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "connect" | "tcp" => Ok(ProbeMode::Connect),
            "raw" | "syn" => Ok(ProbeMode::Raw),
            other => Err(AppError::parse(format!(
                "Invalid probe mode '{}': expected 'connect' or 'raw'",
                other
            ))),
        }
    }
}

/// How much the binaries print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputLevel {
    /// Only the final summary statistics
    SummaryOnly,
    /// Only per-probe lines (or the refreshing table in watchdog mode)
    ProbesOnly,
    /// Everything
    #[default]
    All,
}

impl OutputLevel {
    /// Map the numeric `-o` flag value
    pub fn from_level(level: u8) -> Result<Self> {
        match level {
            0 => Ok(OutputLevel::SummaryOnly),
            1 => Ok(OutputLevel::ProbesOnly),
            2 => Ok(OutputLevel::All),
            other => Err(AppError::validation(format!(
                "Output level must be 0, 1 or 2, got {}",
                other
            ))),
        }
    }

    pub fn shows_probes(&self) -> bool {
        matches!(self, OutputLevel::ProbesOnly | OutputLevel::All)
    }

    pub fn shows_summary(&self) -> bool {
        matches!(self, OutputLevel::SummaryOnly | OutputLevel::All)
    }
}

/// Lifecycle of a single target session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Ready for the next probe
    Idle,
    /// A probe is in flight
    Probing,
    /// The last probe was appended to history
    Recorded,
    /// Resolution failed; the session never probes again
    Fatal,
}

impl SessionState {
    pub fn is_live(&self) -> bool {
        !matches!(self, SessionState::Fatal)
    }
}
