//! Result of a single handshake probe

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Elapsed value stored for a failed probe
pub const FAILED_ELAPSED: f64 = -1.0;

/// Immutable outcome of one probe against one `(address, port)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRecord {
    elapsed_seconds: f64,
    address: String,
    port: u16,
    timestamp: DateTime<Utc>,
}

impl ProbeRecord {
    /// Record a completed handshake
    pub fn success(elapsed: Duration, address: impl Into<String>, port: u16) -> Self {
        Self::from_seconds(elapsed.as_secs_f64(), address, port)
    }

    /// Record a refused, timed-out or otherwise failed handshake
    pub fn failed(address: impl Into<String>, port: u16) -> Self {
        Self::from_seconds(FAILED_ELAPSED, address, port)
    }

    /// Build a record from a raw seconds value; any negative value is a failure
    pub fn from_seconds(elapsed_seconds: f64, address: impl Into<String>, port: u16) -> Self {
        let elapsed_seconds = if elapsed_seconds < 0.0 || !elapsed_seconds.is_finite() {
            FAILED_ELAPSED
        } else {
            elapsed_seconds
        };

        Self {
            elapsed_seconds,
            address: address.into(),
            port,
            timestamp: Utc::now(),
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    /// Elapsed milliseconds, `None` for failed probes
    pub fn elapsed_ms(&self) -> Option<f64> {
        if self.is_failed() {
            None
        } else {
            Some(self.elapsed_seconds * 1000.0)
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_failed(&self) -> bool {
        self.elapsed_seconds < 0.0
    }

    /// Per-probe console line
    pub fn info_line(&self) -> String {
        match self.elapsed_ms() {
            Some(ms) => format!(
                "From: [{}:{}]; Time: {:?}ms;",
                self.address,
                self.port,
                crate::stats::round3(ms)
            ),
            None => format!("From: [{}:{}]; Failed;", self.address, self.port),
        }
    }
}

impl fmt::Display for ProbeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info_line())
    }
}
