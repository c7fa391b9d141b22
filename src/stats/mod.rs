//! Statistics over a sequence of probe records

use crate::error::{AppError, Result};
use crate::models::ProbeRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

// Property tests in separate module
#[cfg(test)]
mod comprehensive_tests;

/// Round to three decimal places
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Summary metrics for one destination
///
/// Min, max and average are taken over successful probes only and are
/// `0` when every probe failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub address: String,
    pub port: u16,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub loss_percentage: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub average_ms: f64,
}

impl StatisticsSummary {
    /// Fold `records` into a summary; an empty slice is an error
    pub fn summarize(records: &[ProbeRecord], address: impl Into<String>, port: u16) -> Result<Self> {
        let address = address.into();
        if records.is_empty() {
            return Err(AppError::empty_input(format!("no probes recorded for {}:{}", address, port)));
        }

        let successes: Vec<f64> = records
            .iter()
            .filter_map(|record| record.elapsed_ms())
            .collect();

        let total = records.len();
        let successful = successes.len();
        let failed = total - successful;

        let (min_ms, max_ms, average_ms) = if successes.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let min = successes.iter().copied().fold(f64::INFINITY, f64::min);
            let max = successes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let average = successes.iter().sum::<f64>() / successful as f64;
            (min, max, average)
        };

        Ok(Self {
            address,
            port,
            total,
            successful,
            failed,
            loss_percentage: failed as f64 / total as f64 * 100.0,
            min_ms,
            max_ms,
            average_ms,
        })
    }

    pub fn success_rate(&self) -> f64 {
        100.0 - self.loss_percentage
    }

    /// Whether at least one probe completed
    pub fn is_reachable(&self) -> bool {
        self.successful > 0
    }
}

impl fmt::Display for StatisticsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistic tcping for [{}:{}]:", self.address, self.port)?;
        writeln!(
            f,
            "Pings count: {}, Successful: {}, Failed: {}",
            self.total, self.successful, self.failed
        )?;
        writeln!(f, "Fails percentage: {:?}", round3(self.loss_percentage))?;
        write!(
            f,
            "Max time: {:?}ms, Min time: {:?}ms, Average time {:?}ms",
            round3(self.max_ms),
            round3(self.min_ms),
            round3(self.average_ms)
        )
    }
}
