//! Configuration validation utilities and rules

use crate::{error::Result, models::Config, types::ProbeMode};
use colored::Colorize;

/// Delay below which probing many targets is flagged
const TIGHT_DELAY_SECS: f64 = 0.1;
/// Target count above which a tight delay is flagged
const MANY_TARGETS: usize = 10;

/// Configuration validator with advisory rules on top of `Config::validate`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Hard validation first, then non-fatal warnings for `target_count` destinations
    pub fn validate_comprehensive(config: &Config, target_count: usize) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_mode_settings(config));
        warnings.extend(Self::validate_pacing(config, target_count));
        Ok(warnings)
    }

    fn validate_mode_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        match config.mode {
            ProbeMode::Raw => {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    "Raw mode needs root or CAP_NET_RAW to open a raw socket".to_string(),
                ));

                if config.payload_size > 0 {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        format!(
                            "Payload of {} bytes is ignored in raw mode; only the SYN is sent",
                            config.payload_size
                        ),
                    ));
                }

                if config.timeout().is_none() {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!(
                            "No timeout set; raw probes wait at most {}s for a reply",
                            crate::defaults::DEFAULT_RAW_BUDGET.as_secs()
                        ),
                    ));
                }
            }
            ProbeMode::Connect => {
                if config.timeout().is_none() {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        "No timeout set; an unresponsive host blocks until the system connect timeout"
                            .to_string(),
                    ));
                }
            }
        }

        warnings
    }

    fn validate_pacing(config: &Config, target_count: usize) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if target_count > MANY_TARGETS && config.delay_seconds < TIGHT_DELAY_SECS {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Delay of {}s with {} targets may look like a port scan to intermediate firewalls",
                    config.delay_seconds, target_count
                ),
            ));
        }

        if config.probe_count().is_none() && config.delay_seconds == 0.0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Unbounded probing without a delay sends handshakes back to back".to_string(),
            ));
        }

        if target_count > config.max_workers {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "{} targets share {} workers; rounds will queue probes",
                    target_count, config.max_workers
                ),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Non-fatal finding about a configuration
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = self.level.as_str();
        if use_color {
            let tag = match self.level {
                ValidationLevel::Info => tag.blue(),
                ValidationLevel::Warning => tag.yellow(),
            };
            format!("[{}] {}", tag, self.message)
        } else {
            format!("[{}] {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config, target_count: usize) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config, target_count)
}
