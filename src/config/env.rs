//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::models::config::is_valid_interval;
use crate::types::ProbeMode;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `.env` from the current directory if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists; variables already set win
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# tcping Configuration
#
# Values here act as defaults for both tcping and tcping-watchdog and are
# overridden by command-line arguments.

# Destination port for single-target probing
# TCPING_PORT=80

# Probe timeout in seconds (0 disables the timeout)
# TCPING_TIMEOUT=0

# Minimum interval between probes or rounds, in seconds
# TCPING_DELAY=0.5

# Number of probes (-1 probes until interrupted)
# TCPING_COUNT=4

# Resolve and probe over IPv6 (true/false)
# TCPING_IPV6=false

# Probe strategy: connect or raw (raw needs CAP_NET_RAW)
# TCPING_MODE=connect

# Concurrent probes per watchdog round
# TCPING_WORKERS=16

# Bytes sent after the handshake in connect mode
# TCPING_PAYLOAD=0

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "TCPING_PORT" => {
                let port: u16 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid TCPING_PORT value '{}': {}", value, e)))?;
                if port == 0 {
                    return Err(AppError::config("TCPING_PORT must be between 1 and 65535"));
                }
            }
            "TCPING_TIMEOUT" | "TCPING_DELAY" => {
                let seconds: f64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if !is_valid_interval(seconds) {
                    return Err(AppError::config(format!(
                        "{} must be between 0 and {} seconds, got: {}",
                        key,
                        crate::defaults::MAX_INTERVAL_SECS,
                        value
                    )));
                }
            }
            "TCPING_COUNT" => {
                let count: i64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid TCPING_COUNT value '{}': {}", value, e)))?;
                if count == 0 || count < -1 {
                    return Err(AppError::config(format!(
                        "TCPING_COUNT must be positive or -1, got: {}",
                        count
                    )));
                }
            }
            "TCPING_WORKERS" => {
                let workers: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid TCPING_WORKERS value '{}': {}", value, e)))?;
                if workers == 0 {
                    return Err(AppError::config("TCPING_WORKERS must be greater than 0"));
                }
            }
            "TCPING_PAYLOAD" => {
                value
                    .parse::<usize>()
                    .map_err(|e| AppError::config(format!("Invalid TCPING_PAYLOAD value '{}': {}", value, e)))?;
            }
            "TCPING_MODE" => {
                value.parse::<ProbeMode>()?;
            }
            "TCPING_IPV6" | "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("TCPING_PORT", "Destination port for single-target mode", "443"),
            ("TCPING_TIMEOUT", "Probe timeout in seconds, 0 for none", "2"),
            ("TCPING_DELAY", "Interval between probes or rounds in seconds", "0.5"),
            ("TCPING_COUNT", "Number of probes, -1 for unbounded", "10"),
            ("TCPING_IPV6", "Probe over IPv6", "false"),
            ("TCPING_MODE", "Probe strategy (connect or raw)", "connect"),
            ("TCPING_WORKERS", "Concurrent probes per watchdog round", "16"),
            ("TCPING_PAYLOAD", "Bytes sent after the handshake", "0"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<18} {}\n", var, description));
            help.push_str(&format!("  {:<18} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}
