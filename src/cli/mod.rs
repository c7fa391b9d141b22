//! Command-line interfaces for `tcping` and `tcping-watchdog`

use crate::{config::CliOverrides, models::config::is_valid_interval, types::ProbeMode};
use clap::Parser;

/// Measure TCP handshake latency to a single destination
#[derive(Parser, Debug, Clone)]
#[command(name = "tcping")]
#[command(version, about, long_about = None)]
pub struct PingCli {
    /// Host name or IP address to probe
    #[arg(required_unless_present = "env_help")]
    pub destination: Option<String>,

    /// Number of probes; -1 keeps probing until interrupted
    #[arg(short, long, allow_negative_numbers = true, value_parser = parse_count)]
    pub count: Option<i64>,

    /// Probe timeout in seconds; 0 disables the timeout
    #[arg(short, long, value_parser = parse_seconds)]
    pub timeout: Option<f64>,

    /// Destination port
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Minimum interval between probes in seconds
    #[arg(short, long, value_parser = parse_seconds)]
    pub delay: Option<f64>,

    /// Bytes sent after the handshake (connect mode only)
    #[arg(short = 'l', long)]
    pub payload: Option<usize>,

    /// Resolve and probe over IPv6
    #[arg(short = '6', long)]
    pub ipv6: bool,

    /// 0 summary only, 1 probes only, 2 both
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub output_level: Option<u8>,

    /// Probe strategy: connect or raw
    #[arg(short, long, value_parser = parse_mode)]
    pub mode: Option<ProbeMode>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// List supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,
}

impl PingCli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }
}

impl From<&PingCli> for CliOverrides {
    fn from(cli: &PingCli) -> Self {
        Self {
            port: cli.port,
            count: cli.count,
            timeout_seconds: cli.timeout,
            delay_seconds: cli.delay,
            payload_size: cli.payload,
            use_ipv6: cli.ipv6,
            output_level: cli.output_level,
            mode: cli.mode,
            max_workers: None,
            rounds: None,
            no_color: cli.no_color,
            verbose: cli.verbose,
            debug: cli.debug,
        }
    }
}

/// Watch TCP reachability of several destinations in synchronized rounds
#[derive(Parser, Debug, Clone)]
#[command(name = "tcping-watchdog")]
#[command(version, about, long_about = None)]
pub struct WatchdogCli {
    /// Destinations as host or host:port ([addr]:port for IPv6 literals)
    #[arg(required_unless_present = "env_help", num_args = 1..)]
    pub destinations: Vec<String>,

    /// Probe timeout in seconds; 0 disables the timeout
    #[arg(short, long, value_parser = parse_seconds)]
    pub timeout: Option<f64>,

    /// Minimum interval between rounds in seconds
    #[arg(short, long, value_parser = parse_seconds)]
    pub delay: Option<f64>,

    /// Resolve and probe over IPv6
    #[arg(short = '6', long)]
    pub ipv6: bool,

    /// 0 final summaries only, 1 refreshing table only, 2 both
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub output_level: Option<u8>,

    /// Probe strategy: connect or raw
    #[arg(short, long, value_parser = parse_mode)]
    pub mode: Option<ProbeMode>,

    /// Stop after this many rounds instead of running until interrupted
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub rounds: Option<u32>,

    /// Concurrent probes per round
    #[arg(short, long, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// List supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,
}

impl WatchdogCli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }
}

impl From<&WatchdogCli> for CliOverrides {
    fn from(cli: &WatchdogCli) -> Self {
        Self {
            port: None,
            count: None,
            timeout_seconds: cli.timeout,
            delay_seconds: cli.delay,
            payload_size: None,
            use_ipv6: cli.ipv6,
            output_level: cli.output_level,
            mode: cli.mode,
            max_workers: cli.workers,
            rounds: cli.rounds,
            no_color: cli.no_color,
            verbose: cli.verbose,
            debug: cli.debug,
        }
    }
}

/// Parse a non-negative number of seconds
fn parse_seconds(s: &str) -> Result<f64, String> {
    let secs: f64 = s.parse().map_err(|_| format!("Invalid number of seconds: {}", s))?;
    if !is_valid_interval(secs) {
        return Err(format!(
            "Seconds must be between 0 and {}, got {}",
            crate::defaults::MAX_INTERVAL_SECS,
            s
        ));
    }
    Ok(secs)
}

/// Parse a probe count: positive, or -1 for unbounded
fn parse_count(s: &str) -> Result<i64, String> {
    let count: i64 = s.parse().map_err(|_| format!("Invalid count: {}", s))?;
    if count == 0 || count < -1 {
        return Err("Count must be positive or -1 for unbounded".to_string());
    }
    Ok(count)
}

fn parse_workers(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Workers must be greater than 0".to_string()),
        Ok(workers) => Ok(workers),
        Err(_) => Err(format!("Invalid worker count: {}", s)),
    }
}

fn parse_mode(s: &str) -> Result<ProbeMode, String> {
    s.parse().map_err(|e: crate::AppError| e.to_string())
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    cfg!(unix)
}
