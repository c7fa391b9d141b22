//! Configuration parsing from CLI arguments and environment variables

use crate::{
    config::env::EnvManager,
    error::Result,
    models::Config,
    types::ProbeMode,
};

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub count: Option<i64>,
    pub timeout_seconds: Option<f64>,
    pub delay_seconds: Option<f64>,
    pub payload_size: Option<usize>,
    pub use_ipv6: bool,
    pub output_level: Option<u8>,
    pub mode: Option<ProbeMode>,
    pub max_workers: Option<usize>,
    pub rounds: Option<u32>,
    pub no_color: bool,
    pub verbose: bool,
    pub debug: bool,
}

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    overrides: CliOverrides,
}

impl ConfigParser {
    pub fn new(overrides: CliOverrides) -> Self {
        Self { overrides }
    }

    /// Defaults, then `.env`, then the process environment, then the command line
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.overrides.debug)?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.overrides;

        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(count) = cli.count {
            config.count = count;
        }
        if let Some(timeout) = cli.timeout_seconds {
            config.timeout_seconds = timeout;
        }
        if let Some(delay) = cli.delay_seconds {
            config.delay_seconds = delay;
        }
        if let Some(payload) = cli.payload_size {
            config.payload_size = payload;
        }
        if let Some(level) = cli.output_level {
            config.output_level = level;
        }
        if let Some(mode) = cli.mode {
            config.mode = mode;
        }
        if let Some(workers) = cli.max_workers {
            config.max_workers = workers;
        }
        if cli.rounds.is_some() {
            config.rounds = cli.rounds;
        }

        // Flags only ever switch these on (or color off)
        if cli.use_ipv6 {
            config.use_ipv6 = true;
        }
        if cli.no_color {
            config.enable_color = false;
        }

        config.verbose = cli.verbose;
        config.debug = cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!("{}", display_config_summary(config));
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(overrides: CliOverrides) -> Result<Config> {
    ConfigParser::new(overrides).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let timeout = if config.timeout_seconds > 0.0 {
        format!("{}s", config.timeout_seconds)
    } else {
        "none".to_string()
    };
    let count = match config.probe_count() {
        Some(count) => count.to_string(),
        None => "unbounded".to_string(),
    };
    let rounds = match config.rounds {
        Some(rounds) => rounds.to_string(),
        None => "unbounded".to_string(),
    };

    [
        format!("Mode: {}", config.mode),
        format!("Port: {}", config.port),
        format!("Count: {}", count),
        format!("Rounds: {}", rounds),
        format!("Timeout: {}", timeout),
        format!("Delay: {}s", config.delay_seconds),
        format!("Payload: {} bytes", config.payload_size),
        format!("IPv6: {}", config.use_ipv6),
        format!("Output Level: {}", config.output_level),
        format!("Workers: {}", config.max_workers),
        format!("Color Output: {}", config.enable_color),
        format!("Verbose: {}", config.verbose),
        format!("Debug: {}", config.debug),
    ]
    .join("\n")
}
