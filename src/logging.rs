//! Structured logging for tcping
//!
//! This module provides:
//! - Leveled logging with console and JSON formats
//! - Correlation IDs per target session
//! - A probe-oriented logger for resolutions, outcomes and rounds
//!
//! Everything is written to stderr so log lines never interleave with the
//! per-probe output and tables on stdout.

use crate::error::{AppError, Result};
use crate::models::{Config, ProbeRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging, used under `--debug`
    Json,
}

/// Shared logging context
#[derive(Debug, Default)]
struct LogContext {
    /// Global correlation ID for the process run
    session_id: Option<String>,
    /// Additional context fields
    context_fields: HashMap<String, serde_json::Value>,
}

/// Logger implementation with multiple output formats
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Set minimum log level
    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: String, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key, json_value);
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    /// Convenience methods for different log levels
    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry
                .fields
                .insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        for (key, value) in &context.context_fields {
            entry.fields.insert(key.clone(), value.clone());
        }
        drop(context);

        let output = self.render(&entry);
        let _ = writeln!(io::stderr(), "{}", output);
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}",
                entry.message
            ),
        }
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
            },
        }
    }

    /// Add a correlation ID
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add the fields of a probe record
    pub fn record(self, record: &ProbeRecord) -> Self {
        self.field("address", record.address())
            .field("port", record.port())
            .field("elapsed_ms", record.elapsed_ms())
            .field("failed", record.is_failed())
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("target_fatal", error.is_target_fatal())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logger for probe sessions and watchdog rounds
#[derive(Clone)]
pub struct ProbeLogger {
    logger: Logger,
}

impl ProbeLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("PROBE".to_string(), config),
        }
    }

    /// Logger that drops everything below `Error`, for library callers and tests
    pub fn quiet() -> Self {
        let mut logger = Logger::new("PROBE".to_string());
        logger.set_level(LogLevel::Error);
        Self { logger }
    }

    /// Start tracking a destination; returns its correlation ID
    pub async fn log_session_start(&self, destination: &str, port: u16) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        self.logger
            .debug(&format!("Tracking {}:{}", destination, port))
            .correlation_id(&correlation_id)
            .field("destination", destination)
            .field("port", port)
            .log()
            .await;
        correlation_id
    }

    /// Log the outcome of a name lookup
    pub async fn log_resolution(&self, correlation_id: &str, destination: &str, outcome: &Result<IpAddr>) {
        match outcome {
            Ok(address) => {
                self.logger
                    .debug(&format!("Resolved {} to {}", destination, address))
                    .correlation_id(correlation_id)
                    .field("destination", destination)
                    .field("address", address.to_string())
                    .log()
                    .await
            }
            Err(error) => {
                self.logger
                    .warn(&format!("Resolution failed for {}: {}", destination, error))
                    .correlation_id(correlation_id)
                    .field("destination", destination)
                    .error_info(error)
                    .log()
                    .await
            }
        }
    }

    /// Log a single probe outcome
    pub async fn log_probe(&self, correlation_id: &str, record: &ProbeRecord) {
        let level = if record.is_failed() { LogLevel::Info } else { LogLevel::Debug };
        self.logger
            .log(level, &record.info_line())
            .correlation_id(correlation_id)
            .record(record)
            .log()
            .await;
    }

    /// Log the timing envelope of a watchdog round
    pub async fn log_round(&self, round: u64, probes: usize, max_seconds: f64, min_seconds: f64, sleep_ms: f64) {
        self.logger
            .debug(&format!("Round {} finished with {} probes", round, probes))
            .field("round", round)
            .field("probes", probes)
            .field("max_seconds", max_seconds)
            .field("min_seconds", if min_seconds.is_finite() { Some(min_seconds) } else { None })
            .field("sleep_ms", sleep_ms)
            .log()
            .await;
    }

    /// Log an error with optional context
    pub async fn log_error(&self, error: &AppError, context: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let mut builder = self.logger.error(&message).error_info(error);
        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }
        builder.log().await;
    }
}

/// Global logger factory and management
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    /// Create a new logger factory
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a probe logger sharing this run's session ID
    pub async fn create_probe_logger(&self) -> ProbeLogger {
        let probe_logger = ProbeLogger::new(&self.config);
        probe_logger.logger.set_session_id(self.session_id.clone()).await;
        probe_logger
            .logger
            .add_context_field("mode".to_string(), self.config.mode)
            .await;
        probe_logger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn sample_entry() -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "Test message".to_string(),
            logger: "TEST".to_string(),
            correlation_id: Some("0123456789abcdef".to_string()),
            fields: {
                let mut map = HashMap::new();
                map.insert("key".to_string(), serde_json::Value::String("value".to_string()));
                map
            },
        }
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_logger_with_config() {
        let config = Config {
            debug: true,
            enable_color: false,
            ..Default::default()
        };
        let logger = Logger::with_config("TEST".to_string(), &config);
        assert_eq!(logger.min_level, LogLevel::Debug);
        assert_eq!(logger.format, LogFormat::Json);
        assert!(!logger.use_color);

        let logger = Logger::with_config("TEST".to_string(), &Config::default());
        assert_eq!(logger.min_level, LogLevel::Warn);
        assert_eq!(logger.format, LogFormat::Console);
    }

    #[test]
    fn test_verbose_level() {
        let config = Config {
            verbose: true,
            ..Default::default()
        };
        let logger = Logger::with_config("TEST".to_string(), &config);
        assert_eq!(logger.min_level, LogLevel::Info);
        assert_eq!(logger.format, LogFormat::Console);
    }

    #[tokio::test]
    async fn test_session_id_and_context_fields() {
        let logger = Logger::new("TEST".to_string());
        logger.set_session_id("run-1".to_string()).await;
        logger.add_context_field("mode".to_string(), "connect").await;

        let context = logger.context.read().await;
        assert_eq!(context.session_id.as_deref(), Some("run-1"));
        assert!(context.context_fields.contains_key("mode"));
    }

    #[test]
    fn test_log_formats() {
        let mut logger = Logger::new("TEST".to_string());
        logger.use_color = false;
        let entry = sample_entry();

        let console = logger.format_console(&entry);
        assert!(console.contains("INFO"));
        assert!(console.contains("Test message"));
        assert!(console.contains("[01234567]"));
        assert!(console.contains("key=\"value\""));

        let json = logger.format_json(&entry);
        assert!(json.starts_with('{') && json.ends_with('}'));

        logger.format = LogFormat::Json;
        assert_eq!(logger.render(&entry), json);
    }

    #[test]
    fn test_log_entry_serialization() {
        let entry = sample_entry();
        let json = serde_json::to_string(&entry).unwrap();
        let back: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.level, LogLevel::Info);
        assert_eq!(back.logger, "TEST");
    }

    #[tokio::test]
    async fn test_probe_logger_calls() {
        let logger = ProbeLogger::quiet();
        let id = logger.log_session_start("example.com", 443).await;
        assert_eq!(id.len(), 36);

        logger
            .log_resolution(&id, "example.com", &Ok(IpAddr::V4(Ipv4Addr::LOCALHOST)))
            .await;
        logger
            .log_probe(&id, &ProbeRecord::failed("127.0.0.1", 443))
            .await;
        logger.log_round(1, 3, 0.059, f64::INFINITY, 0.0).await;
        logger
            .log_error(&AppError::raw_socket("denied"), Some("startup"))
            .await;
    }

    #[tokio::test]
    async fn test_logger_factory() {
        let factory = LoggerFactory::new(Config::default());
        let probe_logger = factory.create_probe_logger().await;
        assert_eq!(probe_logger.logger.name, "PROBE");

        let context = probe_logger.logger.context.read().await;
        assert_eq!(context.session_id.as_deref(), Some(factory.session_id.as_str()));
        assert!(context.context_fields.contains_key("mode"));
    }
}
