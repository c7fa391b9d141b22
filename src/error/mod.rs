//! Error handling for the TCP latency prober
//!
//! Transient connection failures (refusals, timeouts) are never errors: they
//! are recorded as failed probe records. Everything in [`AppError`] is fatal
//! at the boundary that receives it.

use thiserror::Error;

/// Custom error types for tcping and the watchdog
#[derive(Error, Debug)]
pub enum AppError {
    /// Name or address could not be resolved
    #[error("Invalid IP-address or Domain: {0}")]
    InvalidDestination(String),

    /// Malformed `host:port` watchdog destination
    #[error("Invalid port specification: {0}")]
    InvalidPortSpecification(String),

    /// Statistics requested over zero probe records
    #[error("Count of the benchmarks must be greater than zero: {0}")]
    EmptyInput(String),

    /// Raw socket could not be opened (usually missing privileges)
    #[error("Raw socket error: {0}")]
    RawSocket(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parsing errors (numbers, addresses, modes)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// I/O errors outside the probe path
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new invalid destination error
    pub fn invalid_destination<S: Into<String>>(message: S) -> Self {
        Self::InvalidDestination(message.into())
    }

    /// Create a new invalid port specification error
    pub fn invalid_port_specification<S: Into<String>>(message: S) -> Self {
        Self::InvalidPortSpecification(message.into())
    }

    /// Create a new empty input error
    pub fn empty_input<S: Into<String>>(message: S) -> Self {
        Self::EmptyInput(message.into())
    }

    /// Create a new raw socket error
    pub fn raw_socket<S: Into<String>>(message: S) -> Self {
        Self::RawSocket(message.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidDestination(_) => "DESTINATION",
            Self::InvalidPortSpecification(_) => "PORT",
            Self::EmptyInput(_) => "STATS",
            Self::RawSocket(_) => "RAW",
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Parse(_) => "PARSE",
            Self::Io(_) => "IO",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether this error ends the affected target's session.
    ///
    /// Only resolution failures are scoped to a single target; the watchdog
    /// keeps probing the remaining targets when one hits this.
    pub fn is_target_fatal(&self) -> bool {
        matches!(self, Self::InvalidDestination(_))
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::InvalidDestination(_) | Self::InvalidPortSpecification(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::RawSocket(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::EmptyInput(_) | Self::Io(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::internal(format!("Probe task failed: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error reporter for user-facing error output
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", error.format_for_console(self.use_color));

        if self.verbose {
            if let Some(hint) = Self::hint(error) {
                eprintln!();
                eprintln!("{}", hint);
            }
        }
    }

    /// Report multiple errors
    pub fn report_errors(&self, errors: &[AppError]) {
        for error in errors {
            self.report_error(error);
        }
    }

    fn hint(error: &AppError) -> Option<&'static str> {
        match error {
            AppError::InvalidDestination(_) => {
                Some("Suggestion: check the spelling of the host, or pass --ipv6 for IPv6-only names.")
            }
            AppError::InvalidPortSpecification(_) => {
                Some("Suggestion: destinations are written as host or host:port, e.g. example.com:443.")
            }
            AppError::RawSocket(_) => {
                Some("Suggestion: raw mode needs root or CAP_NET_RAW; use --mode connect otherwise.")
            }
            _ => None,
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}
