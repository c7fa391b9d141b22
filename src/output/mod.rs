//! Output formatting and display system
//!
//! Per-probe lines and summaries for `tcping`, and the refreshing round
//! table for `tcping-watchdog`, in plain or colored form.

mod colored;
mod formatter;

pub use self::colored::{ColorScheme, ColoredFormatter};
pub use self::formatter::{Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData, TableFormat};

use crate::error::{AppError, Result};
use std::io::{IsTerminal, Write};

/// Clear the screen and move the cursor home
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            ..Default::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }
}

/// Stdout writer that redraws in place when attached to a terminal
pub struct Screen {
    refresh: bool,
}

impl Screen {
    pub fn stdout() -> Self {
        Self {
            refresh: std::io::stdout().is_terminal(),
        }
    }

    pub fn with_refresh(refresh: bool) -> Self {
        Self { refresh }
    }

    /// Text for one frame; prefixed with the clear sequence when refreshing
    pub fn frame(&self, body: &str) -> String {
        if self.refresh {
            format!("{}{}\n", CLEAR_SCREEN, body)
        } else {
            format!("{}\n", body)
        }
    }

    pub fn show(&self, body: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(self.frame(body).as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| AppError::io(format!("Failed to write to stdout: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_clears_only_when_refreshing() {
        assert_eq!(Screen::with_refresh(true).frame("table"), "\x1b[2J\x1b[Htable\n");
        assert_eq!(Screen::with_refresh(false).frame("table"), "table\n");
    }

    #[test]
    fn test_factory_respects_color_flag() {
        let record = crate::models::ProbeRecord::failed("127.0.0.1", 1);
        let plain = OutputFormatterFactory::create_formatter(false);
        assert_eq!(plain.format_probe(&record), "From: [127.0.0.1:1]; Failed;");
    }
}
