//! Colored terminal output implementation

use super::formatter::{round_row, round_table_format, render_table, FormattingOptions, OutputFormatter, RowData};
use crate::{
    error::Result,
    executor::RoundReport,
    models::ProbeRecord,
    stats::{round3, StatisticsSummary},
};
use colored::{Color, ColoredString, Colorize};

/// Color scheme for different output elements
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub open: Color,
    pub closed: Color,
    pub fatal: Color,
    pub header: Color,
    pub warning: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            open: Color::Green,
            closed: Color::Red,
            fatal: Color::BrightRed,
            header: Color::Cyan,
            warning: Color::Yellow,
        }
    }
}

/// Formatter that colors conditions, failures and loss
pub struct ColoredFormatter {
    options: FormattingOptions,
    colors: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    pub fn with_color_scheme(options: FormattingOptions, colors: ColorScheme) -> Self {
        Self { options, colors }
    }

    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn emphasize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color).bold()
        } else {
            text.normal()
        }
    }

    fn loss_color(&self, loss_percentage: f64) -> Color {
        if loss_percentage == 0.0 {
            self.colors.open
        } else if loss_percentage < 100.0 {
            self.colors.warning
        } else {
            self.colors.closed
        }
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_probe(&self, record: &ProbeRecord) -> String {
        match record.elapsed_ms() {
            Some(ms) => format!(
                "From: [{}:{}]; Time: {}ms;",
                record.address(),
                record.port(),
                self.colorize(&format!("{:?}", round3(ms)), self.colors.open)
            ),
            None => format!(
                "From: [{}:{}]; {};",
                record.address(),
                record.port(),
                self.colorize("Failed", self.colors.closed)
            ),
        }
    }

    fn format_summary(&self, summary: &StatisticsSummary) -> String {
        let header = format!("Statistic tcping for [{}:{}]:", summary.address, summary.port);
        let loss = format!("{:?}", round3(summary.loss_percentage));

        format!(
            "{}\nPings count: {}, Successful: {}, Failed: {}\nFails percentage: {}\nMax time: {:?}ms, Min time: {:?}ms, Average time {:?}ms",
            self.emphasize(&header, self.colors.header),
            summary.total,
            summary.successful,
            summary.failed,
            self.colorize(&loss, self.loss_color(summary.loss_percentage)),
            round3(summary.max_ms),
            round3(summary.min_ms),
            round3(summary.average_ms)
        )
    }

    fn format_round(&self, report: &RoundReport) -> Result<String> {
        let format = round_table_format(&self.options);
        let rows: Vec<RowData> = report
            .rows
            .iter()
            .map(|row| round_row(&row.destination, &row.record))
            .collect();

        let condition_column = format.columns.len() - 1;
        let paint = |idx: usize, raw: &str, padded: String| -> String {
            if idx != condition_column {
                return padded;
            }
            let color = if raw == "Open" { self.colors.open } else { self.colors.closed };
            self.colorize(&padded, color).to_string()
        };

        let mut output = render_table(&format, &rows, &paint);
        for (destination, reason) in &report.fatal {
            output.push('\n');
            output.push_str(&format!("{}: {}", self.emphasize(destination, self.colors.fatal), reason));
        }
        Ok(output)
    }

    fn format_warning(&self, warning: &str) -> String {
        format!("{} {}", self.emphasize("Warning:", self.colors.warning), warning)
    }
}
