//! Core formatting traits and implementations

use crate::{
    error::{AppError, Result},
    executor::RoundReport,
    models::ProbeRecord,
    stats::{round3, StatisticsSummary},
};
use std::fmt::Write;

/// Main trait for output formatting
pub trait OutputFormatter: Send + Sync {
    /// One line per probe
    fn format_probe(&self, record: &ProbeRecord) -> String;

    /// Four-line summary block for one destination
    fn format_summary(&self, summary: &StatisticsSummary) -> String;

    /// Summaries for several destinations, separated by blank lines
    fn format_summaries(&self, summaries: &[StatisticsSummary]) -> Result<String> {
        let mut output = String::new();
        for (idx, summary) in summaries.iter().enumerate() {
            if idx > 0 {
                output.push_str("\n\n");
            }
            write!(output, "{}", self.format_summary(summary))
                .map_err(|e| AppError::io(format!("Failed to format summary: {}", e)))?;
        }
        Ok(output)
    }

    /// Watchdog table for one round
    fn format_round(&self, report: &RoundReport) -> Result<String>;

    fn format_warning(&self, warning: &str) -> String;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Widest a destination cell may grow before it is cut
    pub max_destination_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            table_borders: true,
            max_destination_width: 48,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_borders: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
    pub max_width: usize,
}

impl Column {
    pub fn centered(header: &str, max_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment: Alignment::Center,
            min_width: 1,
            max_width,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Cell decorator: `(column index, raw text, padded text) -> rendered text`
pub(crate) type CellPainter<'a> = &'a dyn Fn(usize, &str, String) -> String;

/// Watchdog table layout
pub(crate) fn round_table_format(options: &FormattingOptions) -> TableFormat {
    TableFormat {
        columns: vec![
            Column::centered("destination", options.max_destination_width),
            Column::centered("ip", 39),
            Column::centered("port", 5),
            Column::centered("time ms", 16),
            Column::centered("condition", 9),
        ],
        show_borders: options.table_borders,
    }
}

/// Table row for one record
pub(crate) fn round_row(destination: &str, record: &ProbeRecord) -> RowData {
    let (time, condition) = match record.elapsed_ms() {
        Some(ms) => (format!("{:?}", round3(ms)), "Open"),
        None => ("-".to_string(), "Closed"),
    };

    vec![
        destination.to_string(),
        record.address().to_string(),
        record.port().to_string(),
        time,
        condition.to_string(),
    ]
}

/// Render a table; `paint` sees every data cell after padding
pub(crate) fn render_table(format: &TableFormat, rows: &[RowData], paint: CellPainter<'_>) -> String {
    let column_widths = calculate_column_widths(format, rows);
    let mut output = String::new();

    if format.show_borders {
        output.push_str(&create_horizontal_border(&column_widths));
        output.push('\n');
    }

    let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
    output.push_str(&create_row(&headers, &column_widths, format, &|_, _, padded| padded));
    output.push('\n');

    if format.show_borders {
        output.push_str(&create_horizontal_border(&column_widths));
        output.push('\n');
    }

    for row in rows {
        output.push_str(&create_row(row, &column_widths, format, paint));
        output.push('\n');
    }

    if format.show_borders {
        output.push_str(&create_horizontal_border(&column_widths));
    }

    output
}

fn calculate_column_widths(format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
    format
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let content = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            let header = column.header.chars().count();
            content.max(column.min_width).min(column.max_width).max(header)
        })
        .collect()
}

fn create_row(data: &[String], widths: &[usize], format: &TableFormat, paint: CellPainter<'_>) -> String {
    let mut row = String::new();

    if format.show_borders {
        row.push('|');
    }

    for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
        let alignment = format
            .columns
            .get(idx)
            .map(|column| &column.alignment)
            .unwrap_or(&Alignment::Left);

        let padded_cell = paint(idx, cell, align_text(cell, width, alignment));

        if format.show_borders {
            row.push(' ');
            row.push_str(&padded_cell);
            row.push_str(" |");
        } else {
            row.push_str(&padded_cell);
            row.push_str("  ");
        }
    }

    if format.show_borders {
        row
    } else {
        row.trim_end().to_string()
    }
}

fn create_horizontal_border(widths: &[usize]) -> String {
    let mut border = String::new();

    if !widths.is_empty() {
        border.push('+');
        for &width in widths {
            border.push_str(&"-".repeat(width + 2));
            border.push('+');
        }
    }

    border
}

/// Align text within specified width
pub(crate) fn align_text(text: &str, width: usize, alignment: &Alignment) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }

    let padding = width - len;
    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left_pad = padding / 2;
            let right_pad = padding - left_pad;
            format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
        }
    }
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new(FormattingOptions {
            enable_color: false,
            ..Default::default()
        })
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_probe(&self, record: &ProbeRecord) -> String {
        record.info_line()
    }

    fn format_summary(&self, summary: &StatisticsSummary) -> String {
        summary.to_string()
    }

    fn format_round(&self, report: &RoundReport) -> Result<String> {
        let format = round_table_format(&self.options);
        let rows: Vec<RowData> = report
            .rows
            .iter()
            .map(|row| round_row(&row.destination, &row.record))
            .collect();

        let mut output = render_table(&format, &rows, &|_, _, padded| padded);
        for (destination, reason) in &report.fatal {
            write!(output, "\n{}: {}", destination, reason)
                .map_err(|e| AppError::io(format!("Failed to format round: {}", e)))?;
        }
        Ok(output)
    }

    fn format_warning(&self, warning: &str) -> String {
        format!("Warning: {}", warning)
    }
}
