//! Table output formatting using the `tabled` crate
//!
//! Terminal-width aware, with per-column truncation when stdout is a TTY.

use super::OutputConfig;
use tabled::{
    builder::Builder,
    settings::{object::Columns, style::Style, Alignment, Modify, Width},
    Table,
};

/// Table output formatter
pub struct TableOutput;

impl TableOutput {
    /// Create a table from rows of strings
    ///
    /// When truncating, every column gets an equal share of the terminal
    /// width after borders and padding, and long cells end in `...`.
    pub fn from_rows(headers: &[&str], rows: &[Vec<String>], config: &OutputConfig) -> String {
        if rows.is_empty() {
            return "(no results)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(headers.iter().copied());
        for row in rows {
            builder.push_record(row.iter().map(String::as_str));
        }

        let mut table = builder.build();
        if config.should_truncate() {
            // One border and two padding columns per cell, plus the closing border
            let col_count = headers.len().max(1);
            let cell_width =
                config.effective_width().saturating_sub(col_count * 3 + 1) / col_count;
            if cell_width > 3 {
                table.with(
                    Modify::new(Columns::new(..)).with(Width::truncate(cell_width).suffix("...")),
                );
            }
        }
        Self::style(&mut table, config);
        table.to_string()
    }

    /// Format a simple key-value table
    pub fn format_key_value(pairs: &[(&str, String)], config: &OutputConfig) -> String {
        let mut builder = Builder::default();

        for (key, value) in pairs {
            builder.push_record([*key, value.as_str()]);
        }

        let mut table = builder.build();
        table.with(Modify::new(Columns::first()).with(Alignment::right()));
        Self::style(&mut table, config);
        if config.should_truncate() {
            table.with(Width::wrap(config.effective_width()));
        }
        table.to_string()
    }

    fn style(table: &mut Table, config: &OutputConfig) {
        if config.compact {
            table.with(Style::blank());
        } else {
            table.with(Style::rounded());
        }
    }
}
