//! Console formatting of step headings, rows and write outcomes.

use crate::str_utils::column_label;
use std::io::Write;

/// Render one column value the way it should read on the console
pub fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            // Keep a fractional part on floats so averages read as such
            Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.is_finite() => {
                format!("{f:.1}")
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// `Label: value, Label: value` for a row object, in its column order
pub fn format_row(row: &serde_json::Value) -> String {
    match row.as_object() {
        Some(obj) => obj
            .iter()
            .map(|(column, value)| format!("{}: {}", column_label(column), format_value(value)))
            .collect::<Vec<_>>()
            .join(", "),
        None => format_value(row),
    }
}

/// Writes the human-readable run transcript
pub struct Report<'a> {
    out: &'a mut dyn Write,
    steps_written: usize,
}

impl<'a> Report<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Report {
            out,
            steps_written: 0,
        }
    }

    pub fn line(&mut self, text: &str) -> std::io::Result<()> {
        writeln!(self.out, "{text}")
    }

    /// Start a step; steps after the first are preceded by a blank line
    pub fn heading(&mut self, heading: &str) -> std::io::Result<()> {
        if self.steps_written > 0 {
            writeln!(self.out)?;
        }
        self.steps_written += 1;
        writeln!(self.out, "{heading}")
    }

    pub fn row(&mut self, row: &serde_json::Value) -> std::io::Result<()> {
        writeln!(self.out, "{}", format_row(row))
    }

    /// One line saying whether a write touched any rows
    pub fn write_outcome(
        &mut self,
        rows_affected: u64,
        success: &str,
        failure: &str,
    ) -> std::io::Result<()> {
        if rows_affected > 0 {
            writeln!(self.out, "{success}")
        } else {
            writeln!(self.out, "{failure}")
        }
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}
