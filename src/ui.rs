//! Terminal output helpers.
//!
//! Status lines use a single colored glyph (`✓`, `!`, `x`) in front of the
//! message. [`Table`] renders box-drawn columns sized to the terminal.

use colored::*;
use console::{Term, measure_text_width, truncate_str};
use std::fmt::Display;

pub fn success(msg: impl Display) {
    println!("{} {}", "✓".green(), msg);
}

pub fn warning(msg: impl Display) {
    println!("{} {}", "!".yellow(), msg);
}

pub fn failure(msg: impl Display) {
    eprintln!("{} {}", "x".red(), msg);
}

/// Narrowest a column is squeezed to when the terminal is too small.
const MIN_COLUMN: usize = 8;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn print(&self) {
        let (_, width) = Term::stdout().size();
        print!("{}", self.render(width as usize));
    }

    /// Lay the table out within `max_width` columns of text.
    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }
        let widths = self.column_widths(max_width);

        let border = |left: &str, mid: &str, right: &str| {
            let cells: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}\n", left, cells.join(mid), right)
        };
        let line = |cells: &[String], bold: bool| {
            let mut out = String::from("  │");
            for (cell, &width) in cells.iter().zip(&widths) {
                let text = truncate_str(&flatten(cell), width, "...").into_owned();
                let padding = width.saturating_sub(measure_text_width(&text));
                let text = if bold { text.bold().to_string() } else { text };
                out.push_str(&format!(" {}{} │", text, " ".repeat(padding)));
            }
            out.push('\n');
            out
        };

        let mut out = border("┌", "┬", "┐");
        out.push_str(&line(&self.headers, true));
        out.push_str(&border("├", "┼", "┤"));
        for row in &self.rows {
            out.push_str(&line(row, false));
        }
        out.push_str(&border("└", "┴", "┘"));
        out
    }

    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .headers
            .iter()
            .map(|h| measure_text_width(h))
            .collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(measure_text_width(&flatten(cell)));
            }
        }

        // Indent, outer borders and the padding around each cell.
        let overhead = 3 + 3 * widths.len();
        let available = max_width.saturating_sub(overhead);
        while widths.iter().sum::<usize>() > available {
            let Some(widest) = widths.iter_mut().max() else {
                break;
            };
            if *widest <= MIN_COLUMN {
                break;
            }
            *widest -= 1;
        }
        widths
    }
}

fn flatten(s: &str) -> String {
    s.replace(['\n', '\r', '\t'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_aligns_columns() {
        colored::control::set_override(false);
        let mut table = Table::new(&["Package", "Pinned"]);
        table.add_row(vec!["example.com/lib".to_string(), "abc123".to_string()]);
        table.add_row(vec!["dropped".to_string()]);

        let out = table.render(120);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "  │ Package         │ Pinned │");
        assert_eq!(lines[3], "  │ example.com/lib │ abc123 │");
        assert!(lines.iter().all(|l| measure_text_width(l) == measure_text_width(lines[0])));
    }

    #[test]
    fn test_render_shrinks_widest_column() {
        colored::control::set_override(false);
        let mut table = Table::new(&["Package", "Pinned"]);
        table.add_row(vec![
            "github.com/some/very/long/import/path".to_string(),
            "2788f0dbd16903de03cb8186e5c7d97b69ad387b".to_string(),
        ]);

        let out = table.render(40);
        assert!(out.lines().all(|l| measure_text_width(l) <= 40));
        assert!(out.contains("..."));
    }
}
