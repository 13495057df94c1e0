//! Plain-text grid rendering for terminal output.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{
    data::{CellValue, Row},
    parser::ValidationOutcome,
};

const COLUMN_GAP: &str = "  ";

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(flatten(cell).chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(headers, &widths));
    let rule = widths
        .iter()
        .map(|w| "-".repeat((*w).max(1)))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_line(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

/// Renders buffer rows in `columns` order; cells a row lacks print blank.
pub fn render_rows(columns: &[String], rows: &[Row]) -> String {
    let cells = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| row.get(column).map(CellValue::as_display).unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    render_table(columns, &cells)
}

/// One line per failed row: `row <n>: <error>; <error>`.
pub fn render_report(report: &[ValidationOutcome]) -> String {
    let mut output = String::new();
    for outcome in report.iter().filter(|outcome| !outcome.valid) {
        let _ = writeln!(output, "row {}: {}", outcome.row, outcome.errors.join("; "));
    }
    output
}

fn format_line<S: AsRef<str>>(values: &[S], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let text = flatten(value.as_ref());
            let pad = width.saturating_sub(text.chars().count());
            format!("{text}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    line.truncate(line.trim_end().len());
    line
}

fn flatten(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_columns_and_trims_line_ends() {
        let headers = vec!["id".to_string(), "name".to_string()];
        let rows = vec![
            vec!["1".to_string(), "pen".to_string()],
            vec!["10".to_string(), "".to_string()],
        ];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "id  name");
        assert_eq!(lines[1], "--  ----");
        assert_eq!(lines[2], "1   pen");
        assert_eq!(lines[3], "10");
    }

    #[test]
    fn embedded_tabs_are_flattened() {
        let rendered = render_table(&["a".to_string()], &[vec!["x\ty".to_string()]]);
        assert!(rendered.contains("x y"));
    }
}
