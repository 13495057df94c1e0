//! Reconciliation of pasted or bulk-entered text onto the edit buffer.
//!
//! Text is split into non-blank lines; the delimiter is sniffed from the
//! first line only (tab if present, otherwise comma) and applied to every
//! line. Cells are trimmed and lose one surrounding double quote on each
//! side. Quoted delimiters and escaped quotes are not interpreted.

use log::{debug, info};
use serde::Serialize;
use thiserror::Error;

use crate::{buffer::EditBuffer, data::CellValue};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("no valid data found to paste")]
    NoData,
    #[error("{lines} lines exceeds the limit of {max} rows per paste")]
    TooManyLines { lines: usize, max: usize },
    #[error("column '{0}' does not exist")]
    UnknownColumn(String),
    #[error("table has no columns to paste into")]
    NoColumns,
    #[error("row {row} is outside the table ({rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Delimiter {
    Tab,
    Comma,
}

impl Delimiter {
    pub fn sniff(first_line: &str) -> Self {
        if first_line.contains('\t') {
            Delimiter::Tab
        } else {
            Delimiter::Comma
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Tab => '\t',
            Delimiter::Comma => ',',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasteBlock {
    pub delimiter: Delimiter,
    pub lines: Vec<Vec<String>>,
}

impl PasteBlock {
    pub fn parse(text: &str) -> Result<Self, ReconcileError> {
        let raw_lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>();
        let first = raw_lines.first().ok_or(ReconcileError::NoData)?;
        let delimiter = Delimiter::sniff(first);
        let lines = raw_lines
            .iter()
            .map(|line| split_cells(line, delimiter))
            .collect();
        Ok(Self { delimiter, lines })
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn ensure_within(&self, max_lines: Option<usize>) -> Result<(), ReconcileError> {
        match max_lines {
            Some(max) if self.lines.len() > max => Err(ReconcileError::TooManyLines {
                lines: self.lines.len(),
                max,
            }),
            _ => Ok(()),
        }
    }
}

fn split_cells(line: &str, delimiter: Delimiter) -> Vec<String> {
    line.split(delimiter.as_char())
        .map(|cell| strip_quotes(cell.trim()).to_string())
        .collect()
}

fn strip_quotes(cell: &str) -> &str {
    let cell = cell.strip_prefix('"').unwrap_or(cell);
    cell.strip_suffix('"').unwrap_or(cell)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PasteReport {
    pub applied: usize,
    pub lines: usize,
    pub truncated: usize,
    /// Blank rows appended to make room.
    pub rows_added: usize,
}

impl PasteReport {
    pub fn summary(&self) -> String {
        let mut message = format!(
            "Pasted {} cells across {} rows.",
            self.applied, self.lines
        );
        if self.truncated > 0 {
            message.push_str(&format!(" {} cells were truncated.", self.truncated));
        }
        message
    }
}

/// Expands the buffer to fit `block` at `start_row`, then writes every cell
/// that lands on an existing column. Both steps happen under one borrow.
///
/// `start_row` may be at most one past the last row; nothing is written when
/// it is further out.
pub fn apply_block(
    buffer: &mut EditBuffer,
    block: &PasteBlock,
    start_row: usize,
    start_column: usize,
) -> Result<PasteReport, ReconcileError> {
    let out_of_range = ReconcileError::RowOutOfRange {
        row: start_row,
        rows: buffer.len(),
    };
    if start_row > buffer.len() {
        return Err(out_of_range);
    }
    let end = start_row
        .checked_add(block.line_count())
        .ok_or(out_of_range)?;
    let needed = end.saturating_sub(buffer.len());
    buffer.add_rows(needed);

    let columns = buffer.columns().to_vec();
    let mut report = PasteReport {
        lines: block.line_count(),
        rows_added: needed,
        ..PasteReport::default()
    };
    for (offset, cells) in block.lines.iter().enumerate() {
        let row = start_row + offset;
        for (cell_index, cell) in cells.iter().enumerate() {
            match columns.get(start_column + cell_index) {
                Some(column) => {
                    buffer.update_cell(row, column, CellValue::String(cell.clone()));
                    report.applied += 1;
                }
                None => report.truncated += 1,
            }
        }
    }
    debug!(
        "Placed {:?}-delimited block at ({start_row}, {start_column}): {:?}",
        block.delimiter, report
    );
    info!("{}", report.summary());
    Ok(report)
}
