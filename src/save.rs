//! Preparation of the full-table replace payload and the transport seam.

use std::str::FromStr;

use log::{debug, info};
use num::{BigInt, FromPrimitive, ToPrimitive};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::{
    config::EngineConfig,
    data::{CellValue, Row},
};

const UNKNOWN_SAVE_ERROR: &str = "Unknown error occurred.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Reads the `detail` field of a server error body: either a plain string
    /// or a list of `{ loc, msg, type }` entries whose messages are joined.
    pub fn from_response_body(body: &JsonValue) -> Self {
        let message = match body.get("detail") {
            Some(JsonValue::String(detail)) => detail.clone(),
            Some(JsonValue::Array(entries)) => {
                let messages = entries
                    .iter()
                    .filter_map(|entry| entry.get("msg").and_then(JsonValue::as_str))
                    .collect::<Vec<_>>();
                if messages.is_empty() {
                    UNKNOWN_SAVE_ERROR.to_string()
                } else {
                    messages.join(", ")
                }
            }
            _ => UNKNOWN_SAVE_ERROR.to_string(),
        };
        Self { message }
    }
}

/// Receives the transmit-ready rows of a full-table replace.
pub trait SaveTransport {
    fn bulk_replace(&mut self, table_name: &str, rows: &[Row]) -> Result<(), TransportError>;
}

/// Identifier value coerced to a whole number; anything unusable counts as 0.
fn numeric_id(value: Option<&CellValue>) -> BigInt {
    match value {
        Some(CellValue::Integer(i)) => BigInt::from(*i),
        Some(CellValue::BigInt(big)) => big.clone(),
        Some(CellValue::Float(f)) => BigInt::from_f64(f.floor()).unwrap_or_default(),
        Some(CellValue::String(s)) => {
            let trimmed = s.trim();
            let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
            BigInt::from_str(digits)
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .and_then(|f| BigInt::from_f64(f.floor()))
                })
                .unwrap_or_default()
        }
        _ => BigInt::default(),
    }
}

/// Synthetic identifiers are emitted as numbers rather than numeric strings;
/// past `i64` they stay arbitrary-precision.
fn id_cell(id: &BigInt) -> CellValue {
    match id.to_i64() {
        Some(small) => CellValue::Integer(small),
        None => CellValue::BigInt(id.clone()),
    }
}

/// Builds the rows to transmit without touching `rows`.
///
/// Rows with a missing, null or empty identifier get `max + 1`, `max + 2`, ...
/// in row order, where `max` is the largest existing identifier (at least 0).
/// Tables listed in `tables_without_id` then lose the identifier field.
pub fn prepare_save(rows: &[Row], table_name: &str, config: &EngineConfig) -> Vec<Row> {
    let id_field = config.id_field.as_str();
    let mut next_id = rows
        .iter()
        .map(|row| numeric_id(row.get(id_field)))
        .fold(BigInt::default(), BigInt::max);
    let mut assigned = 0usize;
    let mut prepared = rows
        .iter()
        .map(|row| {
            let mut copy = row.clone();
            if copy.get(id_field).is_none_or(CellValue::is_blank) {
                next_id += 1u32;
                assigned += 1;
                copy.insert(id_field.to_string(), id_cell(&next_id));
            }
            copy
        })
        .collect::<Vec<_>>();
    debug!("Assigned {assigned} synthetic identifier(s) for '{table_name}'");

    if config.strips_id(table_name) {
        for row in &mut prepared {
            row.shift_remove(id_field);
        }
        info!("Stripped '{id_field}' from {} row(s) of '{table_name}'", prepared.len());
    }
    prepared
}
