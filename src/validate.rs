//! Per-value type validation and canonical parsing.
//!
//! [`validate`] is the single acceptance rule set for every column type: the
//! schema-driven parser enforces it, cell edits go through it, and
//! [`crate::infer`] reuses it in sniffing mode through [`accepts`].

use std::{str::FromStr, sync::LazyLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use num::{BigInt, FromPrimitive, ToPrimitive};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::{
    data::{CellValue, format_date, format_datetime},
    schema::ColumnType,
};

static INTEGER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("valid integer pattern"));
static FLOAT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").expect("valid float pattern"));
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FieldError {
    pub expected: ColumnType,
    pub message: String,
}

impl FieldError {
    fn mismatch(expected: ColumnType, value: &CellValue) -> Self {
        Self {
            expected,
            message: format!("expected {expected}, got {}", value.kind()),
        }
    }

    fn with_detail(expected: ColumnType, value: &CellValue, detail: &str) -> Self {
        Self {
            expected,
            message: format!("expected {expected}, got {} ({detail})", value.kind()),
        }
    }
}

pub fn validate(value: &CellValue, ty: &ColumnType) -> Result<CellValue, FieldError> {
    if value.is_null() {
        return Ok(CellValue::Null);
    }
    // JSON scalars produced by a `json` column are re-read as plain values.
    if *ty != ColumnType::Json
        && let CellValue::Json(inner) = value
        && !inner.is_array()
        && !inner.is_object()
    {
        return validate(&CellValue::from_json(inner.clone()), ty);
    }
    match ty {
        ColumnType::Integer => parse_integer(value),
        ColumnType::Bigint => parse_bigint(value),
        ColumnType::Float => parse_float(value),
        ColumnType::Boolean => parse_boolean(value),
        ColumnType::Date => parse_date(value),
        ColumnType::Datetime => parse_datetime(value),
        ColumnType::Json => parse_json(value),
        ColumnType::String => parse_string(value),
    }
}

/// Sniffing form of [`validate`]: reports acceptance without keeping the result.
pub fn accepts(value: &CellValue, ty: &ColumnType) -> bool {
    validate(value, ty).is_ok()
}

fn parse_integer(value: &CellValue) -> Result<CellValue, FieldError> {
    let ty = ColumnType::Integer;
    match value {
        CellValue::Integer(i) => Ok(CellValue::Integer(*i)),
        CellValue::BigInt(big) => big
            .to_i64()
            .map(CellValue::Integer)
            .ok_or_else(|| FieldError::with_detail(ty, value, "out of range")),
        CellValue::Float(f) if is_integral(*f) => f
            .to_i64()
            .map(CellValue::Integer)
            .ok_or_else(|| FieldError::with_detail(ty, value, "out of range")),
        CellValue::String(s) if INTEGER_PATTERN.is_match(s.trim()) => s
            .trim()
            .parse::<i64>()
            .map(CellValue::Integer)
            .map_err(|_| FieldError::with_detail(ty, value, "out of range")),
        _ => Err(FieldError::mismatch(ty, value)),
    }
}

fn parse_bigint(value: &CellValue) -> Result<CellValue, FieldError> {
    let ty = ColumnType::Bigint;
    let big = match value {
        CellValue::Integer(i) => return Ok(CellValue::Integer(*i)),
        CellValue::BigInt(big) => big.clone(),
        CellValue::Float(f) if is_integral(*f) => {
            BigInt::from_f64(*f).ok_or_else(|| FieldError::mismatch(ty, value))?
        }
        CellValue::String(s) if INTEGER_PATTERN.is_match(s.trim()) => {
            let digits = s.trim();
            let digits = digits.strip_prefix('+').unwrap_or(digits);
            BigInt::from_str(digits).map_err(|_| FieldError::mismatch(ty, value))?
        }
        _ => return Err(FieldError::mismatch(ty, value)),
    };
    Ok(match big.to_i64() {
        Some(small) => CellValue::Integer(small),
        None => CellValue::BigInt(big),
    })
}

fn parse_float(value: &CellValue) -> Result<CellValue, FieldError> {
    let ty = ColumnType::Float;
    let parsed = match value {
        CellValue::Integer(i) => *i as f64,
        CellValue::BigInt(big) => big.to_f64().unwrap_or(f64::INFINITY),
        CellValue::Float(f) => *f,
        CellValue::String(s) if FLOAT_PATTERN.is_match(s.trim()) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| FieldError::mismatch(ty, value))?,
        _ => return Err(FieldError::mismatch(ty, value)),
    };
    if !parsed.is_finite() {
        return Err(FieldError::with_detail(ty, value, "not finite"));
    }
    Ok(CellValue::Float(parsed))
}

fn parse_boolean(value: &CellValue) -> Result<CellValue, FieldError> {
    match value {
        CellValue::Bool(b) => Ok(CellValue::Bool(*b)),
        CellValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(CellValue::Bool(true)),
            "false" => Ok(CellValue::Bool(false)),
            _ => Err(FieldError::mismatch(ColumnType::Boolean, value)),
        },
        _ => Err(FieldError::mismatch(ColumnType::Boolean, value)),
    }
}

fn parse_date(value: &CellValue) -> Result<CellValue, FieldError> {
    let ty = ColumnType::Date;
    let date = match value {
        CellValue::Date(d) => *d,
        CellValue::DateTime(dt) => dt.date_naive(),
        CellValue::String(s) if DATE_PATTERN.is_match(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| FieldError::with_detail(ty, value, "not a calendar date"))?,
        _ => return Err(FieldError::mismatch(ty, value)),
    };
    Ok(CellValue::String(format_date(&date)))
}

fn parse_datetime(value: &CellValue) -> Result<CellValue, FieldError> {
    let ty = ColumnType::Datetime;
    let datetime = match value {
        CellValue::DateTime(dt) => *dt,
        CellValue::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
        CellValue::String(s) => {
            parse_datetime_text(s).ok_or_else(|| FieldError::mismatch(ty, value))?
        }
        _ => return Err(FieldError::mismatch(ty, value)),
    };
    Ok(CellValue::String(format_datetime(&datetime)))
}

/// Reads RFC 3339, naive date-times (as UTC) and bare dates (midnight UTC).
pub fn parse_datetime_text(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
}

fn parse_json(value: &CellValue) -> Result<CellValue, FieldError> {
    match value {
        CellValue::String(s) => serde_json::from_str::<JsonValue>(s)
            .map(CellValue::Json)
            .map_err(|err| FieldError {
                expected: ColumnType::Json,
                message: format!("expected json, got malformed JSON string ({err})"),
            }),
        other => Ok(other.clone()),
    }
}

fn parse_string(value: &CellValue) -> Result<CellValue, FieldError> {
    match value {
        CellValue::String(s) => Ok(CellValue::String(s.clone())),
        CellValue::Bool(_)
        | CellValue::Integer(_)
        | CellValue::BigInt(_)
        | CellValue::Float(_)
        | CellValue::Date(_)
        | CellValue::DateTime(_) => Ok(CellValue::String(value.as_display())),
        _ => Err(FieldError::mismatch(ColumnType::String, value)),
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

/// Character classes accepted by free-form form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Number,
    Alphanumeric,
}

pub fn validate_input(text: &str, kind: InputKind) -> bool {
    match kind {
        InputKind::Text => text.chars().all(|c| c.is_ascii_alphabetic() || c.is_whitespace()),
        InputKind::Number => !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()),
        InputKind::Alphanumeric => text.chars().all(|c| c.is_ascii_alphanumeric()),
    }
}
