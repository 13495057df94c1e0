use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use indexmap::IndexMap;
use num::BigInt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

/// One row of a table, keyed by column name in display order.
pub type Row = IndexMap<String, CellValue>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    BigInt(BigInt),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Json(JsonValue),
}

impl CellValue {
    /// The value written into cells created by structural edits.
    pub fn empty() -> Self {
        CellValue::String(String::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Null or the empty string; both count as "no value" for inference and ids.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::String(s) => s.is_empty(),
            CellValue::Json(JsonValue::Null) => true,
            _ => false,
        }
    }

    /// Run-time kind reported in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "boolean",
            CellValue::Integer(_) | CellValue::BigInt(_) | CellValue::Float(_) => "number",
            CellValue::String(_) => "string",
            CellValue::Date(_) => "date",
            CellValue::DateTime(_) => "datetime",
            CellValue::Json(value) => json_kind(value),
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::BigInt(i) => i.to_string(),
            CellValue::Float(f) => format_float(*f),
            CellValue::String(s) => s.clone(),
            CellValue::Date(d) => format_date(d),
            CellValue::DateTime(dt) => format_datetime(dt),
            CellValue::Json(JsonValue::String(s)) => s.clone(),
            CellValue::Json(value) => value.to_string(),
        }
    }

    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => CellValue::Null,
            JsonValue::Bool(b) => CellValue::Bool(b),
            JsonValue::Number(n) => number_to_cell(&n),
            JsonValue::String(s) => CellValue::String(s),
            structured @ (JsonValue::Array(_) | JsonValue::Object(_)) => {
                CellValue::Json(structured)
            }
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::Null => JsonValue::Null,
            CellValue::Bool(b) => JsonValue::Bool(*b),
            CellValue::Integer(i) => JsonValue::from(*i),
            // serde_json cannot hold integers past u64 without arbitrary_precision.
            CellValue::BigInt(i) => match u64::try_from(i) {
                Ok(fits) => JsonValue::from(fits),
                Err(_) => JsonValue::String(i.to_string()),
            },
            CellValue::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            CellValue::String(s) => JsonValue::String(s.clone()),
            CellValue::Date(d) => JsonValue::String(format_date(d)),
            CellValue::DateTime(dt) => JsonValue::String(format_datetime(dt)),
            CellValue::Json(value) => value.clone(),
        }
    }
}

impl From<JsonValue> for CellValue {
    fn from(value: JsonValue) -> Self {
        CellValue::from_json(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl Serialize for CellValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        JsonValue::deserialize(deserializer).map(CellValue::from_json)
    }
}

pub fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn number_to_cell(number: &Number) -> CellValue {
    if let Some(i) = number.as_i64() {
        CellValue::Integer(i)
    } else if let Some(u) = number.as_u64() {
        CellValue::BigInt(BigInt::from(u))
    } else {
        CellValue::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}

/// Converts a raw JSON row into a [`Row`]; `None` when it is not an object.
pub fn row_from_json(value: &JsonValue) -> Option<Row> {
    let map = value.as_object()?;
    Some(
        map.iter()
            .map(|(key, cell)| (key.clone(), CellValue::from_json(cell.clone())))
            .collect(),
    )
}

pub fn row_to_json(row: &Row) -> JsonValue {
    let map: JsonMap<String, JsonValue> = row
        .iter()
        .map(|(key, cell)| (key.clone(), cell.to_json()))
        .collect();
    JsonValue::Object(map)
}

pub fn rows_to_json(rows: &[Row]) -> JsonValue {
    JsonValue::Array(rows.iter().map(row_to_json).collect())
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_datetime(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_splits_numbers_by_range() {
        assert_eq!(CellValue::from_json(json!(7)), CellValue::Integer(7));
        assert_eq!(CellValue::from_json(json!(2.5)), CellValue::Float(2.5));
        assert_eq!(
            CellValue::from_json(json!(u64::MAX)),
            CellValue::BigInt(BigInt::from(u64::MAX))
        );
        assert!(matches!(
            CellValue::from_json(json!({"a": 1})),
            CellValue::Json(_)
        ));
    }

    #[test]
    fn kind_names_structured_values() {
        assert_eq!(CellValue::Json(json!([1])).kind(), "array");
        assert_eq!(CellValue::Json(json!({})).kind(), "object");
        assert_eq!(CellValue::Float(1.5).kind(), "number");
        assert_eq!(CellValue::empty().kind(), "string");
    }

    #[test]
    fn display_drops_integral_float_fraction() {
        assert_eq!(CellValue::Float(3.0).as_display(), "3");
        assert_eq!(CellValue::Float(3.25).as_display(), "3.25");
        assert_eq!(CellValue::Null.as_display(), "");
    }

    #[test]
    fn datetime_serializes_as_iso_millis() {
        let dt = DateTime::parse_from_rfc3339("2024-05-06T14:30:00+02:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            CellValue::DateTime(dt).to_json(),
            json!("2024-05-06T12:30:00.000Z")
        );
    }

    #[test]
    fn row_conversion_preserves_key_order() {
        let raw = json!({"b": 1, "a": "x"});
        let row = row_from_json(&raw).expect("object row");
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(row_to_json(&row), raw);
        assert!(row_from_json(&json!([1, 2])).is_none());
    }
}
