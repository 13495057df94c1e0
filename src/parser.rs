//! Turns raw fetch payloads into typed rows plus a per-row validation report.
//!
//! The schema-driven path expects `data` to be `[schema, row, row, ...]`
//! where `schema` maps column names to type labels. The schema-less path
//! infers types from the rows first and then runs the same row validation.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::{
    data::{CellValue, Row, row_from_json},
    infer,
    schema::ColumnSchema,
    validate::validate,
};

pub const NOT_AN_OBJECT: &str = "row is not an object";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("response data is empty")]
    EmptyData,
    #[error("first data element must be a column schema object, got {0}")]
    SchemaNotObject(&'static str),
    #[error("response data must be an array, got {0}")]
    DataNotArray(&'static str),
    #[error("response status was '{0}'")]
    Status(String),
    #[error("malformed response envelope: {0}")]
    Envelope(String),
}

/// Response body handed over by the fetch layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub data: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl FetchEnvelope {
    pub fn from_json(value: JsonValue) -> Result<Self, ShapeError> {
        serde_json::from_value(value).map_err(|err| ShapeError::Envelope(err.to_string()))
    }

    fn data_elements(&self) -> Result<&[JsonValue], ShapeError> {
        if let Some(status) = &self.status
            && status != "success"
        {
            return Err(ShapeError::Status(status.clone()));
        }
        match &self.data {
            JsonValue::Array(items) => Ok(items),
            other => Err(ShapeError::DataNotArray(crate::data::json_kind(other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    /// 1-based position among the data rows.
    pub row: usize,
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedTable {
    pub table_name: String,
    pub schema: ColumnSchema,
    pub rows: Vec<Row>,
    pub report: Vec<ValidationOutcome>,
}

impl ParsedTable {
    pub fn invalid_count(&self) -> usize {
        self.report.iter().filter(|outcome| !outcome.valid).count()
    }

    pub fn excluded_count(&self) -> usize {
        self.report
            .iter()
            .filter(|outcome| outcome.parsed.is_none())
            .count()
    }

    pub fn errors(&self) -> impl Iterator<Item = (usize, &str)> {
        self.report.iter().flat_map(|outcome| {
            outcome
                .errors
                .iter()
                .map(move |error| (outcome.row, error.as_str()))
        })
    }
}

pub fn parse_response(envelope: &FetchEnvelope) -> Result<ParsedTable, ShapeError> {
    let mut table = parse_rows(envelope.data_elements()?)?;
    table.table_name = envelope.table_name.clone();
    Ok(table)
}

pub fn parse_schemaless_response(envelope: &FetchEnvelope) -> Result<ParsedTable, ShapeError> {
    let mut table = parse_schemaless(envelope.data_elements()?);
    table.table_name = envelope.table_name.clone();
    Ok(table)
}

pub fn parse_rows(data: &[JsonValue]) -> Result<ParsedTable, ShapeError> {
    let (first, raw_rows) = data.split_first().ok_or(ShapeError::EmptyData)?;
    let schema = ColumnSchema::from_json(first)
        .ok_or_else(|| ShapeError::SchemaNotObject(crate::data::json_kind(first)))?;
    debug!(
        "Schema with {} column(s); {} raw row(s) to validate",
        schema.len(),
        raw_rows.len()
    );
    let (rows, report) = validate_rows(&schema, raw_rows);
    let table = ParsedTable {
        table_name: String::new(),
        schema,
        rows,
        report,
    };
    log_summary(&table);
    Ok(table)
}

pub fn parse_schemaless(data: &[JsonValue]) -> ParsedTable {
    let objects = data.iter().filter_map(row_from_json).collect::<Vec<_>>();
    let schema = infer::infer_schema(&objects);
    debug!(
        "Inferred {} column(s) from {} row(s)",
        schema.len(),
        objects.len()
    );
    let (rows, report) = validate_rows(&schema, data);
    let table = ParsedTable {
        table_name: String::new(),
        schema,
        rows,
        report,
    };
    log_summary(&table);
    table
}

fn validate_rows(schema: &ColumnSchema, raw_rows: &[JsonValue]) -> (Vec<Row>, Vec<ValidationOutcome>) {
    let mut rows = Vec::with_capacity(raw_rows.len());
    let mut report = Vec::with_capacity(raw_rows.len());
    for (idx, raw) in raw_rows.iter().enumerate() {
        let row_number = idx + 1;
        let Some(raw_row) = row_from_json(raw) else {
            report.push(ValidationOutcome {
                row: row_number,
                valid: false,
                errors: vec![NOT_AN_OBJECT.to_string()],
                parsed: None,
            });
            continue;
        };
        let (parsed, errors) = validate_row(schema, raw_row);
        report.push(ValidationOutcome {
            row: row_number,
            valid: errors.is_empty(),
            errors,
            parsed: Some(parsed.clone()),
        });
        rows.push(parsed);
    }
    (rows, report)
}

/// Validates every schema column of one row.
///
/// Failed columns become null and add `"<column>: <reason>"`; the remaining
/// columns still parse. Keys outside the schema are left untouched.
pub fn validate_row(schema: &ColumnSchema, mut row: Row) -> (Row, Vec<String>) {
    let mut errors = Vec::new();
    for column in &schema.columns {
        let raw = row.get(&column.name).cloned().unwrap_or(CellValue::Null);
        let parsed = match validate(&raw, &column.datatype) {
            Ok(parsed) => parsed,
            Err(err) => {
                errors.push(format!("{}: {}", column.name, err));
                CellValue::Null
            }
        };
        row.insert(column.name.clone(), parsed);
    }
    (row, errors)
}

fn log_summary(table: &ParsedTable) {
    let invalid = table.invalid_count();
    if invalid > 0 {
        warn!(
            "{} of {} row(s) failed validation ({} not objects)",
            invalid,
            table.report.len(),
            table.excluded_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_values_per_schema() {
        let data = vec![
            json!({"id": "integer", "name": "string"}),
            json!({"id": "7", "name": 42}),
        ];
        let table = parse_rows(&data).expect("parsed");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0]["id"], CellValue::Integer(7));
        assert_eq!(table.rows[0]["name"], CellValue::from("42"));
        assert!(table.report[0].valid);
        assert!(table.report[0].errors.is_empty());
    }

    #[test]
    fn failed_column_is_nulled_and_siblings_parse() {
        let data = vec![
            json!({"age": "integer", "active": "boolean"}),
            json!({"age": "12.5", "active": "TRUE", "extra": [1]}),
        ];
        let table = parse_rows(&data).expect("parsed");
        let outcome = &table.report[0];
        assert!(!outcome.valid);
        assert_eq!(outcome.errors, vec!["age: expected integer, got string"]);
        let row = outcome.parsed.as_ref().expect("partial row");
        assert_eq!(row["age"], CellValue::Null);
        assert_eq!(row["active"], CellValue::Bool(true));
        assert_eq!(row["extra"], CellValue::Json(json!([1])));
    }

    #[test]
    fn non_object_rows_are_reported_and_excluded() {
        let data = vec![
            json!({"id": "integer"}),
            json!([1, 2]),
            json!({"id": 2}),
            json!("text"),
        ];
        let table = parse_rows(&data).expect("parsed");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.report.len(), 3);
        assert_eq!(table.report[0].errors, vec![NOT_AN_OBJECT]);
        assert!(table.report[0].parsed.is_none());
        assert_eq!(table.report[2].row, 3);
        assert_eq!(table.excluded_count(), 2);
    }

    #[test]
    fn missing_schema_column_parses_as_null() {
        let data = vec![json!({"id": "integer", "note": "string"}), json!({"id": 1})];
        let table = parse_rows(&data).expect("parsed");
        assert_eq!(table.rows[0]["note"], CellValue::Null);
        assert!(table.report[0].valid);
    }

    #[test]
    fn shape_errors_for_bad_envelopes() {
        assert_eq!(parse_rows(&[]), Err(ShapeError::EmptyData));
        assert_eq!(
            parse_rows(&[json!([{"id": "integer"}])]),
            Err(ShapeError::SchemaNotObject("array"))
        );
        let failed = FetchEnvelope::from_json(json!({"status": "error", "data": []})).unwrap();
        assert_eq!(
            parse_response(&failed),
            Err(ShapeError::Status("error".to_string()))
        );
        let scalar = FetchEnvelope::from_json(json!({"table_name": "t", "data": 3})).unwrap();
        assert_eq!(parse_response(&scalar), Err(ShapeError::DataNotArray("number")));
    }

    #[test]
    fn schemaless_rows_are_validated_against_inferred_types() {
        let data = vec![
            json!({"id": 1, "name": "a"}),
            json!({"id": "2", "name": "b"}),
            json!(null),
        ];
        let table = parse_schemaless(&data);
        assert_eq!(
            table.schema.column_type("id"),
            Some(crate::schema::ColumnType::Integer)
        );
        assert_eq!(table.rows[1]["id"], CellValue::Integer(2));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.excluded_count(), 1);
    }
}
