//! Column type tags and the per-fetch column schema.
//!
//! A [`ColumnSchema`] is either read from the first element of a fetch
//! payload (a `column -> type label` object) or inferred from observed rows
//! by [`crate::infer`]. Raw labels are normalized through
//! [`ColumnType::normalize`]; anything outside the canonical set is parsed
//! as `string` while the original label is kept on the [`ColumnDef`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Bigint,
    Float,
    Boolean,
    Date,
    Datetime,
    Json,
    String,
}

impl ColumnType {
    pub fn normalize(label: Option<&str>) -> ColumnType {
        let Some(label) = label else {
            return ColumnType::String;
        };
        Self::from_canonical(&label.trim().to_ascii_lowercase()).unwrap_or(ColumnType::String)
    }

    fn from_canonical(lowered: &str) -> Option<ColumnType> {
        match lowered {
            "integer" => Some(ColumnType::Integer),
            "bigint" => Some(ColumnType::Bigint),
            "float" => Some(ColumnType::Float),
            "boolean" => Some(ColumnType::Boolean),
            "date" => Some(ColumnType::Date),
            "datetime" => Some(ColumnType::Datetime),
            "json" => Some(ColumnType::Json),
            "string" => Some(ColumnType::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Bigint => "bigint",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Datetime => "datetime",
            ColumnType::Json => "json",
            ColumnType::String => "string",
        }
    }

    pub fn variants() -> &'static [ColumnType] {
        &[
            ColumnType::Integer,
            ColumnType::Bigint,
            ColumnType::Float,
            ColumnType::Boolean,
            ColumnType::Date,
            ColumnType::Datetime,
            ColumnType::Json,
            ColumnType::String,
        ]
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub datatype: ColumnType,
    /// Lower-cased label as received; empty when the source gave none.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, datatype: ColumnType) -> Self {
        Self {
            name: name.into(),
            datatype,
            label: datatype.as_str().to_string(),
        }
    }

    pub fn from_label(name: impl Into<String>, label: Option<&str>) -> Self {
        Self {
            name: name.into(),
            datatype: ColumnType::normalize(label),
            label: label
                .map(|raw| raw.trim().to_ascii_lowercase())
                .unwrap_or_default(),
        }
    }

    /// True when the label was not one of the canonical tags.
    pub fn is_fallback(&self) -> bool {
        ColumnType::from_canonical(&self.label).is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub columns: Vec<ColumnDef>,
}

impl ColumnSchema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Builds a schema from the raw first element of a fetch payload.
    ///
    /// Returns `None` when the value is not a plain object. Entries whose
    /// label is not a JSON string are treated as having no label.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let map = value.as_object()?;
        let columns = map
            .iter()
            .map(|(name, label)| ColumnDef::from_label(name.clone(), label.as_str()))
            .collect();
        Some(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.get(name).map(|column| column.datatype)
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_lowercases_and_defaults_to_string() {
        assert_eq!(ColumnType::normalize(Some("INTEGER")), ColumnType::Integer);
        assert_eq!(ColumnType::normalize(Some(" DateTime ")), ColumnType::Datetime);
        assert_eq!(ColumnType::normalize(Some("varchar(255)")), ColumnType::String);
        assert_eq!(ColumnType::normalize(None), ColumnType::String);
    }

    #[test]
    fn fallback_label_is_preserved() {
        let column = ColumnDef::from_label("notes", Some("TEXT"));
        assert_eq!(column.datatype, ColumnType::String);
        assert_eq!(column.label, "text");
        assert!(column.is_fallback());
        assert!(!ColumnDef::from_label("n", Some("bigint")).is_fallback());
    }

    #[test]
    fn from_json_keeps_server_order_and_rejects_arrays() {
        let schema = ColumnSchema::from_json(&json!({"zeta": "integer", "alpha": 5}))
            .expect("object schema");
        assert_eq!(schema.names(), vec!["zeta", "alpha"]);
        assert_eq!(schema.column_type("alpha"), Some(ColumnType::String));
        assert!(ColumnSchema::from_json(&json!([{"id": "integer"}])).is_none());
    }
}
