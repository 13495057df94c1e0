//! Column type inference for sources that ship no schema.
//!
//! Columns come from the first row. Each candidate type is probed with the
//! validator's own acceptance rules; the first candidate that accepts every
//! non-blank value in the column wins. A column whose values were all blank
//! stays `integer`, and anything with a decimal point ends up `string`.

use log::debug;

use crate::{
    data::{CellValue, Row},
    schema::{ColumnDef, ColumnSchema, ColumnType},
    validate::accepts,
};

const PROBE_ORDER: &[ColumnType] = &[
    ColumnType::Integer,
    ColumnType::Boolean,
    ColumnType::Date,
    ColumnType::Datetime,
    ColumnType::Json,
];

#[derive(Debug, Clone)]
struct TypeCandidate {
    non_blank: usize,
    matches: [usize; PROBE_ORDER.len()],
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            non_blank: 0,
            matches: [0; PROBE_ORDER.len()],
        }
    }

    fn update(&mut self, value: &CellValue) {
        if value.is_blank() {
            return;
        }
        self.non_blank += 1;
        for (slot, ty) in PROBE_ORDER.iter().enumerate() {
            if sniff(value, ty) {
                self.matches[slot] += 1;
            }
        }
    }

    fn decide(&self) -> ColumnType {
        PROBE_ORDER
            .iter()
            .zip(self.matches)
            .find(|(_, count)| *count == self.non_blank)
            .map(|(ty, _)| *ty)
            .unwrap_or(ColumnType::String)
    }
}

fn sniff(value: &CellValue, ty: &ColumnType) -> bool {
    match ty {
        // Strings always parse as something under `json`; only structured values count.
        ColumnType::Json => matches!(value, CellValue::Json(inner) if inner.is_array() || inner.is_object()),
        _ => accepts(value, ty),
    }
}

pub fn infer_column_type(rows: &[Row], column: &str) -> ColumnType {
    let mut candidate = TypeCandidate::new();
    for row in rows {
        candidate.update(row.get(column).unwrap_or(&CellValue::Null));
    }
    candidate.decide()
}

pub fn infer_schema(rows: &[Row]) -> ColumnSchema {
    let Some(first) = rows.first() else {
        return ColumnSchema::default();
    };
    let columns = first
        .keys()
        .map(|name| {
            let datatype = infer_column_type(rows, name);
            debug!("Inferred column '{name}' as {datatype}");
            ColumnDef::new(name.clone(), datatype)
        })
        .collect();
    ColumnSchema::new(columns)
}
