use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::data::{CellValue, Row};

/// Working copy of a table: the canonical column order plus its rows.
///
/// Every row carries exactly the keys in `columns`, in that order, after any
/// structural operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EditBuffer {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl EditBuffer {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: columns.into_iter().unique().collect(),
            rows: Vec::new(),
        }
    }

    /// Adopts loaded rows, taking the first row's key order and appending keys
    /// first seen later. Keys a row lacks are filled with null.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let columns = rows
            .iter()
            .flat_map(|row| row.keys().cloned())
            .unique()
            .collect::<Vec<_>>();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                columns
                    .iter()
                    .map(|name| (name.clone(), row.swap_remove(name).unwrap_or(CellValue::Null)))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.rows.get(row)?.get(column)
    }

    fn blank_row(&self) -> Row {
        self.columns
            .iter()
            .map(|name| (name.clone(), CellValue::empty()))
            .collect()
    }

    pub fn add_row(&mut self) {
        self.add_rows(1);
    }

    pub fn add_rows(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let template = self.blank_row();
        self.rows.extend(std::iter::repeat_n(template, count));
        debug!("Added {count} row(s); buffer now holds {}", self.rows.len());
    }

    pub fn delete_row(&mut self, index: usize) -> Option<Row> {
        if index >= self.rows.len() {
            warn!("Ignoring delete of row {index}; buffer holds {}", self.rows.len());
            return None;
        }
        Some(self.rows.remove(index))
    }

    pub fn add_column(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.column_index(name).is_some() {
            warn!("Refusing to add column '{name}'");
            return false;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.insert(name.to_string(), CellValue::empty());
        }
        true
    }

    pub fn rename_column(&mut self, old: &str, new: &str) -> bool {
        let new = new.trim();
        let Some(position) = self.column_index(old) else {
            warn!("Cannot rename unknown column '{old}'");
            return false;
        };
        if new.is_empty() || new == old || self.column_index(new).is_some() {
            warn!("Refusing to rename column '{old}' to '{new}'");
            return false;
        }
        self.columns[position] = new.to_string();
        for row in &mut self.rows {
            *row = std::mem::take(row)
                .into_iter()
                .map(|(key, value)| {
                    if key == old {
                        (new.to_string(), value)
                    } else {
                        (key, value)
                    }
                })
                .collect();
        }
        true
    }

    pub fn update_cell(&mut self, row: usize, column: &str, value: CellValue) -> bool {
        if self.column_index(column).is_none() {
            return false;
        }
        match self.rows.get_mut(row) {
            Some(target) => {
                target.insert(column.to_string(), value);
                true
            }
            None => false,
        }
    }
}
