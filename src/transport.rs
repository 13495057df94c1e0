//! File-backed stand-in for the network save transport.

use std::path::PathBuf;

use log::info;
use serde::Serialize;

use crate::{
    data::{Row, rows_to_json},
    io_utils,
    save::{SaveTransport, TransportError},
};

/// Request body of a full-table replace.
#[derive(Debug, Clone, Serialize)]
pub struct BulkReplaceBody {
    pub table_name: String,
    pub data: serde_json::Value,
}

impl BulkReplaceBody {
    pub fn new(table_name: &str, rows: &[Row]) -> Self {
        Self {
            table_name: table_name.to_string(),
            data: rows_to_json(rows),
        }
    }
}

/// Writes each save as a JSON body to `path`, replacing earlier saves.
#[derive(Debug, Clone)]
pub struct FileTransport {
    path: PathBuf,
    saves: usize,
}

impl FileTransport {
    pub fn new(path: PathBuf) -> Self {
        Self { path, saves: 0 }
    }

    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl SaveTransport for FileTransport {
    fn bulk_replace(&mut self, table_name: &str, rows: &[Row]) -> Result<(), TransportError> {
        let body = BulkReplaceBody::new(table_name, rows);
        io_utils::write_json(Some(self.path.as_path()), &body)
            .map_err(|err| TransportError::new(format!("{err:#}")))?;
        self.saves += 1;
        info!(
            "Wrote {} row(s) for '{table_name}' to {:?}",
            rows.len(),
            self.path
        );
        Ok(())
    }
}
