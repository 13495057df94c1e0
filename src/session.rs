//! One table being edited: its fetch schema, the committed snapshot and the
//! working buffer.
//!
//! Every user event is a `&mut self` call, so structural growth and the cell
//! writes that depend on it land as a single state transition. Events can
//! also be queued as [`EditCommand`]s and applied strictly in order.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use thiserror::Error;

use crate::{
    buffer::EditBuffer,
    config::EngineConfig,
    data::{CellValue, Row},
    paste::{PasteBlock, PasteReport, ReconcileError, apply_block},
    parser::ParsedTable,
    save::{SaveTransport, TransportError, prepare_save},
    schema::ColumnSchema,
    table,
    validate::{FieldError, validate},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error("{column}: {source}")]
    Field {
        column: String,
        #[source]
        source: FieldError,
    },
    #[error("save failed: {0}")]
    Transport(#[from] TransportError),
    #[error("row {row} column '{column}' does not exist")]
    NoSuchCell { row: usize, column: String },
    #[error("a save command needs a transport")]
    NoTransport,
}

/// A user event, in the JSON form the dispatcher records them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditCommand {
    EditCell {
        row: usize,
        column: String,
        value: CellValue,
    },
    Paste {
        text: String,
        row: usize,
        column: String,
    },
    BulkAdd {
        text: String,
    },
    AddRow,
    AddRows {
        count: usize,
    },
    DeleteRow {
        row: usize,
    },
    AddColumn {
        name: String,
    },
    RenameColumn {
        from: String,
        to: String,
    },
    Reset,
    Save,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Edited,
    Pasted(PasteReport),
    RowsAdded { count: usize },
    RowDeleted { removed: bool },
    ColumnChanged { changed: bool },
    Reset,
    Saved { rows: usize },
}

impl CommandOutcome {
    pub fn message(&self) -> String {
        match self {
            CommandOutcome::Edited => "Cell updated.".to_string(),
            CommandOutcome::Pasted(report) => report.summary(),
            CommandOutcome::RowsAdded { count } => format!("Added {count} rows."),
            CommandOutcome::RowDeleted { removed: true } => "Row deleted.".to_string(),
            CommandOutcome::RowDeleted { removed: false } => "No row to delete.".to_string(),
            CommandOutcome::ColumnChanged { changed: true } => "Columns updated.".to_string(),
            CommandOutcome::ColumnChanged { changed: false } => "Column unchanged.".to_string(),
            CommandOutcome::Reset => "Changes discarded.".to_string(),
            CommandOutcome::Saved { rows } => format!("Saved {rows} rows."),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableSession {
    table_name: String,
    schema: Option<ColumnSchema>,
    config: EngineConfig,
    original: EditBuffer,
    working: EditBuffer,
}

impl TableSession {
    pub fn new(table_name: impl Into<String>, rows: Vec<Row>, config: EngineConfig) -> Self {
        let original = EditBuffer::from_rows(rows);
        Self {
            table_name: table_name.into(),
            schema: None,
            config,
            working: original.clone(),
            original,
        }
    }

    pub fn from_parsed(table: ParsedTable, config: EngineConfig) -> Self {
        let mut session = Self::new(table.table_name, table.rows, config);
        session.schema = Some(table.schema);
        session
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn schema(&self) -> Option<&ColumnSchema> {
        self.schema.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.working
    }

    pub fn snapshot(&self) -> &EditBuffer {
        &self.original
    }

    pub fn buffer_mut(&mut self) -> &mut EditBuffer {
        &mut self.working
    }

    pub fn is_dirty(&self) -> bool {
        self.working != self.original
    }

    pub fn reset(&mut self) {
        self.working = self.original.clone();
        debug!("Reset '{}' to its last committed state", self.table_name);
    }

    pub fn commit(&mut self) {
        self.original = self.working.clone();
        debug!("Committed {} row(s) of '{}'", self.original.len(), self.table_name);
    }

    /// Writes one cell, parsing it first when the fetch schema types the column.
    /// A rejected value leaves the buffer unchanged.
    pub fn edit_cell(
        &mut self,
        row: usize,
        column: &str,
        value: CellValue,
    ) -> Result<(), CommandError> {
        let parsed = match self.schema.as_ref().and_then(|s| s.column_type(column)) {
            Some(ty) => validate(&value, &ty).map_err(|source| CommandError::Field {
                column: column.to_string(),
                source,
            })?,
            None => value,
        };
        if self.working.update_cell(row, column, parsed) {
            Ok(())
        } else {
            Err(CommandError::NoSuchCell {
                row,
                column: column.to_string(),
            })
        }
    }

    pub fn paste(
        &mut self,
        text: &str,
        start_row: usize,
        start_column: &str,
    ) -> Result<PasteReport, ReconcileError> {
        let block = PasteBlock::parse(text)?;
        block.ensure_within(self.config.max_paste_lines)?;
        let column_index = self
            .working
            .column_index(start_column)
            .ok_or_else(|| ReconcileError::UnknownColumn(start_column.to_string()))?;
        apply_block(&mut self.working, &block, start_row, column_index)
    }

    /// Appends the text's lines as new rows, first cell in the first column.
    /// Surrounding whitespace of the whole block is dropped first.
    pub fn bulk_add(&mut self, text: &str) -> Result<PasteReport, ReconcileError> {
        let block = PasteBlock::parse(text.trim())?;
        block.ensure_within(self.config.max_paste_lines)?;
        if self.working.columns().is_empty() {
            return Err(ReconcileError::NoColumns);
        }
        let start_row = self.working.len();
        apply_block(&mut self.working, &block, start_row, 0)
    }

    /// Rows as they would be transmitted; the buffer itself is not modified.
    pub fn prepare_save(&self) -> Vec<Row> {
        prepare_save(self.working.rows(), &self.table_name, &self.config)
    }

    /// Transmits the prepared rows and commits only when the transport succeeds.
    pub fn save<T>(&mut self, transport: &mut T) -> Result<usize, TransportError>
    where
        T: SaveTransport + ?Sized,
    {
        let rows = self.prepare_save();
        match transport.bulk_replace(&self.table_name, &rows) {
            Ok(()) => {
                self.commit();
                info!("Saved {} row(s) to '{}'", rows.len(), self.table_name);
                Ok(rows.len())
            }
            Err(err) => {
                warn!("Save of '{}' failed: {err}", self.table_name);
                Err(err)
            }
        }
    }

    pub fn apply(
        &mut self,
        command: EditCommand,
        transport: Option<&mut dyn SaveTransport>,
    ) -> Result<CommandOutcome, CommandError> {
        debug!("Applying {command:?} to '{}'", self.table_name);
        let outcome = match command {
            EditCommand::EditCell { row, column, value } => {
                self.edit_cell(row, &column, value)?;
                CommandOutcome::Edited
            }
            EditCommand::Paste { text, row, column } => {
                CommandOutcome::Pasted(self.paste(&text, row, &column)?)
            }
            EditCommand::BulkAdd { text } => CommandOutcome::Pasted(self.bulk_add(&text)?),
            EditCommand::AddRow => {
                self.working.add_row();
                CommandOutcome::RowsAdded { count: 1 }
            }
            EditCommand::AddRows { count } => {
                self.working.add_rows(count);
                CommandOutcome::RowsAdded { count }
            }
            EditCommand::DeleteRow { row } => CommandOutcome::RowDeleted {
                removed: self.working.delete_row(row).is_some(),
            },
            EditCommand::AddColumn { name } => CommandOutcome::ColumnChanged {
                changed: self.working.add_column(&name),
            },
            EditCommand::RenameColumn { from, to } => CommandOutcome::ColumnChanged {
                changed: self.working.rename_column(&from, &to),
            },
            EditCommand::Reset => {
                self.reset();
                CommandOutcome::Reset
            }
            EditCommand::Save => {
                let transport = transport.ok_or(CommandError::NoTransport)?;
                CommandOutcome::Saved {
                    rows: self.save(transport)?,
                }
            }
        };
        Ok(outcome)
    }

    /// Unified diff of the committed snapshot against the working buffer.
    pub fn changes_preview(&self) -> String {
        if !self.is_dirty() {
            return String::new();
        }
        let before = render(&self.original);
        let after = render(&self.working);
        TextDiff::from_lines(&before, &after)
            .unified_diff()
            .context_radius(1)
            .header("committed", "working")
            .to_string()
    }
}

fn render(buffer: &EditBuffer) -> String {
    let rows = buffer
        .rows()
        .iter()
        .map(|row| row.values().map(CellValue::as_display).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    table::render_table(buffer.columns(), &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::row_from_json, parser::parse_rows};
    use serde_json::json;

    #[derive(Default)]
    struct RecordingTransport {
        fail: bool,
        sent: Vec<(String, Vec<Row>)>,
    }

    impl SaveTransport for RecordingTransport {
        fn bulk_replace(&mut self, table_name: &str, rows: &[Row]) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::new("server unavailable"));
            }
            self.sent.push((table_name.to_string(), rows.to_vec()));
            Ok(())
        }
    }

    fn products() -> TableSession {
        let table = parse_rows(&[
            json!({"id": "integer", "name": "string", "price": "float"}),
            json!({"id": 1, "name": "pen", "price": "1.5"}),
            json!({"id": 2, "name": "ink", "price": 3}),
        ])
        .expect("parsed");
        let mut table = table;
        table.table_name = "products".to_string();
        TableSession::from_parsed(table, EngineConfig::default())
    }

    #[test]
    fn reset_restores_last_commit() {
        let mut session = products();
        session.buffer_mut().add_column("stock");
        session.commit();
        let committed = session.buffer().clone();
        session.buffer_mut().delete_row(0);
        session.buffer_mut().rename_column("name", "title");
        assert!(session.is_dirty());
        session.reset();
        assert_eq!(session.buffer(), &committed);
        assert!(!session.is_dirty());
    }

    #[test]
    fn edit_cell_validates_schema_columns() {
        let mut session = products();
        session.edit_cell(0, "price", "2.25".into()).expect("float accepted");
        assert_eq!(session.buffer().get(0, "price"), Some(&CellValue::Float(2.25)));
        let err = session.edit_cell(0, "id", "x1".into()).expect_err("rejected");
        assert_eq!(err.to_string(), "id: expected integer, got string");
        assert_eq!(session.buffer().get(0, "id"), Some(&CellValue::Integer(1)));
        assert!(matches!(
            session.edit_cell(7, "name", "x".into()),
            Err(CommandError::NoSuchCell { row: 7, .. })
        ));
    }

    #[test]
    fn paste_into_unknown_column_leaves_buffer_alone() {
        let mut session = products();
        let before = session.buffer().clone();
        assert_eq!(
            session.paste("1,2", 0, "ghost"),
            Err(ReconcileError::UnknownColumn("ghost".to_string()))
        );
        assert_eq!(session.buffer(), &before);
    }

    #[test]
    fn paste_command_far_below_the_table_is_refused() {
        let mut session = products();
        let command = EditCommand::Paste {
            text: "x".to_string(),
            row: usize::MAX,
            column: "name".to_string(),
        };
        assert_eq!(
            session.apply(command, None),
            Err(CommandError::Reconcile(ReconcileError::RowOutOfRange {
                row: usize::MAX,
                rows: 2
            }))
        );
        assert_eq!(
            session.paste("x", usize::MAX / 2, "name"),
            Err(ReconcileError::RowOutOfRange {
                row: usize::MAX / 2,
                rows: 2
            })
        );
        assert_eq!(session.buffer().len(), 2);
        assert!(!session.is_dirty());
    }

    #[test]
    fn bulk_add_trims_the_whole_block() {
        let mut session = TableSession::new(
            "notes",
            vec![row_from_json(&json!({"a": "x", "b": "y"})).unwrap()],
            EngineConfig::default(),
        );
        let report = session.bulk_add("\tA\tB\nC\n\n").expect("bulk add");
        assert_eq!(report.truncated, 0);
        assert_eq!(session.buffer().get(1, "a"), Some(&CellValue::from("A")));
        assert_eq!(session.buffer().get(1, "b"), Some(&CellValue::from("B")));
        assert_eq!(session.buffer().get(2, "a"), Some(&CellValue::from("C")));
    }

    #[test]
    fn bulk_add_respects_cap_without_side_effects() {
        let mut config = EngineConfig::default();
        config.max_paste_lines = Some(2);
        let mut session = TableSession::new(
            "notes",
            vec![row_from_json(&json!({"a": "x", "b": "y"})).unwrap()],
            config,
        );
        assert_eq!(
            session.bulk_add("1\n2\n3"),
            Err(ReconcileError::TooManyLines { lines: 3, max: 2 })
        );
        assert_eq!(session.buffer().len(), 1);

        let report = session.bulk_add("p\tq\nr").expect("bulk add");
        assert_eq!(report.rows_added, 2);
        assert_eq!(session.buffer().get(1, "b"), Some(&CellValue::from("q")));
        assert_eq!(session.buffer().get(2, "b"), Some(&CellValue::empty()));
    }

    #[test]
    fn failed_save_keeps_edits_uncommitted() {
        let mut session = products();
        session.buffer_mut().add_row();
        let mut transport = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        assert!(session.save(&mut transport).is_err());
        assert!(session.is_dirty());
        assert_eq!(session.buffer().len(), 3);

        transport.fail = false;
        assert_eq!(session.save(&mut transport), Ok(3));
        assert!(!session.is_dirty());
        let (table, rows) = &transport.sent[0];
        assert_eq!(table, "products");
        assert_eq!(rows[2]["id"], CellValue::Integer(3));
        assert_eq!(session.buffer().get(2, "id"), Some(&CellValue::empty()));
    }

    #[test]
    fn commands_apply_in_order() {
        let mut session = products();
        let commands: Vec<EditCommand> = serde_json::from_value(json!([
            {"op": "add_column", "name": "stock"},
            {"op": "paste", "text": "9\t10\n11", "row": 1, "column": "price"},
            {"op": "rename_column", "from": "stock", "to": "qty"},
            {"op": "delete_row", "row": 0}
        ]))
        .expect("commands");
        let outcomes = commands
            .into_iter()
            .map(|command| session.apply(command, None))
            .collect::<Result<Vec<_>, _>>()
            .expect("applied");
        assert_eq!(
            outcomes[1],
            CommandOutcome::Pasted(PasteReport {
                applied: 3,
                lines: 2,
                truncated: 0,
                rows_added: 1,
            })
        );
        assert_eq!(session.buffer().columns(), ["id", "name", "price", "qty"]);
        assert_eq!(session.buffer().get(0, "qty"), Some(&CellValue::from("10")));
        assert_eq!(session.buffer().get(1, "price"), Some(&CellValue::from("11")));
        assert_eq!(
            session.apply(EditCommand::Save, None),
            Err(CommandError::NoTransport)
        );
    }

    #[test]
    fn preview_lists_changed_rows() {
        let mut session = products();
        assert!(session.changes_preview().is_empty());
        session.edit_cell(1, "name", "quill".into()).expect("edit");
        let preview = session.changes_preview();
        assert!(preview.contains("-2   ink"));
        assert!(preview.contains("+2   quill"));
    }
}
