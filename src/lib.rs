pub mod buffer;
pub mod cli;
pub mod config;
pub mod data;
pub mod infer;
pub mod io_utils;
pub mod parser;
pub mod paste;
pub mod save;
pub mod schema;
pub mod session;
pub mod table;
pub mod transport;
pub mod validate;

use std::{env, io::Write, path::Path, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, error, info, warn};

use crate::{
    buffer::EditBuffer,
    cli::{Cli, Commands, OutputFormat, SourceArgs},
    config::EngineConfig,
    parser::{FetchEnvelope, ParsedTable},
    session::{EditCommand, TableSession},
    transport::{BulkReplaceBody, FileTransport},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("grid_reconcile", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(args) => handle_validate(&args),
        Commands::Infer(args) => handle_infer(&args),
        Commands::Paste(args) => handle_paste(&args),
        Commands::Replay(args) => handle_replay(&args),
        Commands::PrepareSave(args) => handle_prepare_save(&args),
        Commands::CheckInput(args) => handle_check_input(&args),
    }
}

/// Reads and parses a payload. A shape error empties the table instead of
/// aborting, matching how a failed fetch renders.
pub fn load_table(input: &Path, schemaless: bool) -> Result<ParsedTable> {
    let raw = io_utils::read_json(input)?;
    let parsed = FetchEnvelope::from_json(raw).and_then(|envelope| {
        if schemaless {
            parser::parse_schemaless_response(&envelope)
        } else {
            parser::parse_response(&envelope)
        }
    });
    Ok(parsed.unwrap_or_else(|err| {
        error!("Discarding payload from {input:?}: {err}");
        ParsedTable::default()
    }))
}

fn load_session(source: &SourceArgs) -> Result<TableSession> {
    let config = EngineConfig::load_or_default(source.config.as_deref())?;
    let table = load_table(&source.input, source.schemaless)?;
    info!(
        "Loaded '{}' with {} row(s) across {} column(s)",
        table.table_name,
        table.rows.len(),
        table.schema.len()
    );
    Ok(TableSession::from_parsed(table, config))
}

fn emit_buffer(session: &TableSession, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let buffer = session.buffer();
    match format {
        OutputFormat::Table => {
            let rendered = table::render_rows(buffer.columns(), buffer.rows());
            write_text(output, &rendered)
        }
        OutputFormat::Json => io_utils::write_json(output, &data::rows_to_json(buffer.rows())),
        OutputFormat::Csv => io_utils::write_csv(output, buffer),
    }
}

fn write_text(output: Option<&Path>, text: &str) -> Result<()> {
    let mut writer = io_utils::open_output(output)?;
    writer.write_all(text.as_bytes()).context("Writing output")?;
    writer.flush().context("Flushing output")
}

fn handle_validate(args: &cli::ValidateArgs) -> Result<()> {
    let table = load_table(&args.source.input, args.source.schemaless)?;
    let output = args.output.as_deref();
    match args.format {
        OutputFormat::Json => io_utils::write_json(output, &table)?,
        OutputFormat::Csv => {
            io_utils::write_csv(output, &EditBuffer::from_rows(table.rows.clone()))?
        }
        OutputFormat::Table => {
            let columns = table
                .rows
                .first()
                .map(|row| row.keys().cloned().collect::<Vec<_>>())
                .unwrap_or_else(|| table.schema.names());
            let mut rendered = table::render_rows(&columns, &table.rows);
            rendered.push_str(&table::render_report(&table.report));
            write_text(output, &rendered)?;
        }
    }
    info!(
        "Validated {} row(s) of '{}': {} invalid",
        table.report.len(),
        table.table_name,
        table.invalid_count()
    );
    Ok(())
}

fn handle_infer(args: &cli::InferArgs) -> Result<()> {
    let table = load_table(&args.input, true)?;
    let yaml = serde_yaml::to_string(&table.schema).context("Serializing inferred schema")?;
    write_text(args.output.as_deref(), &yaml)?;
    info!(
        "Inferred {} column type(s) for '{}'",
        table.schema.len(),
        table.table_name
    );
    Ok(())
}

fn handle_paste(args: &cli::PasteArgs) -> Result<()> {
    let mut session = load_session(&args.source)?;
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let text = io_utils::read_text(&args.text, encoding)?;
    if args.bulk {
        session.bulk_add(&text)?;
    } else {
        let column = match &args.column {
            Some(column) => column.clone(),
            None => session
                .buffer()
                .columns()
                .first()
                .cloned()
                .context("Table has no columns to paste into")?,
        };
        session.paste(&text, args.row, &column)?;
    }
    emit_buffer(&session, args.format, args.output.as_deref())
}

fn handle_replay(args: &cli::ReplayArgs) -> Result<()> {
    let mut session = load_session(&args.source)?;
    let raw = io_utils::read_json(&args.commands)?;
    let commands: Vec<EditCommand> = serde_json::from_value(raw)
        .with_context(|| format!("Parsing edit commands from {:?}", args.commands))?;
    let mut transport = args.save_to.clone().map(FileTransport::new);

    let mut failures = 0usize;
    for (idx, command) in commands.into_iter().enumerate() {
        let sink = transport
            .as_mut()
            .map(|t| t as &mut dyn save::SaveTransport);
        match session.apply(command, sink) {
            Ok(outcome) => info!("Command {}: {}", idx + 1, outcome.message()),
            Err(err) if args.strict => {
                bail!("Command {} failed: {err}", idx + 1);
            }
            Err(err) => {
                failures += 1;
                warn!("Command {} failed: {err}", idx + 1);
            }
        }
    }
    if failures > 0 {
        warn!("{failures} command(s) failed");
    }
    if args.show_changes {
        let preview = session.changes_preview();
        if preview.is_empty() {
            eprintln!("No uncommitted changes.");
        } else {
            eprint!("{preview}");
        }
    }
    emit_buffer(&session, args.format, args.output.as_deref())
}

fn handle_prepare_save(args: &cli::PrepareSaveArgs) -> Result<()> {
    let session = load_session(&args.source)?;
    let rows = session.prepare_save();
    let body = BulkReplaceBody::new(session.table_name(), &rows);
    io_utils::write_json(args.output.as_deref(), &body)?;
    info!(
        "Prepared {} row(s) for '{}'",
        rows.len(),
        session.table_name()
    );
    Ok(())
}

fn handle_check_input(args: &cli::CheckInputArgs) -> Result<()> {
    if validate::validate_input(&args.value, args.kind) {
        println!("valid");
        Ok(())
    } else {
        bail!("'{}' is not valid {:?} input", args.value, args.kind)
    }
}
