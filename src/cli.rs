use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::validate::InputKind;

#[derive(Debug, Parser)]
#[command(author, version, about = "Validate and reconcile editable table payloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse a fetch payload and report per-row validation results
    Validate(ValidateArgs),
    /// Infer column types for a payload that carries no schema row
    Infer(InferArgs),
    /// Paste delimited text into a loaded table at a target cell
    Paste(PasteArgs),
    /// Replay a recorded list of edit commands against a loaded table
    Replay(ReplayArgs),
    /// Emit the transmit-ready rows for a full-table replace
    PrepareSave(PrepareSaveArgs),
    /// Check a form field value against a character class
    CheckInput(CheckInputArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Fetch payload JSON (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Treat `data` as plain rows and infer the schema
    #[arg(long)]
    pub schemaless: bool,
    /// Engine configuration YAML
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Output format for the parsed rows
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InferArgs {
    /// Payload JSON whose `data` holds plain rows (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination YAML file for the inferred schema (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PasteArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// File holding the pasted text
    #[arg(long = "text")]
    pub text: PathBuf,
    /// Character encoding of the text file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Zero-based target row
    #[arg(long, default_value_t = 0)]
    pub row: usize,
    /// Target column name (defaults to the first column)
    #[arg(long)]
    pub column: Option<String>,
    /// Append the lines as new rows instead of pasting at a cell
    #[arg(long)]
    pub bulk: bool,
    /// Output format for the resulting buffer
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// JSON array of edit commands
    #[arg(long = "commands")]
    pub commands: PathBuf,
    /// File that receives the payload of any `save` command
    #[arg(long = "save-to")]
    pub save_to: Option<PathBuf>,
    /// Stop at the first failing command instead of reporting and continuing
    #[arg(long)]
    pub strict: bool,
    /// Print a diff of uncommitted changes after the last command
    #[arg(long)]
    pub show_changes: bool,
    /// Output format for the final buffer
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PrepareSaveArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Output file for the `{ table_name, data }` body (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CheckInputArgs {
    /// Character class to enforce
    #[arg(long, value_enum)]
    pub kind: InputKind,
    /// Value to check
    pub value: String,
}
