//! File and stream helpers for the command-line front end.
//!
//! The `-` path means stdin for inputs and stdout for outputs. Pasted text
//! files may use any encoding `encoding_rs` knows; JSON payloads are always
//! UTF-8.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::buffer::EditBuffer;

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if is_dash(path) {
        io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("Opening input file {path:?}"))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    Ok(bytes)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn read_text(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let bytes = read_bytes(path)?;
    decode_bytes(&bytes, encoding).with_context(|| format!("Decoding {path:?}"))
}

pub fn read_json(path: &Path) -> Result<JsonValue> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).with_context(|| format!("Parsing JSON from {path:?}"))
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout()),
    })
}

pub fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let mut writer = open_output(path)?;
    serde_json::to_writer_pretty(&mut writer, value).context("Writing JSON output")?;
    writeln!(writer).context("Writing JSON output")?;
    writer.flush().context("Flushing JSON output")
}

/// Exports the buffer as CSV with every field quoted; nulls become empty fields.
pub fn write_csv(path: Option<&Path>, buffer: &EditBuffer) -> Result<()> {
    let mut builder = csv::WriterBuilder::new();
    builder.quote_style(QuoteStyle::Always).double_quote(true);
    let mut writer = builder.from_writer(open_output(path)?);
    writer
        .write_record(buffer.columns())
        .context("Writing CSV headers")?;
    for (idx, row) in buffer.rows().iter().enumerate() {
        writer
            .write_record(row.values().map(|cell| cell.as_display()))
            .with_context(|| format!("Writing CSV row {}", idx + 1))?;
    }
    writer.flush().context("Flushing CSV output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::row_from_json;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn decodes_legacy_encodings() {
        let encoding = resolve_encoding(Some("windows-1252")).expect("known label");
        assert_eq!(decode_bytes(b"caf\xe9", encoding).unwrap(), "café");
        assert!(resolve_encoding(Some("klingon")).is_err());
    }

    #[test]
    fn csv_export_quotes_every_field() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("out.csv");
        let buffer = EditBuffer::from_rows(vec![
            row_from_json(&json!({"id": 1, "note": null})).unwrap(),
        ]);
        write_csv(Some(path.as_path()), &buffer).expect("write csv");
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "\"id\",\"note\"\n\"1\",\"\"\n");
    }
}
