//! Source file reading with encoding fallback
//!
//! Files are decoded as UTF-8 first; when that fails the bytes are decoded as
//! ISO-8859-1, one byte per code point. Every cell comes back as text; no
//! blank or type handling happens here.

use std::borrow::Cow;
use std::path::Path;

use encoding_rs::UTF_8;
use tracing::debug;

use crate::error::{EntryError, Result};
use crate::table::RawTable;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encoding a source file was decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Latin1,
}

impl SourceEncoding {
    pub const PRIMARY: SourceEncoding = SourceEncoding::Utf8;
    pub const FALLBACK: SourceEncoding = SourceEncoding::Latin1;

    pub fn as_str(self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Latin1 => "latin1",
        }
    }

    /// Strict decode; `None` on any malformed sequence. Latin-1 never fails.
    fn decode(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        match self {
            SourceEncoding::Utf8 => UTF_8.decode_without_bom_handling_and_without_replacement(
                bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes),
            ),
            SourceEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes)),
        }
    }
}

impl std::fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode raw bytes, primary encoding first
pub fn decode(bytes: &[u8]) -> Option<(Cow<'_, str>, SourceEncoding)> {
    [SourceEncoding::PRIMARY, SourceEncoding::FALLBACK]
        .into_iter()
        .find_map(|enc| enc.decode(bytes).map(|text| (text, enc)))
}

/// Read a comma-delimited file with a header row into a [`RawTable`]
pub fn read(path: &Path) -> Result<(RawTable, SourceEncoding)> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EntryError::SourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            EntryError::MalformedSource {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
    })?;

    let (text, encoding) = decode(&bytes).ok_or_else(|| EntryError::Decode {
        path: path.to_path_buf(),
        primary: SourceEncoding::PRIMARY.as_str(),
        fallback: SourceEncoding::FALLBACK.as_str(),
    })?;

    if encoding != SourceEncoding::PRIMARY {
        debug!(file = %path.display(), %encoding, "Primary decode failed, used fallback");
    }

    let table = parse_csv(&text).map_err(|reason| EntryError::MalformedSource {
        path: path.to_path_buf(),
        reason,
    })?;

    Ok((table, encoding))
}

/// Parse decoded CSV text.
///
/// Short records are padded with `None`; long records are rejected.
fn parse_csv(text: &str) -> std::result::Result<RawTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err("no header row".to_string());
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() > headers.len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(format!(
                "line {} has {} fields, header has {}",
                line,
                record.len(),
                headers.len()
            ));
        }
        let mut row: Vec<Option<String>> = record.iter().map(|f| Some(f.to_string())).collect();
        row.resize(headers.len(), None);
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}
