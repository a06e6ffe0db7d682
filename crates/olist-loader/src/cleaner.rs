//! Raw-to-typed cleaning stage
//!
//! Applied per dataset, in this order:
//!
//! 1. project to the declared columns, in declared order
//! 2. blank cells become null
//! 3. CR and LF in free-text columns become spaces
//! 4. numeric columns are parsed, unparsable values become null
//! 5. temporal columns are parsed, unparsable values become null
//! 6. non-finite numbers become null
//!
//! Only step 1 can fail.

use tracing::debug;

use crate::coerce::{self, Number};
use crate::error::{EntryError, Result};
use crate::schema::{ColumnKind, DatasetSpec};
use crate::table::{CellValue, CleanTable, Column, RawTable};

/// Turn a [`RawTable`] into a [`CleanTable`] shaped by `spec`
pub fn clean(raw: RawTable, spec: &DatasetSpec) -> Result<CleanTable> {
    let indices = project(&raw.headers, spec)?;

    let columns: Vec<Column> = spec
        .columns
        .iter()
        .map(|name| Column {
            name: (*name).to_string(),
            kind: spec.kind_of(name),
        })
        .collect();

    let mut nulled = vec![0usize; columns.len()];
    let mut rows = Vec::with_capacity(raw.rows.len());

    for mut raw_row in raw.rows {
        let row: Vec<CellValue> = indices
            .iter()
            .zip(&columns)
            .zip(nulled.iter_mut())
            .map(|((&idx, column), nulled)| {
                let cell = normalize_blank(raw_row.get_mut(idx).and_then(std::mem::take));
                let had_text = cell.is_some();
                let value = clean_cell(cell, column.kind);
                if had_text && value.is_null() {
                    *nulled += 1;
                }
                value
            })
            .collect();
        rows.push(row);
    }

    for (column, count) in columns.iter().zip(&nulled) {
        if *count > 0 {
            debug!(
                table = spec.name,
                column = %column.name,
                count,
                "Unparsable values set to null"
            );
        }
    }

    Ok(CleanTable::from_parts(columns, rows))
}

/// Header position of every declared column
fn project(headers: &[String], spec: &DatasetSpec) -> Result<Vec<usize>> {
    let mut indices = Vec::with_capacity(spec.columns.len());
    let mut missing = Vec::new();

    for column in spec.columns {
        match headers.iter().position(|h| h.trim() == *column) {
            Some(idx) => indices.push(idx),
            None => missing.push((*column).to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(EntryError::MissingColumn {
            dataset: spec.name.to_string(),
            columns: missing,
        });
    }

    Ok(indices)
}

fn clean_cell(cell: Option<String>, kind: ColumnKind) -> CellValue {
    let value = match normalize_blank(cell) {
        None => return CellValue::Null,
        Some(text) => text,
    };

    let value = match kind {
        ColumnKind::Text => CellValue::Text(value),
        ColumnKind::FreeText => CellValue::Text(sanitize_free_text(value)),
        ColumnKind::Numeric => coerce_numeric(&value),
        ColumnKind::Temporal => coerce_temporal(&value),
    };

    normalize_null(value)
}

fn normalize_blank(cell: Option<String>) -> Option<String> {
    cell.filter(|s| !s.is_empty())
}

fn sanitize_free_text(text: String) -> String {
    if text.contains(['\r', '\n']) {
        text.replace(['\r', '\n'], " ")
    } else {
        text
    }
}

fn coerce_numeric(text: &str) -> CellValue {
    match coerce::parse_number(text) {
        Some(Number::Integer(i)) => CellValue::Integer(i),
        Some(Number::Float(f)) => CellValue::Float(f),
        None => CellValue::Null,
    }
}

fn coerce_temporal(text: &str) -> CellValue {
    coerce::parse_timestamp(text).map_or(CellValue::Null, CellValue::Timestamp)
}

fn normalize_null(value: CellValue) -> CellValue {
    match value {
        CellValue::Float(f) if !f.is_finite() => CellValue::Null,
        other => other,
    }
}
