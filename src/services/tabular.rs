//! Tabular file parsing
//!
//! Turns uploaded bytes into a `ParsedTable`. Spreadsheets (`.xlsx`, `.xls`,
//! `.xlsb`, `.ods`) go through calamine, first sheet only; everything else is
//! read as comma-separated text.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::ImportError;
use crate::types::ParsedTable;

const SPREADSHEET_EXTENSIONS: &[&str] = &[".xlsx", ".xls", ".xlsb", ".xlsm", ".ods"];

/// Parse `bytes`, choosing the decoder from the file name
pub fn parse(bytes: &[u8], file_name: &str) -> Result<ParsedTable, ImportError> {
    if is_spreadsheet(file_name) {
        parse_spreadsheet(bytes)
    } else {
        Ok(parse_csv(&decode_text(bytes)))
    }
}

pub fn is_spreadsheet(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    SPREADSHEET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// UTF-8 decode, dropping a leading byte order mark
fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

/// Split CSV text into a table.
///
/// Two states, normal and quoted. A `"` enters or leaves quoted state; `""`
/// inside quotes is a literal quote. In normal state `,` ends a field and
/// `\n`/`\r` end a row; line breaks with nothing accumulated are skipped.
pub fn parse_csv(text: &str) -> ParsedTable {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\n' | '\r' => {
                if !field.is_empty() || !row.is_empty() {
                    row.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut row));
                }
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        records.push(row);
    }

    ParsedTable::from_records(records)
}

/// Decode the first worksheet of a workbook.
///
/// Blank rows inside the sheet are kept so row numbers line up with what the
/// user sees in their spreadsheet.
pub fn parse_spreadsheet(bytes: &[u8]) -> Result<ParsedTable, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ImportError::Format(format!("failed to open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Format("workbook has no sheets".to_string()))?
        .map_err(|e| ImportError::Format(format!("failed to read first sheet: {e}")))?;

    let records: Vec<Vec<String>> = range
        .rows()
        .map(|r| r.iter().map(cell_to_string).collect::<Vec<_>>())
        .collect();

    Ok(ParsedTable::from_records(records))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(v) => v.to_string(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(v) => v.to_string(),
        Data::DateTimeIso(v) => v.to_string(),
        Data::DurationIso(v) => v.to_string(),
        Data::Error(v) => format!("{v:?}"),
        Data::Empty => String::new(),
    }
}
