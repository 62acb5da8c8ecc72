//! Spreadsheet reading (xlsx/xls via calamine) and writing (xlsx)

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Workbook, XlsxError};
use tracing::debug;

use super::{CellValue, Table};
use crate::error::PredictError;

/// Accepted upload extensions
const SPREADSHEET_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

/// True when `filename` carries a spreadsheet extension (ASCII case-insensitive)
pub fn is_spreadsheet_filename(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    SPREADSHEET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Parse the first worksheet of an xlsx/xls payload
///
/// The first non-blank row is the header. Fully blank data rows are skipped.
/// Unreadable bytes fail with `MalformedInput`; a workbook without data rows
/// fails with `EmptyTable`.
pub fn read_spreadsheet(bytes: &[u8]) -> Result<Table, PredictError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| PredictError::MalformedInput(format!("cannot read spreadsheet: {}", e)))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => {
            return Err(PredictError::MalformedInput(format!(
                "cannot read first worksheet: {}",
                e
            )))
        }
        None => {
            return Err(PredictError::EmptyTable(
                "workbook contains no worksheets".to_string(),
            ))
        }
    };

    // Range coordinates are 0-based and start at the first used cell
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let mut rows = range
        .rows()
        .enumerate()
        .filter(|(_, row)| !row.iter().all(is_blank))
        .map(|(offset, row)| (first_row + offset + 1, row));
    let (_, header) = rows.next().ok_or_else(|| {
        PredictError::EmptyTable("first worksheet contains no data".to_string())
    })?;

    let mut table = Table::new(header_names(header));
    for (sheet_row, row) in rows {
        table.push_row_from(sheet_row, row.iter().map(convert_cell).collect());
    }

    if table.is_empty() {
        return Err(PredictError::EmptyTable(
            "worksheet has a header row but no data rows".to_string(),
        ));
    }

    debug!(
        "Parsed spreadsheet: {} rows x {} columns",
        table.len(),
        table.columns().len()
    );
    Ok(table)
}

/// Header cells as unique column names
///
/// Blank headers become `Unnamed: <index>`; repeated names get `.1`, `.2`, ...
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let base = convert_cell(cell)
                .as_text()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| format!("Unnamed: {}", index));
            let mut name = base.clone();
            let mut suffix = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(v) => CellValue::Int(*v),
        Data::Float(v) => CellValue::Float(*v),
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::DateTime(value.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::DateTime(s.clone()),
    }
}

/// Write a table to an xlsx file: header row, then one row per record
pub fn write_xlsx(table: &Table, path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }

    for (index, row) in table.rows().iter().enumerate() {
        let r = (index + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let c = col as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Int(v) => {
                    worksheet.write_number(r, c, *v as f64)?;
                }
                CellValue::Float(v) => {
                    worksheet.write_number(r, c, *v)?;
                }
                CellValue::Text(s) | CellValue::DateTime(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
            }
        }
    }

    workbook.save(path)
}
