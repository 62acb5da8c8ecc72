//! In-memory tabular data for bulk prediction
//!
//! A [`Table`] keeps the caller's columns exactly as uploaded (names, order,
//! cell types) so results can be assembled on a copy of the original data.

pub mod xlsx;

use serde_json::{Map, Number, Value};

pub use xlsx::{is_spreadsheet_filename, read_spreadsheet, write_xlsx};

/// One spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    /// Date/time rendered as ISO-8601 text
    DateTime(String),
}

impl CellValue {
    /// Numeric view of the cell
    ///
    /// Blank cells read as `None`. Numeric text such as `" 42 "` is accepted.
    pub fn as_number(&self) -> Result<Option<f64>, String> {
        match self {
            CellValue::Empty => Ok(None),
            CellValue::Int(v) => Ok(Some(*v as f64)),
            CellValue::Float(v) if v.is_finite() => Ok(Some(*v)),
            CellValue::Float(v) => Err(format!("{} is not a finite number", v)),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                match trimmed.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(Some(v)),
                    _ => Err(format!("'{}' is not a number", s)),
                }
            }
            CellValue::Bool(b) => Err(format!("boolean {} is not a number", b)),
            CellValue::DateTime(s) => Err(format!("date {} is not a number", s)),
        }
    }

    /// Text view of the cell; blank cells read as `None`
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Int(v) => Some(v.to_string()),
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                Some((*v as i64).to_string())
            }
            CellValue::Float(v) => Some(v.to_string()),
            CellValue::Text(s) | CellValue::DateTime(s) => Some(s.clone()),
            CellValue::Bool(b) => Some(b.to_string()),
        }
    }

    /// JSON rendering for result records; blank and non-finite become `null`
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Empty => Value::Null,
            CellValue::Int(v) => Value::from(*v),
            CellValue::Float(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
            CellValue::Text(s) | CellValue::DateTime(s) => Value::String(s.clone()),
            CellValue::Bool(b) => Value::Bool(*b),
        }
    }
}

/// Rectangular table: every row has exactly one cell per column
///
/// Each row remembers the 1-based spreadsheet row it was read from, so error
/// messages can point at the caller's sheet even when blank rows were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    source_rows: Vec<usize>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            source_rows: Vec::new(),
        }
    }

    /// Append a row directly below the previous one (header is row 1)
    pub fn push_row(&mut self, row: Vec<CellValue>) {
        let source_row = self.source_rows.last().map_or(2, |r| r + 1);
        self.push_row_from(source_row, row);
    }

    /// Append a row read from spreadsheet row `source_row`, padding with
    /// blanks (or truncating) to the table width
    pub fn push_row_from(&mut self, source_row: usize, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(row);
        self.source_rows.push(source_row);
    }

    /// Spreadsheet row number of data row `index`
    pub fn source_row(&self, index: usize) -> usize {
        self.source_rows[index]
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy of this table with `name` set to `values` (one per row)
    ///
    /// An existing column of the same name is overwritten in place; otherwise
    /// the column is appended last.
    pub fn with_column(&self, name: &str, values: Vec<CellValue>) -> Table {
        debug_assert_eq!(values.len(), self.rows.len());
        let mut table = self.clone();
        let index = match table.columns.iter().position(|c| c == name) {
            Some(index) => index,
            None => {
                table.columns.push(name.to_string());
                for row in &mut table.rows {
                    row.push(CellValue::Empty);
                }
                table.columns.len() - 1
            }
        };
        for (row, value) in table.rows.iter_mut().zip(values) {
            row[index] = value;
        }
        table
    }

    /// One JSON object per row, keys in column order
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| (name.clone(), cell.to_json()))
                    .collect()
            })
            .collect()
    }
}
