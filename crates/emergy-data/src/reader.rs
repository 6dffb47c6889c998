//! CSV and spreadsheet loading for the emergy calculator.
//!
//! Turns a file on disk into a [`RawTable`]: header names plus loosely typed
//! cells. No schema checks happen here; see [`crate::validator`].

use std::fmt;
use std::io::BufRead;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use emergy_core::error::{EmergyError, Result};
use tracing::debug;

/// Delimiters tried by [`detect_delimiter`], most preferred first.
pub const DELIMITER_CANDIDATES: [u8; 5] = [b',', b'\t', b';', b'|', b':'];

/// Cell text that counts as "no value" during numeric coercion.
const NA_TOKENS: [&str; 19] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null", "",
];

// ── CellValue ─────────────────────────────────────────────────────────────────

/// A single cell as read from the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Coerce to a number.
    ///
    /// * `Ok(None)` – blank cell, NA token, or NaN.
    /// * `Ok(Some(v))` – numeric cell or text that parses as a float.
    /// * `Err(text)` – text that is not a number at all.
    pub fn as_number(&self) -> std::result::Result<Option<f64>, String> {
        match self {
            CellValue::Empty => Ok(None),
            CellValue::Number(v) if v.is_nan() => Ok(None),
            CellValue::Number(v) => Ok(Some(*v)),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if NA_TOKENS.contains(&trimmed) {
                    return Ok(None);
                }
                match trimmed.parse::<f64>() {
                    Ok(v) if v.is_nan() => Ok(None),
                    Ok(v) => Ok(Some(v)),
                    Err(_) => Err(s.clone()),
                }
            }
        }
    }

    /// Text content; blank cells become an empty string.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(v) => write!(f, "{}", v),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

// ── RawTable ──────────────────────────────────────────────────────────────────

/// Header row plus data rows. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Build a table, padding short rows with [`CellValue::Empty`] and
    /// dropping cells beyond the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Position of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Sniff the delimiter from the first line of `path`.
pub fn detect_delimiter(path: &Path) -> Result<u8> {
    let file = std::fs::File::open(path).map_err(|source| EmergyError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut first_line = String::new();
    std::io::BufReader::new(file)
        .read_line(&mut first_line)
        .map_err(|source| EmergyError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

    sniff_delimiter(&first_line).ok_or_else(|| {
        EmergyError::Parse(format!(
            "Could not determine delimiter in {}",
            path.display()
        ))
    })
}

/// Pick the first candidate delimiter that occurs in `sample`.
pub fn sniff_delimiter(sample: &str) -> Option<u8> {
    let sample = sample.trim_end_matches(['\r', '\n']);
    DELIMITER_CANDIDATES
        .iter()
        .copied()
        .find(|d| sample.as_bytes().contains(d))
}

/// Read `path` into a [`RawTable`], dispatching on the file extension.
///
/// `.csv` goes through the CSV reader, `.xls`/`.xlsx` through the
/// spreadsheet reader. Anything else is
/// [`EmergyError::UnsupportedExtension`].
pub fn read_raw_table(path: &Path) -> Result<RawTable> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => {
            let delimiter = detect_delimiter(path)?;
            read_csv(path, delimiter)
        }
        "xls" | "xlsx" => read_spreadsheet(path),
        other => Err(EmergyError::UnsupportedExtension(format!(".{}", other))),
    }
}

/// Read a delimited text file. The first record is the header row.
pub fn read_csv(path: &Path, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        // Blank line. Rows of empty fields (",,,") are kept.
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    debug!(
        "Read {} rows x {} columns from {} (delimiter {:?})",
        rows.len(),
        headers.len(),
        path.display(),
        delimiter as char
    );

    Ok(RawTable::new(headers, rows))
}

/// Read the first worksheet of an `.xls`/`.xlsx` workbook.
pub fn read_spreadsheet(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        EmergyError::Parse(format!("Failed to open workbook {}: {}", path.display(), e))
    })?;

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => {
            return Err(EmergyError::Parse(format!(
                "Failed to read first worksheet of {}: {}",
                path.display(),
                e
            )))
        }
        None => {
            return Err(EmergyError::Parse(format!(
                "Workbook {} has no worksheets",
                path.display()
            )))
        }
    };

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(|c| cell_from_data(c).as_text()).collect(),
        None => {
            return Err(EmergyError::Parse(format!(
                "Worksheet in {} is empty",
                path.display()
            )))
        }
    };

    let rows: Vec<Vec<CellValue>> = rows_iter
        .map(|row| row.iter().map(cell_from_data).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| *c != CellValue::Empty))
        .collect();

    debug!(
        "Read {} rows x {} columns from workbook {}",
        rows.len(),
        headers.len(),
        path.display()
    );

    Ok(RawTable::new(headers, rows))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn csv_error(path: &Path, err: csv::Error) -> EmergyError {
    EmergyError::Parse(format!("Failed to read CSV {}: {}", path.display(), err))
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Float(v) => CellValue::Number(*v),
        Data::Int(v) => CellValue::Number(*v as f64),
        Data::Bool(b) => CellValue::Number(if *b { 1.0 } else { 0.0 }),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
