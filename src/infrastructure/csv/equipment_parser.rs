// ============================================================
// EQUIPMENT CSV PARSER
// ============================================================
// Decode uploaded bytes, validate the header contract, type each cell

use std::borrow::Cow;

use csv::{ReaderBuilder, StringRecord, Trim};
use encoding_rs::{Encoding, UTF_8};

use crate::domain::equipment::{CellValue, EquipmentRow, NUMERIC_COLUMNS, REQUIRED_COLUMNS};
use crate::domain::error::{AppError, Result};

/// Header and typed rows of a validated upload.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    /// Normalised header names, in file order.
    pub columns: Vec<String>,

    /// Data rows, in file order.
    pub rows: Vec<EquipmentRow>,
}

/// Row-oriented parser for equipment CSV uploads
pub struct EquipmentCsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for EquipmentCsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl EquipmentCsvParser {
    /// Create a new parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse raw upload bytes into typed rows.
    ///
    /// Structural problems (undecodable bytes, no header, ragged rows with
    /// extra fields) are `ParseError`s. A header lacking any required column
    /// is `MissingColumns`. Numeric cells that do not parse become null.
    pub fn parse(&self, content: &[u8]) -> Result<ParsedTable> {
        let text = decode_content(content)?;

        if text.trim().is_empty() {
            return Err(AppError::ParseError(
                "No columns to parse from file".to_string(),
            ));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::None)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .clone();
        let columns = normalize_headers(&headers);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", rows.len() + 1, e))
            })?;

            if is_blank(&record) {
                continue;
            }

            if record.len() > columns.len() {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                return Err(AppError::ParseError(format!(
                    "Expected {} fields in line {}, saw {}",
                    columns.len(),
                    line,
                    record.len()
                )));
            }

            rows.push(self.parse_row(&columns, &record));
        }

        validate_columns(&columns)?;

        Ok(ParsedTable { columns, rows })
    }

    /// Parse a single CSV row, padding short rows with null
    fn parse_row(&self, columns: &[String], record: &StringRecord) -> EquipmentRow {
        let mut row = EquipmentRow::with_capacity(columns.len());

        for (idx, column) in columns.iter().enumerate() {
            row.insert(column.as_str(), coerce_cell(column, record.get(idx)));
        }

        row
    }
}

/// Decode bytes as UTF-8, honouring (and dropping) a byte-order mark.
fn decode_content(content: &[u8]) -> Result<Cow<'_, str>> {
    let (encoding, bom_length): (&'static Encoding, usize) =
        Encoding::for_bom(content).unwrap_or((UTF_8, 0));

    encoding
        .decode_without_bom_handling_and_without_replacement(&content[bom_length..])
        .ok_or_else(|| {
            AppError::ParseError(format!("File is not valid {} text", encoding.name()))
        })
}

/// Trim header names, name blank ones `Unnamed: <idx>` and suffix repeats
/// with `.1`, `.2`, ...
fn normalize_headers(headers: &StringRecord) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(headers.len());

    for (idx, header) in headers.iter().enumerate() {
        let trimmed = header.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            trimmed.to_string()
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while columns.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        columns.push(name);
    }

    columns
}

fn validate_columns(columns: &[String]) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !columns.iter().any(|c| c == required))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::missing_columns(&missing, &REQUIRED_COLUMNS))
    }
}

fn coerce_cell(column: &str, raw: Option<&str>) -> CellValue {
    let raw = match raw {
        Some(value) if !value.is_empty() => value,
        _ => return CellValue::Null,
    };

    if NUMERIC_COLUMNS.contains(&column) {
        raw.trim()
            .parse::<f64>()
            .map(CellValue::number)
            .unwrap_or(CellValue::Null)
    } else {
        CellValue::Text(raw.to_string())
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.len() <= 1 && record.iter().all(|field| field.trim().is_empty())
}
