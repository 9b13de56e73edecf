//! Batch input ingestion: tabular files in, raw phone values out.
//!
//! Row order is preserved end to end, including blank cells, so every input
//! row gets a result row. The only decisions made here are which column
//! holds the phone numbers and whether the file is usable at all.

use std::path::Path;

use tracing::{info, warn};

use phonescout_shared::{PhonescoutError, Result};

/// Header names recognized as a phone column, compared after normalization
/// (case folded, separators dropped), so "Phone Number" matches "phone_number".
pub const COLUMN_CANDIDATES: [&str; 6] = [
    "phone",
    "phone_number",
    "phonenumber",
    "number",
    "contact",
    "mobile",
];

/// How the phone column was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSelection {
    /// The caller named the column and it exists in the file.
    Explicit,
    /// A header matched one of [`COLUMN_CANDIDATES`].
    Candidate,
    /// Nothing matched; the first column was used.
    FirstColumnFallback,
}

/// Parsed batch input: the raw values plus where they came from.
#[derive(Debug, Clone)]
pub struct PhoneBatchInput {
    /// Raw phone values in row order. Blank cells stay as empty strings so
    /// the batch reports them instead of silently dropping rows.
    pub phones: Vec<String>,
    /// Header of the column the values were read from.
    pub source_column: String,
    /// How `source_column` was chosen.
    pub selection: ColumnSelection,
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read phone values from a CSV file on disk.
///
/// Legacy spreadsheet uploads (`.xlsx`, `.xls`) are rejected with a hint
/// rather than mis-parsed as text.
pub fn read_phone_file(path: &Path, explicit: Option<&str>) -> Result<PhoneBatchInput> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => {}
        "xlsx" | "xls" => {
            return Err(PhonescoutError::input(format!(
                "unsupported file format .{extension}: export the sheet as CSV first"
            )));
        }
        _ => {
            return Err(PhonescoutError::input(format!(
                "unsupported file format: {}",
                path.display()
            )));
        }
    }

    let bytes = std::fs::read(path).map_err(|e| PhonescoutError::io(path, e))?;
    read_phone_csv(&bytes, explicit)
}

/// Read phone values from in-memory CSV content.
///
/// The first row is treated as headers. Fails on an empty file or a file
/// with no data rows; short rows contribute an empty value.
pub fn read_phone_csv(bytes: &[u8], explicit: Option<&str>) -> Result<PhoneBatchInput> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| PhonescoutError::Csv(e.to_string()))?
        .clone();
    if headers.is_empty() {
        return Err(PhonescoutError::input("file is empty"));
    }
    let header_names: Vec<String> = headers.iter().map(str::to_string).collect();

    let (index, selection) = detect_phone_column(&header_names, explicit);
    let source_column = header_names[index].clone();

    let mut phones = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| PhonescoutError::Csv(e.to_string()))?;
        phones.push(record.get(index).unwrap_or_default().to_string());
    }

    if phones.is_empty() {
        return Err(PhonescoutError::input("file contains no data rows"));
    }

    info!(column = %source_column, rows = phones.len(), "parsed phone column");
    Ok(PhoneBatchInput {
        phones,
        source_column,
        selection,
    })
}

// ---------------------------------------------------------------------------
// Column detection
// ---------------------------------------------------------------------------

/// Pick the phone column: an explicitly requested header when present, else
/// the first candidate match, else the first column with a warning.
pub fn detect_phone_column(
    headers: &[String],
    explicit: Option<&str>,
) -> (usize, ColumnSelection) {
    if headers.is_empty() {
        return (0, ColumnSelection::FirstColumnFallback);
    }

    if let Some(name) = explicit {
        if let Some(index) = headers.iter().position(|h| h == name) {
            return (index, ColumnSelection::Explicit);
        }
        warn!(
            column = name,
            "requested column not present, falling back to auto-detection"
        );
    }

    for (index, header) in headers.iter().enumerate() {
        let normalized = normalize_header(header);
        if COLUMN_CANDIDATES
            .iter()
            .any(|candidate| normalize_header(candidate) == normalized)
        {
            return (index, ColumnSelection::Candidate);
        }
    }

    warn!(
        column = %headers[0],
        "no phone column recognized, using the first column"
    );
    (0, ColumnSelection::FirstColumnFallback)
}

/// Case-fold and drop everything that is not a letter or digit, so
/// "Phone Number", "phone-number", and "PHONE_NUMBER" compare equal.
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}
