//! Farmer record store.
//!
//! Loads the soil/land record CSV once at startup and answers point lookups
//! by a normalized RTC identifier. RTC numbers are human-entered and arrive
//! in inconsistent shapes (`"123/ABC-45"`, `"123 abc 45"`, ...), so both the
//! stored keys and the query are reduced to lowercase alphanumerics before
//! comparison.
//!
//! # Column Schema
//!
//! Each column is classified once at load time by inspecting every non-empty
//! cell:
//!
//! | Classification | Rule |
//! |----------------|------|
//! | `Integer` | every non-empty cell parses as `i64` |
//! | `Float` | every non-empty cell parses as `f64` |
//! | `Text` | everything else |
//!
//! Cells are converted into [`CellValue`]s at load; empty cells become
//! `Null`. Lookup responses are serialized from the typed values, so a
//! numeric column is always a JSON number and a missing cell is always JSON
//! `null` — there is no per-request coercion.
//!
//! Duplicate normalized keys are permitted: lookup returns the first row in
//! file order, and duplicates are reported with a warning at load time.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::error::PortalError;

/// The identifier column every record file must carry.
pub const RTC_COLUMN: &str = "rtc_number";

/// Reduce an RTC identifier to its comparable form: strip every character
/// outside `[A-Za-z0-9]`, lowercase the rest. Idempotent.
pub fn normalize_rtc(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Declared type of a CSV column, established once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
}

/// A typed cell value ready for wire serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// The JSON wire representation: numbers as numbers, empty cells as null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Integer(n) => serde_json::Value::from(*n),
            CellValue::Float(f) => serde_json::Value::from(*f),
            CellValue::Text(s) => serde_json::Value::from(s.clone()),
        }
    }
}

/// A named column with its declared type.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

/// One loaded row: the derived lookup key plus typed cells in column order.
///
/// The normalized key is bookkeeping, not data. It lives beside the cells
/// rather than as a column, so it can never leak into a response.
#[derive(Debug, Clone)]
struct StoredRow {
    key: String,
    cells: Vec<CellValue>,
}

/// Read-only table of farmer records, loaded once at process start.
#[derive(Debug)]
pub struct RecordStore {
    columns: Vec<Column>,
    rows: Vec<StoredRow>,
}

impl RecordStore {
    /// Load the record CSV, classify columns, and derive lookup keys.
    ///
    /// Fails if the file cannot be read, is not valid CSV, or lacks the
    /// `rtc_number` column. The caller degrades (lookups report
    /// `DataUnavailable`) rather than aborting the process.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to read farmer data file: {}", path.display()))?;

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let rtc_index = match headers.iter().position(|h| h == RTC_COLUMN) {
            Some(i) => i,
            None => bail!("Column '{}' not found in farmer data file", RTC_COLUMN),
        };

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record.context("Failed to read CSV record")?;
            raw_rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        let columns: Vec<Column> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| Column {
                name: name.clone(),
                ty: classify_column(&raw_rows, i),
            })
            .collect();

        let mut rows = Vec::with_capacity(raw_rows.len());
        for raw in &raw_rows {
            let key = normalize_rtc(raw.get(rtc_index).map(String::as_str).unwrap_or(""));
            let cells = columns
                .iter()
                .enumerate()
                .map(|(i, col)| convert_cell(raw.get(i).map(String::as_str).unwrap_or(""), col.ty))
                .collect();
            rows.push(StoredRow { key, cells });
        }

        let store = Self { columns, rows };
        store.warn_duplicate_keys();
        Ok(store)
    }

    /// Look up a record by raw RTC identifier.
    ///
    /// The query is normalized with [`normalize_rtc`] and compared for exact
    /// equality against each stored key; the first match in file order wins.
    /// Returns the full row as a flat column → value JSON map.
    pub fn lookup(
        &self,
        raw: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, PortalError> {
        if raw.is_empty() {
            return Err(PortalError::MissingInput);
        }

        let wanted = normalize_rtc(raw);
        let row = self
            .rows
            .iter()
            .find(|r| r.key == wanted)
            .ok_or(PortalError::NotFound)?;

        let mut fields = serde_json::Map::with_capacity(self.columns.len());
        for (col, cell) in self.columns.iter().zip(row.cells.iter()) {
            fields.insert(col.name.clone(), cell.to_json());
        }
        Ok(fields)
    }

    /// Number of loaded rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The declared column schema.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn warn_duplicate_keys(&self) {
        let mut seen = std::collections::HashSet::new();
        for row in &self.rows {
            if !row.key.is_empty() && !seen.insert(row.key.as_str()) {
                tracing::warn!(
                    key = %row.key,
                    "duplicate normalized RTC key — lookups return the first row in file order"
                );
            }
        }
    }
}

/// Classify a column by inspecting every non-empty cell.
fn classify_column(rows: &[Vec<String>], index: usize) -> ColumnType {
    let mut saw_value = false;
    let mut all_int = true;
    let mut all_float = true;

    for row in rows {
        let cell = row.get(index).map(String::as_str).unwrap_or("");
        if cell.is_empty() {
            continue;
        }
        saw_value = true;
        if cell.parse::<i64>().is_err() {
            all_int = false;
        }
        if cell.parse::<f64>().is_err() {
            all_float = false;
        }
    }

    if !saw_value {
        // A fully empty column carries no type evidence; serialize as text.
        ColumnType::Text
    } else if all_int {
        ColumnType::Integer
    } else if all_float {
        ColumnType::Float
    } else {
        ColumnType::Text
    }
}

/// Convert one raw cell according to the column's declared type.
///
/// Empty cells are the only missing-value sentinel. A non-empty cell in an
/// `Integer` or `Float` column is guaranteed to parse, since classification
/// inspected every cell.
fn convert_cell(raw: &str, ty: ColumnType) -> CellValue {
    if raw.is_empty() {
        return CellValue::Null;
    }
    match ty {
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(CellValue::Integer)
            .unwrap_or_else(|_| CellValue::Text(raw.to_string())),
        ColumnType::Float => raw
            .parse::<f64>()
            .map(CellValue::Float)
            .unwrap_or_else(|_| CellValue::Text(raw.to_string())),
        ColumnType::Text => CellValue::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn store_from(csv: &str) -> RecordStore {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(csv.as_bytes()).unwrap();
        RecordStore::load(file.path()).unwrap()
    }

    #[test]
    fn normalize_strips_and_lowercases() {
        assert_eq!(normalize_rtc("123/ABC-45"), "123abc45");
        assert_eq!(normalize_rtc(" 12 3 "), "123");
        assert_eq!(normalize_rtc("!!!"), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["123/ABC-45", "xyz", "A-1.b/2", ""] {
            let once = normalize_rtc(raw);
            assert_eq!(normalize_rtc(&once), once);
        }
    }

    #[test]
    fn lookup_matches_messy_identifier() {
        let store = store_from("rtc_number,soil_ph\n123/ABC-45,6.5\n");
        let fields = store.lookup("123abc45").unwrap();
        assert_eq!(fields["rtc_number"], serde_json::json!("123/ABC-45"));
        assert_eq!(fields["soil_ph"], serde_json::json!(6.5));
        assert!(!fields.contains_key("cleaned_rtc"));
    }

    #[test]
    fn lookup_is_total_over_loaded_rows() {
        let csv = "rtc_number,village\n12/A,Hosur\n99-B/3,Mandya\nX Y Z,Kolar\n";
        let store = store_from(csv);
        for raw in ["12/A", "99-B/3", "X Y Z"] {
            let fields = store.lookup(raw).unwrap();
            assert_eq!(fields["rtc_number"], serde_json::json!(raw));
        }
    }

    #[test]
    fn lookup_unknown_key_is_not_found() {
        let store = store_from("rtc_number,soil_ph\n123/ABC-45,6.5\n");
        assert!(matches!(store.lookup("999zzz"), Err(PortalError::NotFound)));
    }

    #[test]
    fn lookup_empty_input_is_missing() {
        let store = store_from("rtc_number,soil_ph\n123/ABC-45,6.5\n");
        assert!(matches!(store.lookup(""), Err(PortalError::MissingInput)));
    }

    #[test]
    fn duplicate_keys_first_row_wins() {
        let csv = "rtc_number,village\n1/A,First\n1-a,Second\n";
        let store = store_from(csv);
        let fields = store.lookup("1a").unwrap();
        assert_eq!(fields["village"], serde_json::json!("First"));
    }

    #[test]
    fn columns_are_typed_at_load() {
        let csv = "rtc_number,acres,soil_ph,village\n1/A,3,6.5,Hosur\n2/B,12,7.0,Mandya\n";
        let store = store_from(csv);
        let types: Vec<ColumnType> = store.columns().iter().map(|c| c.ty).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Text,
                ColumnType::Integer,
                ColumnType::Float,
                ColumnType::Text
            ]
        );
    }

    #[test]
    fn empty_cells_serialize_as_null() {
        let csv = "rtc_number,acres\n1/A,\n2/B,4\n";
        let store = store_from(csv);
        let fields = store.lookup("1a").unwrap();
        assert_eq!(fields["acres"], serde_json::Value::Null);
        let fields = store.lookup("2b").unwrap();
        assert_eq!(fields["acres"], serde_json::json!(4));
    }

    #[test]
    fn missing_rtc_column_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"survey_no,village\n1,Hosur\n").unwrap();
        let err = RecordStore::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("rtc_number"));
    }

    #[test]
    fn mixed_numeric_column_falls_back_to_text() {
        let csv = "rtc_number,code\n1/A,12\n2/B,12X\n";
        let store = store_from(csv);
        let fields = store.lookup("1a").unwrap();
        assert_eq!(fields["code"], serde_json::json!("12"));
    }
}
