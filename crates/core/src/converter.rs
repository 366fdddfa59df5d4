//! Converts a JSON text file into a single-sheet spreadsheet.

use crate::models::ConversionReport;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

pub const SHEET_NAME: &str = "Sheet1";
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("JSON payload is not tabular: {0}")]
    NotTabular(String),
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Row-oriented table with named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Projects a JSON document into rows and columns.
    ///
    /// Arrays of objects, arrays of arrays and arrays of scalars become one row
    /// per element; objects of arrays and objects of objects are read column-wise.
    pub fn from_json(value: &Value) -> Result<Self, ConvertError> {
        match value {
            Value::Array(items) => from_rows(items),
            Value::Object(map) => from_columns(map),
            other => Err(ConvertError::NotTabular(format!(
                "top-level {} cannot be tabulated",
                kind(other)
            ))),
        }
    }
}

fn from_rows(items: &[Value]) -> Result<Table, ConvertError> {
    let Some(first) = items.first() else {
        return Ok(Table::default());
    };
    match first {
        Value::Object(_) => {
            let mut columns: Vec<String> = Vec::new();
            for item in items {
                let record = item.as_object().ok_or_else(|| mixed(item))?;
                for key in record.keys() {
                    if !columns.iter().any(|c| c == key) {
                        columns.push(key.clone());
                    }
                }
            }
            let rows = items
                .iter()
                .filter_map(Value::as_object)
                .map(|record| {
                    columns
                        .iter()
                        .map(|c| record.get(c).map_or(Ok(Cell::Empty), |v| to_cell(c, v)))
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Table { columns, rows })
        }
        Value::Array(_) => {
            let mut width = 0;
            for item in items {
                width = width.max(item.as_array().ok_or_else(|| mixed(item))?.len());
            }
            let columns = positional(width);
            let rows = items
                .iter()
                .filter_map(Value::as_array)
                .map(|values| -> Result<Vec<Cell>, ConvertError> {
                    let mut row = values
                        .iter()
                        .enumerate()
                        .map(|(i, v)| to_cell(&columns[i], v))
                        .collect::<Result<Vec<_>, _>>()?;
                    row.resize(width, Cell::Empty);
                    Ok(row)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Table { columns, rows })
        }
        _ => {
            let columns = positional(1);
            let rows = items
                .iter()
                .map(|v| match v {
                    Value::Array(_) | Value::Object(_) => Err(mixed(v)),
                    _ => to_cell(&columns[0], v).map(|c| vec![c]),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Table { columns, rows })
        }
    }
}

fn from_columns(map: &Map<String, Value>) -> Result<Table, ConvertError> {
    if map.is_empty() {
        return Ok(Table::default());
    }
    let columns: Vec<String> = map.keys().cloned().collect();

    if map.values().all(Value::is_array) {
        let mut height = None;
        for (key, values) in map {
            let len = values.as_array().map_or(0, Vec::len);
            match height {
                None => height = Some(len),
                Some(h) if h != len => {
                    return Err(ConvertError::NotTabular(format!(
                        "column {key:?} has {len} values, expected {h}"
                    )))
                }
                Some(_) => {}
            }
        }
        let height = height.unwrap_or(0);
        let mut rows = Vec::with_capacity(height);
        for i in 0..height {
            let row = map
                .iter()
                .map(|(key, values)| to_cell(key, &values[i]))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        return Ok(Table { columns, rows });
    }

    if map.values().all(Value::is_object) {
        let mut index: Vec<&String> = Vec::new();
        for inner in map.values().filter_map(Value::as_object) {
            for key in inner.keys() {
                if !index.contains(&key) {
                    index.push(key);
                }
            }
        }
        let rows = index
            .iter()
            .map(|row_key| {
                map.iter()
                    .map(|(col, inner)| match inner.get(row_key.as_str()) {
                        Some(v) => to_cell(col, v),
                        None => Ok(Cell::Empty),
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Table { columns, rows });
    }

    Err(ConvertError::NotTabular(
        "object values must be all arrays or all objects".into(),
    ))
}

fn to_cell(column: &str, value: &Value) -> Result<Cell, ConvertError> {
    match value {
        Value::Null => Ok(Cell::Empty),
        Value::Bool(b) => Ok(Cell::Bool(*b)),
        Value::Number(n) => Ok(Cell::Number(n.as_f64().unwrap_or_default())),
        Value::String(s) => Ok(Cell::Text(s.clone())),
        nested => Err(ConvertError::NotTabular(format!(
            "nested {} in column {column:?}",
            kind(nested)
        ))),
    }
}

fn positional(width: usize) -> Vec<String> {
    (0..width).map(|i| i.to_string()).collect()
}

fn mixed(item: &Value) -> ConvertError {
    ConvertError::NotTabular(format!("array mixes record shapes (found {})", kind(item)))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Serializes `table` into xlsx bytes: bold header row, no index column.
pub fn to_xlsx_bytes(table: &Table) -> Result<Vec<u8>, ConvertError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in table.columns.iter().enumerate() {
        sheet.write_string_with_format(0, col_num(col)?, name, &header)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let r = u32::try_from(r + 1)
            .map_err(|_| ConvertError::NotTabular("too many rows for a worksheet".into()))?;
        for (col, cell) in row.iter().enumerate() {
            let col = col_num(col)?;
            match cell {
                Cell::Empty => {}
                Cell::Bool(b) => {
                    sheet.write_boolean(r, col, *b)?;
                }
                Cell::Number(n) => {
                    sheet.write_number(r, col, *n)?;
                }
                Cell::Text(s) => {
                    sheet.write_string(r, col, s)?;
                }
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

fn col_num(col: usize) -> Result<u16, ConvertError> {
    u16::try_from(col).map_err(|_| ConvertError::NotTabular("too many columns for a worksheet".into()))
}

/// Writes `bytes` to `dest` through a temporary file so a failed write never
/// leaves a partial spreadsheet behind.
fn persist(bytes: &[u8], dest: &Path) -> Result<(), ConvertError> {
    let persist_err = |source: io::Error| ConvertError::Persist {
        path: dest.to_path_buf(),
        source,
    };
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(persist_err)?;
    // Temp files are created owner-only; the spreadsheet is an ordinary output.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(OUTPUT_MODE))
            .map_err(persist_err)?;
    }
    tmp.write_all(bytes).map_err(persist_err)?;
    tmp.flush().map_err(persist_err)?;
    tmp.persist(dest).map_err(|e| persist_err(e.error))?;
    Ok(())
}

/// Reads `src` as JSON and writes it to `dest` as a spreadsheet.
pub fn convert_txt_to_xlsx(src: &Path, dest: &Path) -> Result<ConversionReport, ConvertError> {
    let content = fs::read_to_string(src).map_err(|source| ConvertError::Read {
        path: src.to_path_buf(),
        source,
    })?;
    let json: Value = serde_json::from_str(&content).map_err(|source| ConvertError::Parse {
        path: src.to_path_buf(),
        source,
    })?;
    let table = Table::from_json(&json)?;
    let bytes = to_xlsx_bytes(&table)?;
    persist(&bytes, dest)?;
    info!("Conversion complete. Data saved to {}", dest.display());
    Ok(ConversionReport {
        source: src.to_path_buf(),
        output: dest.to_path_buf(),
        rows: table.rows.len(),
        columns: table.columns,
    })
}

/// Like [`convert_txt_to_xlsx`] but logs failures before handing them back.
pub fn convert_logged(src: &Path, dest: &Path) -> Result<ConversionReport, ConvertError> {
    convert_txt_to_xlsx(src, dest).map_err(|e| {
        error!("Error converting to Excel: {}", e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn records_keep_document_key_order() {
        let table = Table::from_json(&json!([{"b": 1, "a": "x"}, {"a": "y", "c": true}])).unwrap();
        assert_eq!(table.columns, vec!["b", "a", "c"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Cell::Number(1.0), text("x"), Cell::Empty],
                vec![Cell::Empty, text("y"), Cell::Bool(true)],
            ]
        );
    }

    #[test]
    fn column_oriented_object() {
        let table = Table::from_json(&json!({"a": [1, 3], "b": [2, null]})).unwrap();
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Cell::Number(1.0), Cell::Number(2.0)],
                vec![Cell::Number(3.0), Cell::Empty],
            ]
        );
    }

    #[test]
    fn object_of_objects_rows_follow_inner_keys() {
        let table = Table::from_json(&json!({"a": {"r1": 1}, "b": {"r1": 2, "r2": 3}})).unwrap();
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Cell::Number(1.0), Cell::Number(2.0)],
                vec![Cell::Empty, Cell::Number(3.0)],
            ]
        );
    }

    #[test]
    fn arrays_use_positional_headers() {
        let table = Table::from_json(&json!([[1, 2], [3]])).unwrap();
        assert_eq!(table.columns, vec!["0", "1"]);
        assert_eq!(table.rows[1], vec![Cell::Number(3.0), Cell::Empty]);

        let table = Table::from_json(&json!(["x", "y"])).unwrap();
        assert_eq!(table.columns, vec!["0"]);
        assert_eq!(table.rows, vec![vec![text("x")], vec![text("y")]]);
    }

    #[test]
    fn empty_documents_make_empty_tables() {
        assert_eq!(Table::from_json(&json!([])).unwrap(), Table::default());
        assert_eq!(Table::from_json(&json!({})).unwrap(), Table::default());
    }

    #[test]
    fn non_tabular_shapes_are_rejected() {
        for doc in [
            json!(42),
            json!("text"),
            json!({"a": 1, "b": 2}),
            json!({"a": [1, 2], "b": [3]}),
            json!([{"a": 1}, 2]),
            json!([1, {"a": 1}]),
            json!([{"a": {"nested": true}}]),
            json!([{"a": [1, 2]}]),
        ] {
            let err = Table::from_json(&doc).unwrap_err();
            assert!(matches!(err, ConvertError::NotTabular(_)), "{doc}: {err}");
        }
    }

    #[test]
    fn malformed_json_leaves_no_output() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("logs.txt");
        let dest = temp.path().join("out.xlsx");
        fs::write(&src, "this is not json").unwrap();

        let err = convert_txt_to_xlsx(&src, &dest).unwrap_err();
        assert!(matches!(err, ConvertError::Parse { .. }));
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_source_is_read_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = convert_txt_to_xlsx(&temp.path().join("nope.txt"), &temp.path().join("o.xlsx"))
            .unwrap_err();
        assert!(matches!(err, ConvertError::Read { .. }));
    }

    #[test]
    fn writes_workbook_and_reports_shape() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("logs.txt");
        let dest = temp.path().join("out.xlsx");
        fs::write(&src, r#"[{"a":1,"b":2},{"a":3,"b":4}]"#).unwrap();

        let report = convert_txt_to_xlsx(&src, &dest).unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.columns, vec!["a", "b"]);
        assert_eq!(report.output, dest);
        let bytes = fs::read(&dest).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[cfg(unix)]
    #[test]
    fn spreadsheet_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("logs.txt");
        let dest = temp.path().join("out.xlsx");
        fs::write(&src, r#"[{"a":1}]"#).unwrap();

        convert_txt_to_xlsx(&src, &dest).unwrap();
        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}
