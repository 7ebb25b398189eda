//! CSV ingestion with per-column type inference.

use crate::data::table::{Table, Value};
use crate::error::{ForecastError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Cell spellings read as missing values.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Int,
    Float,
    Text,
}

/// Most specific type every non-missing cell of a column parses as.
fn infer_type<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut ty = ColumnType::Int;
    for cell in cells.filter(|c| !NA_VALUES.contains(c)) {
        if ty == ColumnType::Int && cell.parse::<i64>().is_err() {
            ty = ColumnType::Float;
        }
        if ty == ColumnType::Float && cell.parse::<f64>().is_err() {
            return ColumnType::Text;
        }
    }
    ty
}

fn convert(cell: &str, ty: ColumnType) -> Value {
    if NA_VALUES.contains(&cell) {
        return Value::Null;
    }
    match ty {
        ColumnType::Int => cell.parse().map(Value::Int).unwrap_or(Value::Null),
        ColumnType::Float => cell.parse().map(Value::Float).unwrap_or(Value::Null),
        ColumnType::Text => Value::Text(cell.to_string()),
    }
}

/// Load a headed CSV file into a [`Table`].
///
/// A file that cannot be opened is reported as [`ForecastError::Io`], malformed
/// content (including rows of the wrong width) as [`ForecastError::Csv`]; both
/// carry the path.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ForecastError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_csv(file, path)?;
    info!(path = %path.display(), rows = table.len(), columns = table.columns().len(), "loaded table");
    Ok(table)
}

/// Parse CSV from any reader; `source` is only used in error messages.
pub fn read_csv<R: Read>(reader: R, source: &Path) -> Result<Table> {
    let csv_error = |e: csv::Error| ForecastError::Csv {
        path: source.to_path_buf(),
        source: e,
    };

    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let columns: Vec<String> = rdr
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();

    let records = rdr
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(csv_error)?;

    let types: Vec<ColumnType> = (0..columns.len())
        .map(|j| infer_type(records.iter().map(|r| r.get(j).unwrap_or(""))))
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            types
                .iter()
                .enumerate()
                .map(|(j, &ty)| convert(record.get(j).unwrap_or(""), ty))
                .collect()
        })
        .collect();

    Table::new(columns, rows)
}
