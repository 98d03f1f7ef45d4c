//! Data loading utilities
//!
//! CSV files are read and written through polars; the month column becomes
//! the table key and every other numeric column becomes a value column.

use crate::error::{ForecastError, Result};
use crate::timeseries::{parse_month, TimeSeriesTable, MONTH_COLUMN};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

/// Month column names recognised when no explicit name is configured
pub const MONTH_COLUMN_CANDIDATES: [&str; 3] = [MONTH_COLUMN, "month", "Время"];

/// Read a CSV file into a polars DataFrame.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ForecastError::FileNotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;

    let reader = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file);

    reader
        .finish()
        .map_err(|e| ForecastError::DataError(format!("{}: {}", path.display(), e)))
}

/// Parse CSV content already read into memory.
pub fn parse_csv(bytes: Vec<u8>) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| ForecastError::DataError(e.to_string()))
}

/// Write a DataFrame as CSV with a header row.
pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

fn find_month_column(df: &DataFrame, hint: Option<&str>) -> Result<String> {
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();

    let found = match hint {
        Some(name) => names.iter().find(|n| n.as_str() == name),
        None => MONTH_COLUMN_CANDIDATES
            .iter()
            .find_map(|candidate| names.iter().find(|n| n.as_str() == *candidate)),
    };

    found.cloned().ok_or_else(|| {
        ForecastError::DataError(format!(
            "no month column found (looked for {}), columns are {:?}",
            hint.map(|h| h.to_string())
                .unwrap_or_else(|| MONTH_COLUMN_CANDIDATES.join(", ")),
            names
        ))
    })
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::Int16
            | DataType::Int8
            | DataType::UInt64
            | DataType::UInt32
            | DataType::UInt16
            | DataType::UInt8
            | DataType::Null
    )
}

fn month_values(column: &Column) -> Result<Vec<NaiveDate>> {
    let as_str = column.cast(&DataType::String)?;
    as_str
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(raw) => parse_month(raw),
            None => Err(ForecastError::DataError(format!("row {} has no month", row))),
        })
        .collect()
}

fn float_values(column: &Column) -> Result<Vec<f64>> {
    let as_f64 = column.cast(&DataType::Float64)?;
    Ok(as_f64
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Convert a DataFrame into a month-keyed table.
///
/// Non-numeric columns are skipped with a warning.
pub fn table_from_dataframe(df: &DataFrame, month_column_hint: Option<&str>) -> Result<TimeSeriesTable> {
    let month_name = find_month_column(df, month_column_hint)?;
    let months = month_values(df.column(&month_name)?)?;

    let mut columns = Vec::new();
    for column in df.get_columns() {
        let name = column.name().as_str();
        if name == month_name {
            continue;
        }
        if !is_numeric(column.dtype()) {
            warn!(column = name, dtype = %column.dtype(), "skipping non-numeric column");
            continue;
        }
        columns.push((name.to_string(), float_values(column)?));
    }

    TimeSeriesTable::new(months, columns)
}

/// Load a month-keyed table from a CSV file.
///
/// `month_column_hint` names the month column; when `None`, the first of
/// `Month`, `month` and `Время` present in the header is used.
pub fn load_table(path: impl AsRef<Path>, month_column_hint: Option<&str>) -> Result<TimeSeriesTable> {
    let path = path.as_ref();
    let start = Instant::now();

    let df = load_csv(path)?;
    let table = table_from_dataframe(&df, month_column_hint)?;

    debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.column_names().len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "table loaded"
    );
    Ok(table)
}

/// Build a month-keyed table from in-memory CSV content.
pub fn table_from_csv_bytes(bytes: Vec<u8>, month_column_hint: Option<&str>) -> Result<TimeSeriesTable> {
    let df = parse_csv(bytes)?;
    table_from_dataframe(&df, month_column_hint)
}

/// Save a table as CSV: `Month` first as `YYYY-MM-DD`, undefined values empty.
pub fn save_table(table: &TimeSeriesTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut df = table.to_dataframe()?;
    save_csv(&mut df, path)?;
    debug!(path = %path.display(), rows = table.len(), "table saved");
    Ok(())
}
