//! Month-keyed numeric table

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashSet;

/// Name of the month key column in every persisted table
pub const MONTH_COLUMN: &str = "Month";

/// Date format used when writing months
pub const MONTH_FORMAT: &str = "%Y-%m-%d";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Truncate a date to the first day of its month
pub fn normalize_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// The month following `month`
pub fn next_month(month: NaiveDate) -> Result<NaiveDate> {
    normalize_month(month)
        .checked_add_months(Months::new(1))
        .ok_or_else(|| ForecastError::DataError(format!("no month after {}", month)))
}

/// Parse a month label, accepting plain dates, datetimes and `YYYY-MM`.
pub fn parse_month(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(normalize_month(d));
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(normalize_month(dt.date()));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
        return Ok(d);
    }
    Err(ForecastError::DataError(format!("cannot parse month '{}'", raw)))
}

/// Ordered rows keyed by a unique calendar month, with named numeric columns.
///
/// Undefined values are stored as `NaN`. Rows are always sorted by month and
/// every column holds exactly one value per row.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesTable {
    months: Vec<NaiveDate>,
    names: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl TimeSeriesTable {
    /// Build a table from a month axis and named columns.
    ///
    /// Months are normalized to the first of the month and rows are sorted
    /// ascending. Duplicate months, duplicate column names and columns whose
    /// length differs from the month axis are rejected.
    pub fn new(months: Vec<NaiveDate>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let months: Vec<NaiveDate> = months.into_iter().map(normalize_month).collect();

        let mut seen = HashSet::with_capacity(months.len());
        for m in &months {
            if !seen.insert(*m) {
                return Err(ForecastError::DataError(format!("duplicate month {}", m)));
            }
        }

        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for (name, col) in columns {
            if name == MONTH_COLUMN {
                return Err(ForecastError::DataError(format!(
                    "'{}' is reserved for the month key",
                    MONTH_COLUMN
                )));
            }
            if names.contains(&name) {
                return Err(ForecastError::DataError(format!("duplicate column '{}'", name)));
            }
            if col.len() != months.len() {
                return Err(ForecastError::DataError(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    col.len(),
                    months.len()
                )));
            }
            names.push(name);
            values.push(col);
        }

        let mut order: Vec<usize> = (0..months.len()).collect();
        order.sort_by_key(|&i| months[i]);

        Ok(Self {
            months: order.iter().map(|&i| months[i]).collect(),
            names,
            values: values
                .into_iter()
                .map(|col| order.iter().map(|&i| col[i]).collect())
                .collect(),
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Month axis in ascending order
    pub fn months(&self) -> &[NaiveDate] {
        &self.months
    }

    /// Column names in table order (the month key is not included)
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Values of a column, if present
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx].as_slice())
    }

    /// Values of one row in column order
    pub fn row(&self, idx: usize) -> Option<Vec<f64>> {
        if idx >= self.len() {
            return None;
        }
        Some(self.values.iter().map(|col| col[idx]).collect())
    }

    /// Latest month in the table
    pub fn last_month(&self) -> Option<NaiveDate> {
        self.months.last().copied()
    }

    /// Whether any column is undefined at `idx`
    pub fn row_has_undefined(&self, idx: usize) -> bool {
        self.values.iter().any(|col| col[idx].is_nan())
    }

    /// Keep the named columns in table order; unknown names are ignored.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let wanted: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();
        self.project(|name| wanted.contains(name))
    }

    /// Remove the named columns; unknown names are ignored.
    pub fn drop<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let unwanted: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();
        self.project(|name| !unwanted.contains(name))
    }

    fn project(&self, keep: impl Fn(&str) -> bool) -> Self {
        let (names, values) = self
            .names
            .iter()
            .zip(self.values.iter())
            .filter(|(name, _)| keep(name.as_str()))
            .map(|(name, col)| (name.clone(), col.clone()))
            .unzip();
        Self {
            months: self.months.clone(),
            names,
            values,
        }
    }

    /// Keep the rows for which `keep(idx)` holds, preserving order.
    pub fn filter_rows(&self, keep: impl Fn(usize) -> bool) -> Self {
        let idx: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        Self {
            months: idx.iter().map(|&i| self.months[i]).collect(),
            names: self.names.clone(),
            values: self
                .values
                .iter()
                .map(|col| idx.iter().map(|&i| col[i]).collect())
                .collect(),
        }
    }

    /// Append a column. The caller guarantees the name is unused.
    pub(crate) fn push_column(&mut self, name: String, values: Vec<f64>) -> Result<()> {
        if values.len() != self.len() {
            return Err(ForecastError::DataError(format!(
                "column '{}' has {} values, expected {}",
                name,
                values.len(),
                self.len()
            )));
        }
        if let Some(idx) = self.names.iter().position(|n| *n == name) {
            self.values[idx] = values;
        } else {
            self.names.push(name);
            self.values.push(values);
        }
        Ok(())
    }

    /// Append a row after the current last month.
    pub(crate) fn push_row(&mut self, month: NaiveDate, values: &[f64]) -> Result<()> {
        let month = normalize_month(month);
        if values.len() != self.names.len() {
            return Err(ForecastError::DataError(format!(
                "row has {} values, expected {}",
                values.len(),
                self.names.len()
            )));
        }
        if let Some(last) = self.last_month() {
            if month <= last {
                return Err(ForecastError::DataError(format!(
                    "month {} does not follow {}",
                    month, last
                )));
            }
        }
        self.months.push(month);
        for (col, v) in self.values.iter_mut().zip(values) {
            col.push(*v);
        }
        Ok(())
    }

    /// Convert to a polars DataFrame with a leading `Month` string column.
    ///
    /// Undefined values become nulls.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.names.len() + 1);
        let months: Vec<String> = self
            .months
            .iter()
            .map(|m| m.format(MONTH_FORMAT).to_string())
            .collect();
        columns.push(Series::new(MONTH_COLUMN.into(), months).into());

        for (name, col) in self.names.iter().zip(self.values.iter()) {
            let values: Vec<Option<f64>> = col
                .iter()
                .map(|v| if v.is_nan() { None } else { Some(*v) })
                .collect();
            columns.push(Series::new(name.as_str().into(), values).into());
        }

        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_new_sorts_rows_by_month() {
        let table = TimeSeriesTable::new(
            vec![month(2024, 3), month(2024, 1), month(2024, 2)],
            vec![("Deals".to_string(), vec![30.0, 10.0, 20.0])],
        )
        .unwrap();

        assert_eq!(table.months(), &[month(2024, 1), month(2024, 2), month(2024, 3)]);
        assert_eq!(table.column("Deals").unwrap(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_new_normalizes_to_first_of_month() {
        let table = TimeSeriesTable::new(
            vec![NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()],
            vec![("Deals".to_string(), vec![1.0])],
        )
        .unwrap();
        assert_eq!(table.months(), &[month(2024, 5)]);
    }

    #[test]
    fn test_new_rejects_duplicate_months() {
        let result = TimeSeriesTable::new(
            vec![month(2024, 1), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()],
            vec![("Deals".to_string(), vec![1.0, 2.0])],
        );
        assert!(matches!(result, Err(ForecastError::DataError(_))));
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let result = TimeSeriesTable::new(
            vec![month(2024, 1), month(2024, 2)],
            vec![("Deals".to_string(), vec![1.0])],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_month_formats() {
        assert_eq!(parse_month("2024-03-01").unwrap(), month(2024, 3));
        assert_eq!(parse_month("2024-03-15 00:00:00").unwrap(), month(2024, 3));
        assert_eq!(parse_month("2024-03").unwrap(), month(2024, 3));
        assert_eq!(parse_month("15.03.2024").unwrap(), month(2024, 3));
        assert!(parse_month("march").is_err());
    }

    #[test]
    fn test_next_month_rolls_over_year() {
        assert_eq!(next_month(month(2024, 12)).unwrap(), month(2025, 1));
        assert_eq!(next_month(month(2024, 1)).unwrap(), month(2024, 2));
    }

    #[test]
    fn test_select_and_drop_ignore_unknown_names() {
        let table = TimeSeriesTable::new(
            vec![month(2024, 1)],
            vec![
                ("a".to_string(), vec![1.0]),
                ("b".to_string(), vec![2.0]),
            ],
        )
        .unwrap();

        let selected = table.select(&["b", "missing"]);
        assert_eq!(selected.column_names(), &["b".to_string()]);

        let dropped = table.drop(&["missing"]);
        assert_eq!(dropped.column_names(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_to_dataframe_writes_nulls_for_undefined() {
        let table = TimeSeriesTable::new(
            vec![month(2024, 1), month(2024, 2)],
            vec![("x".to_string(), vec![f64::NAN, 2.0])],
        )
        .unwrap();

        let df = table.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);
        assert_eq!(df.column("x").unwrap().null_count(), 1);
    }
}
