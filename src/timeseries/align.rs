//! Month alignment of feature and target tables

use super::table::TimeSeriesTable;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use ndarray::{Array1, Array2};
use std::collections::BTreeSet;

/// Row-synchronized training data: row `i` of `x` belongs to `months[i]` and
/// to `y[i]`.
#[derive(Debug, Clone)]
pub struct AlignedData {
    pub months: Vec<NaiveDate>,
    pub feature_names: Vec<String>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

impl AlignedData {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// First `n` rows, used as an expanding training window
    pub fn head(&self, n: usize) -> (Array2<f64>, Array1<f64>) {
        let n = n.min(self.len());
        (
            self.x.slice(ndarray::s![..n, ..]).to_owned(),
            self.y.slice(ndarray::s![..n]).to_owned(),
        )
    }

    /// Single row `idx` as a one-row matrix
    pub fn row(&self, idx: usize) -> Array2<f64> {
        self.x.slice(ndarray::s![idx..idx + 1, ..]).to_owned()
    }
}

/// Sorted intersection of the month axes of two tables
pub fn intersect_months(a: &TimeSeriesTable, b: &TimeSeriesTable) -> Vec<NaiveDate> {
    let left: BTreeSet<NaiveDate> = a.months().iter().copied().collect();
    let right: BTreeSet<NaiveDate> = b.months().iter().copied().collect();
    left.intersection(&right).copied().collect()
}

/// Restrict both tables to their shared months and build (X, y).
///
/// X takes every feature column in table order; y is the first column of the
/// target table. An empty intersection yields zero rows.
pub fn align(features: &TimeSeriesTable, target: &TimeSeriesTable) -> Result<AlignedData> {
    let target_name = target.column_names().first().ok_or_else(|| {
        ForecastError::InvalidConfiguration("target table has no value column".to_string())
    })?;

    let common: BTreeSet<NaiveDate> = intersect_months(features, target).into_iter().collect();
    let features = features.filter_rows(|i| common.contains(&features.months()[i]));
    let target = target.filter_rows(|i| common.contains(&target.months()[i]));

    let feature_names = features.column_names().to_vec();
    let columns: Vec<&[f64]> = feature_names
        .iter()
        .filter_map(|name| features.column(name))
        .collect();
    let x = Array2::from_shape_fn((features.len(), columns.len()), |(r, c)| columns[c][r]);

    let y = target
        .column(target_name)
        .map(|values| Array1::from_vec(values.to_vec()))
        .unwrap_or_else(|| Array1::zeros(0));

    Ok(AlignedData {
        months: features.months().to_vec(),
        feature_names,
        x,
        y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    fn table(name: &str, range: std::ops::RangeInclusive<u32>) -> TimeSeriesTable {
        let months: Vec<NaiveDate> = range.clone().map(month).collect();
        let values: Vec<f64> = range.map(|m| m as f64 * 10.0).collect();
        TimeSeriesTable::new(months, vec![(name.to_string(), values)]).unwrap()
    }

    #[test]
    fn test_intersect_months_sorted() {
        let a = table("f", 2..=6);
        let b = table("t", 1..=5);
        assert_eq!(intersect_months(&a, &b), vec![month(2), month(3), month(4), month(5)]);
    }

    #[test]
    fn test_align_subset_of_months() {
        let features = table("f", 1..=10);
        let target = table("t", 3..=8);

        let data = align(&features, &target).unwrap();
        assert_eq!(data.len(), 6);
        assert_eq!(data.x.nrows(), 6);
        assert_eq!(data.months, (3..=8).map(month).collect::<Vec<_>>());
        assert_eq!(data.feature_names, vec!["f".to_string()]);
        for (i, m) in (3..=8).enumerate() {
            assert_eq!(data.x[[i, 0]], m as f64 * 10.0);
            assert_eq!(data.y[i], m as f64 * 10.0);
        }
    }

    #[test]
    fn test_align_empty_intersection() {
        let features = table("f", 1..=3);
        let target = table("t", 5..=7);
        let data = align(&features, &target).unwrap();
        assert!(data.is_empty());
        assert_eq!(data.x.nrows(), 0);
        assert_eq!(data.x.ncols(), 1);
    }

    #[test]
    fn test_align_requires_target_column() {
        let features = table("f", 1..=3);
        let target = table("t", 1..=3).drop(&["t"]);
        assert!(matches!(
            align(&features, &target),
            Err(ForecastError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_head_and_row() {
        let data = align(&table("f", 1..=4), &table("t", 1..=4)).unwrap();
        let (x, y) = data.head(2);
        assert_eq!(x.nrows(), 2);
        assert_eq!(y.to_vec(), vec![10.0, 20.0]);
        assert_eq!(data.row(3)[[0, 0]], 40.0);
    }
}
