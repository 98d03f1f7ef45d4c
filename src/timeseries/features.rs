//! Lag and seasonality feature engineering for monthly series

use super::table::{next_month, TimeSeriesTable};
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Name of the sine seasonality column
pub const SIN_SEASON: &str = "sin_season";
/// Name of the cosine seasonality column
pub const COS_SEASON: &str = "cos_season";
/// Suffix appended to a source column to name its lag-1 feature
pub const LAG_SUFFIX: &str = " lag1";

/// Default seasonality period for monthly data
pub const DEFAULT_PERIOD: usize = 12;

/// Configuration for the standard feature table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Add `sin_season` / `cos_season`
    pub include_seasonality: bool,
    /// Seasonality period in months
    pub seasonality_period: usize,
    /// Restrict the raw columns that get lagged (None = all)
    pub source_columns: Option<Vec<String>>,
    /// Raw columns never lagged
    pub exclude_columns: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            include_seasonality: true,
            seasonality_period: DEFAULT_PERIOD,
            source_columns: None,
            exclude_columns: Vec::new(),
        }
    }
}

/// Name of the lag-1 feature derived from `source`
pub fn lag_column_name(source: &str) -> String {
    format!("{}{}", source, LAG_SUFFIX)
}

fn is_derived(name: &str) -> bool {
    name == SIN_SEASON || name == COS_SEASON || name.ends_with(LAG_SUFFIX)
}

/// Shift a series forward by one position; the first value is undefined.
pub fn derive_lag_column(values: &[f64]) -> Vec<f64> {
    let mut lagged = Vec::with_capacity(values.len());
    if !values.is_empty() {
        lagged.push(f64::NAN);
        lagged.extend_from_slice(&values[..values.len() - 1]);
    }
    lagged
}

/// Sine and cosine of the positional index `0..n` with the given period.
pub fn compute_seasonal(n: usize, period: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    if period == 0 {
        return Err(ForecastError::InvalidConfiguration(
            "seasonality period must be a positive integer".to_string(),
        ));
    }
    let p = period as f64;
    Ok((0..n)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / p;
            (angle.sin(), angle.cos())
        })
        .unzip())
}

/// Builder that owns one table and applies feature transformations in order.
///
/// ```ignore
/// let features = FeatureBuilder::new(raw)
///     .append_next_month()?
///     .add_lag_features()?
///     .drop_source_columns()
///     .finalize();
/// let features = FeatureBuilder::new(features)
///     .add_sin_seasonality(12)?
///     .add_cos_seasonality(12)?
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    table: TimeSeriesTable,
}

impl FeatureBuilder {
    pub fn new(table: TimeSeriesTable) -> Self {
        Self { table }
    }

    /// Append `<col> lag1` for every source column.
    ///
    /// Seasonal columns and existing lag columns are not lagged again.
    pub fn add_lag_features(mut self) -> Result<Self> {
        let sources: Vec<String> = self
            .table
            .column_names()
            .iter()
            .filter(|name| !is_derived(name))
            .cloned()
            .collect();

        for source in sources {
            let lagged = match self.table.column(&source) {
                Some(values) => derive_lag_column(values),
                None => continue,
            };
            self.table.push_column(lag_column_name(&source), lagged)?;
        }
        Ok(self)
    }

    pub fn add_sin_seasonality(mut self, period: usize) -> Result<Self> {
        let (sin, _) = compute_seasonal(self.table.len(), period)?;
        self.table.push_column(SIN_SEASON.to_string(), sin)?;
        Ok(self)
    }

    pub fn add_cos_seasonality(mut self, period: usize) -> Result<Self> {
        let (_, cos) = compute_seasonal(self.table.len(), period)?;
        self.table.push_column(COS_SEASON.to_string(), cos)?;
        Ok(self)
    }

    /// Keep only the named columns. The month key is always kept and unknown
    /// names are ignored.
    pub fn select_columns<S: AsRef<str>>(self, names: &[S]) -> Self {
        Self {
            table: self.table.select(names),
        }
    }

    /// Remove the named columns, ignoring unknown names.
    pub fn drop_columns<S: AsRef<str>>(self, names: &[S]) -> Self {
        Self {
            table: self.table.drop(names),
        }
    }

    /// Remove every raw column that already has a lag-1 counterpart.
    pub fn drop_source_columns(self) -> Self {
        let sources: Vec<String> = self
            .table
            .column_names()
            .iter()
            .filter(|name| self.table.has_column(&lag_column_name(name)))
            .cloned()
            .collect();
        self.drop_columns(&sources)
    }

    /// Append an all-undefined row for the month after the last one.
    ///
    /// Applied before [`add_lag_features`](Self::add_lag_features), the new
    /// row's lag columns pick up the last observed values, which makes it the
    /// feature vector for next month's forecast.
    pub fn append_next_month(mut self) -> Result<Self> {
        let Some(last) = self.table.last_month() else {
            return Ok(self);
        };
        let month = next_month(last)?;
        let undefined = vec![f64::NAN; self.table.column_names().len()];
        self.table.push_row(month, &undefined)?;
        debug!(%month, "appended next-month row");
        Ok(self)
    }

    /// Drop every row containing an undefined value.
    pub fn finalize(self) -> TimeSeriesTable {
        let table = &self.table;
        let cleaned = table.filter_rows(|i| !table.row_has_undefined(i));
        debug!(
            dropped = table.len() - cleaned.len(),
            remaining = cleaned.len(),
            "finalized feature table"
        );
        cleaned
    }

    /// Current table without dropping undefined rows.
    pub fn build(self) -> TimeSeriesTable {
        self.table
    }
}

/// Build the standard feature table from a raw monthly series.
///
/// The result covers months `2..=n+1` of an `n`-month series: the first month
/// has no lag and the last row is next month's inference row. Seasonality is
/// indexed over these rows, so the first feature row has index 0.
pub fn build_feature_table(raw: &TimeSeriesTable, config: &FeatureConfig) -> Result<TimeSeriesTable> {
    let sources = match &config.source_columns {
        Some(names) => raw.select(names),
        None => raw.clone(),
    };
    let sources = sources.drop(&config.exclude_columns);
    if sources.column_names().is_empty() {
        return Err(ForecastError::InvalidConfiguration(
            "no source columns left to derive features from".to_string(),
        ));
    }

    let lagged = FeatureBuilder::new(sources)
        .append_next_month()?
        .add_lag_features()?
        .drop_source_columns()
        .finalize();

    if !config.include_seasonality {
        return Ok(lagged);
    }
    Ok(FeatureBuilder::new(lagged)
        .add_sin_seasonality(config.seasonality_period)?
        .add_cos_seasonality(config.seasonality_period)?
        .build())
}
