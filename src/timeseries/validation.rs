//! Walk-forward validation over month-aligned data
//!
//! Every checkpoint trains a fresh copy of the model on all rows before the
//! checkpoint and predicts the checkpoint row only (expanding window,
//! single step ahead).

use super::align::AlignedData;
use super::table::MONTH_FORMAT;
use crate::error::{ForecastError, Result};
use crate::training::Regressor;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Fewest aligned rows either protocol accepts
pub const MIN_VALIDATION_ROWS: usize = 4;

fn ensure_rows(n: usize) -> Result<()> {
    if n < MIN_VALIDATION_ROWS {
        return Err(ForecastError::InsufficientData {
            required: MIN_VALIDATION_ROWS,
            actual: n,
        });
    }
    Ok(())
}

/// Checkpoints of the full report: `[n/2, 3n/4, n-2, n-1]`.
///
/// Duplicates are kept for small `n`.
pub fn walk_forward_splits(n: usize) -> Result<[usize; 4]> {
    ensure_rows(n)?;
    Ok([n / 2, (3 * n) / 4, n - 2, n - 1])
}

/// Checkpoints of the smoke test: `[n/2, 3n/4, n-1]`.
pub fn smoke_test_splits(n: usize) -> Result<[usize; 3]> {
    ensure_rows(n)?;
    Ok([n / 2, (3 * n) / 4, n - 1])
}

/// Absolute percentage error of one prediction, `None` when `actual` is zero.
pub fn mape(actual: f64, predicted: f64) -> Option<f64> {
    if actual == 0.0 {
        return None;
    }
    Some(((actual - predicted) / actual).abs() * 100.0)
}

/// One checkpoint of the full report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// `"<train rows>/<total rows>"`
    pub train_part: String,
    pub actual: f64,
    pub predicted: f64,
    pub mape: Option<f64>,
}

/// Result of [`WalkForwardValidator::validate`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub records: Vec<ValidationRecord>,
}

impl ValidationReport {
    /// Mean of the defined MAPE values
    pub fn mean_mape(&self) -> Option<f64> {
        let defined: Vec<f64> = self.records.iter().filter_map(|r| r.mape).collect();
        if defined.is_empty() {
            None
        } else {
            Some(defined.iter().sum::<f64>() / defined.len() as f64)
        }
    }

    /// Columns `TrainPart, Actual, Predicted, MAPE`; an undefined MAPE is null.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let train_part: Vec<&str> = self.records.iter().map(|r| r.train_part.as_str()).collect();
        let actual: Vec<f64> = self.records.iter().map(|r| r.actual).collect();
        let predicted: Vec<f64> = self.records.iter().map(|r| r.predicted).collect();
        let mape: Vec<Option<f64>> = self.records.iter().map(|r| r.mape).collect();

        Ok(DataFrame::new(vec![
            Series::new("TrainPart".into(), train_part).into(),
            Series::new("Actual".into(), actual).into(),
            Series::new("Predicted".into(), predicted).into(),
            Series::new("MAPE".into(), mape).into(),
        ])?)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10} {:>12} {:>12} {:>8}", "TrainPart", "Actual", "Predicted", "MAPE")?;
        for r in &self.records {
            let mape = r.mape.map_or_else(|| "-".to_string(), |m| format!("{:.2}", m));
            writeln!(f, "{:<10} {:>12.2} {:>12.2} {:>8}", r.train_part, r.actual, r.predicted, mape)?;
        }
        Ok(())
    }
}

/// One checkpoint of the smoke test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeTestRecord {
    pub month: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

/// Result of [`WalkForwardValidator::walk_forward_test`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeTestReport {
    pub records: Vec<SmokeTestRecord>,
}

impl SmokeTestReport {
    /// Columns `Month, Actual, Predicted`
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let month: Vec<String> = self
            .records
            .iter()
            .map(|r| r.month.format(MONTH_FORMAT).to_string())
            .collect();
        let actual: Vec<f64> = self.records.iter().map(|r| r.actual).collect();
        let predicted: Vec<f64> = self.records.iter().map(|r| r.predicted).collect();

        Ok(DataFrame::new(vec![
            Series::new("Month".into(), month).into(),
            Series::new("Actual".into(), actual).into(),
            Series::new("Predicted".into(), predicted).into(),
        ])?)
    }
}

impl fmt::Display for SmokeTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10} {:>12} {:>12}", "Month", "Actual", "Predicted")?;
        for r in &self.records {
            writeln!(
                f,
                "{:<10} {:>12.2} {:>12.2}",
                r.month.format(MONTH_FORMAT),
                r.actual,
                r.predicted
            )?;
        }
        Ok(())
    }
}

/// Expanding-window walk-forward validator
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkForwardValidator;

impl WalkForwardValidator {
    pub fn new() -> Self {
        Self
    }

    /// Full accuracy report over four checkpoints.
    pub fn validate<M>(&self, model: &M, data: &AlignedData) -> Result<ValidationReport>
    where
        M: Regressor + Clone,
    {
        let n = data.len();
        let splits = walk_forward_splits(n)?;
        info!(rows = n, model = model.name(), "running walk-forward validation");

        let mut records = Vec::with_capacity(splits.len());
        for split in splits {
            let (actual, predicted) = Self::step(model, data, split)?;
            let error = mape(actual, predicted);
            debug!(split, actual, predicted, mape = ?error, "validation checkpoint");
            records.push(ValidationRecord {
                train_part: format!("{}/{}", split, n),
                actual,
                predicted,
                mape: error,
            });
        }

        let report = ValidationReport { records };
        info!(mean_mape = ?report.mean_mape(), "walk-forward validation finished");
        Ok(report)
    }

    /// Quick three-checkpoint run reporting month, actual and prediction.
    pub fn walk_forward_test<M>(&self, model: &M, data: &AlignedData) -> Result<SmokeTestReport>
    where
        M: Regressor + Clone,
    {
        let n = data.len();
        let splits = smoke_test_splits(n)?;
        info!(rows = n, model = model.name(), "running walk-forward smoke test");

        let mut records = Vec::with_capacity(splits.len());
        for split in splits {
            let (actual, predicted) = Self::step(model, data, split)?;
            records.push(SmokeTestRecord {
                month: data.months[split],
                actual,
                predicted,
            });
        }
        Ok(SmokeTestReport { records })
    }

    /// Train a fresh copy on rows `[0, split)` and predict row `split`.
    fn step<M>(template: &M, data: &AlignedData, split: usize) -> Result<(f64, f64)>
    where
        M: Regressor + Clone,
    {
        let (x_train, y_train) = data.head(split);
        let mut model = template.clone();
        model.fit(&x_train, &y_train)?;

        let predicted = model
            .predict(&data.row(split))?
            .get(0)
            .copied()
            .ok_or_else(|| ForecastError::FitFailure("model returned no prediction".to_string()))?;
        Ok((data.y[split], predicted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    /// Predicts the mean of the training target
    #[derive(Debug, Clone, Default)]
    struct MeanModel {
        mean: Option<f64>,
    }

    impl Regressor for MeanModel {
        fn name(&self) -> &'static str {
            "mean"
        }

        fn fit(&mut self, _x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
            self.mean = y.mean();
            Ok(())
        }

        fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            let mean = self.mean.ok_or(ForecastError::ModelNotFitted)?;
            Ok(Array1::from_elem(x.nrows(), mean))
        }
    }

    fn data(y: Vec<f64>) -> AlignedData {
        let n = y.len();
        AlignedData {
            months: (0..n)
                .map(|i| NaiveDate::from_ymd_opt(2020 + (i / 12) as i32, (i % 12) as u32 + 1, 1).unwrap())
                .collect(),
            feature_names: vec!["f".to_string()],
            x: Array2::from_shape_fn((n, 1), |(r, _)| r as f64),
            y: Array1::from_vec(y),
        }
    }

    #[test]
    fn test_walk_forward_splits() {
        assert_eq!(walk_forward_splits(12).unwrap(), [6, 9, 10, 11]);
        assert_eq!(walk_forward_splits(4).unwrap(), [2, 3, 2, 3]);
        assert_eq!(smoke_test_splits(12).unwrap(), [6, 9, 11]);
    }

    #[test]
    fn test_splits_require_four_rows() {
        for n in 0..4 {
            assert!(matches!(
                walk_forward_splits(n),
                Err(ForecastError::InsufficientData { required: 4, .. })
            ));
            assert!(smoke_test_splits(n).is_err());
        }
    }

    #[test]
    fn test_mape() {
        assert_eq!(mape(100.0, 90.0), Some(10.0));
        assert_eq!(mape(100.0, 110.0), Some(10.0));
        assert_eq!(mape(0.0, 5.0), None);
        assert_eq!(mape(0.0, 0.0), None);
    }

    #[test]
    fn test_validate_records() {
        let y: Vec<f64> = (1..=8).map(|v| v as f64 * 10.0).collect();
        let report = WalkForwardValidator::new()
            .validate(&MeanModel::default(), &data(y))
            .unwrap();

        let parts: Vec<&str> = report.records.iter().map(|r| r.train_part.as_str()).collect();
        assert_eq!(parts, vec!["4/8", "6/8", "6/8", "7/8"]);

        // first checkpoint trains on 10..40 and predicts row 4 (actual 50)
        let first = &report.records[0];
        assert_eq!(first.actual, 50.0);
        assert_eq!(first.predicted, 25.0);
        assert_eq!(first.mape, Some(50.0));
    }

    #[test]
    fn test_validate_is_deterministic() {
        let y: Vec<f64> = (0..13).map(|v| (v as f64).sin() * 5.0 + 20.0).collect();
        let validator = WalkForwardValidator::new();
        let a = validator.validate(&MeanModel::default(), &data(y.clone())).unwrap();
        let b = validator.validate(&MeanModel::default(), &data(y)).unwrap();
        for (ra, rb) in a.records.iter().zip(b.records.iter()) {
            assert_eq!(ra.train_part, rb.train_part);
            assert_eq!(ra.predicted, rb.predicted);
        }
    }

    #[test]
    fn test_zero_actual_gives_missing_mape() {
        let report = WalkForwardValidator::new()
            .validate(&MeanModel::default(), &data(vec![1.0, 1.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(report.records.len(), 4);
        assert!(report.records.iter().all(|r| r.mape.is_none()));
        assert!(report.mean_mape().is_none());

        let df = report.to_dataframe().unwrap();
        assert_eq!(df.column("MAPE").unwrap().null_count(), 4);
    }

    #[test]
    fn test_report_dataframe_columns() {
        let report = WalkForwardValidator::new()
            .validate(&MeanModel::default(), &data(vec![1.0; 6]))
            .unwrap();
        let df = report.to_dataframe().unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["TrainPart", "Actual", "Predicted", "MAPE"]);
        assert_eq!(df.height(), 4);
    }

    #[test]
    fn test_walk_forward_test_months() {
        let d = data((1..=12).map(|v| v as f64).collect());
        let report = WalkForwardValidator::new()
            .walk_forward_test(&MeanModel::default(), &d)
            .unwrap();

        let months: Vec<NaiveDate> = report.records.iter().map(|r| r.month).collect();
        assert_eq!(months, vec![d.months[6], d.months[9], d.months[11]]);
        assert_eq!(report.records[2].actual, 12.0);

        let df = report.to_dataframe().unwrap();
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_validate_insufficient_data() {
        let result = WalkForwardValidator::new().validate(&MeanModel::default(), &data(vec![1.0; 3]));
        assert!(matches!(result, Err(ForecastError::InsufficientData { .. })));
    }
}
