//! End-to-end forecasting workflows
//!
//! Each entry point reads the raw monthly CSV, derives features and target,
//! and runs one job: preparing data, training and saving a model, forecasting
//! from a saved model, or validating the model walk-forward.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::artifact::ModelArtifact;
use crate::config::ForecastConfig;
use crate::error::{ForecastError, Result};
use crate::inference::Forecaster;
use crate::timeseries::{
    align, build_feature_table, AlignedData, SmokeTestReport, TimeSeriesTable, ValidationReport,
    WalkForwardValidator,
};
use crate::training::{train, GradientBoostingRegressor};
use crate::utils::{load_table, save_table};

/// Load the raw monthly series.
pub fn load_raw(path: impl AsRef<Path>, config: &ForecastConfig) -> Result<TimeSeriesTable> {
    load_table(path, config.month_column.as_deref())
}

/// Month plus the single raw `target` column. Months without a target value
/// are left out.
pub fn target_table(raw: &TimeSeriesTable, target: &str) -> Result<TimeSeriesTable> {
    if !raw.has_column(target) {
        return Err(ForecastError::InvalidConfiguration(format!(
            "target column {:?} not in raw data (columns: {:?})",
            target,
            raw.column_names()
        )));
    }
    let selected = raw.select(&[target]);
    Ok(selected.filter_rows(|i| !selected.row_has_undefined(i)))
}

/// Build the feature table from raw data and write it to `output_csv`.
pub fn prepare_data(
    raw_path: impl AsRef<Path>,
    output_csv: impl AsRef<Path>,
    config: &ForecastConfig,
) -> Result<TimeSeriesTable> {
    config.validate()?;
    let raw = load_raw(raw_path, config)?;
    let features = build_feature_table(&raw, &config.features)?;
    save_table(&features, output_csv.as_ref())?;

    info!(
        output = %output_csv.as_ref().display(),
        rows = features.len(),
        columns = features.column_names().len(),
        "feature table prepared"
    );
    Ok(features)
}

fn training_inputs(
    raw_path: &Path,
    target: &str,
    config: &ForecastConfig,
) -> Result<(TimeSeriesTable, AlignedData)> {
    config.validate()?;
    let raw = load_raw(raw_path, config)?;
    let targets = target_table(&raw, target)?;
    let features = build_feature_table(&raw, &config.features)?;
    let data = align(&features, &targets)?;
    info!(
        raw_rows = raw.len(),
        feature_rows = features.len(),
        aligned_rows = data.len(),
        target,
        "training data aligned"
    );
    Ok((features, data))
}

fn model(config: &ForecastConfig) -> GradientBoostingRegressor {
    GradientBoostingRegressor::new(config.model.clone())
}

/// Train on all available months and save artifact `artifact_name` under
/// `artifact_dir`. Returns the artifact path.
pub fn train_and_save(
    raw_path: impl AsRef<Path>,
    target: &str,
    artifact_dir: impl AsRef<Path>,
    artifact_name: &str,
    config: &ForecastConfig,
) -> Result<PathBuf> {
    let (features, data) = training_inputs(raw_path.as_ref(), target, config)?;
    let trained = train(model(config), &data)?;
    ModelArtifact::save(&trained, &features, artifact_dir, artifact_name)
}

/// Forecast the month after the last raw month from a saved artifact.
pub fn forecast_next(artifact_path: impl AsRef<Path>) -> Result<f64> {
    Forecaster::open(artifact_path)?.predict_next()
}

/// Walk-forward validation at splits n/2, 3n/4, n-2 and n-1.
pub fn validate(raw_path: impl AsRef<Path>, target: &str, config: &ForecastConfig) -> Result<ValidationReport> {
    let (_, data) = training_inputs(raw_path.as_ref(), target, config)?;
    WalkForwardValidator::new().validate(&model(config), &data)
}

/// Quick walk-forward check at splits n/2, 3n/4 and n-1.
pub fn smoke_test(raw_path: impl AsRef<Path>, target: &str, config: &ForecastConfig) -> Result<SmokeTestReport> {
    let (_, data) = training_inputs(raw_path.as_ref(), target, config)?;
    WalkForwardValidator::new().walk_forward_test(&model(config), &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    fn raw_csv(dir: &Path, deals: &[f64]) -> PathBuf {
        let mut content = String::from("Month,Deals,Calls\n");
        for (i, d) in deals.iter().enumerate() {
            let year = 2023 + (i / 12) as i32;
            let month = i % 12 + 1;
            writeln!(content, "{}-{:02}-01,{},{}", year, month, d, 10 * (i + 1)).unwrap();
        }
        let path = dir.join("raw.csv");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_target_table_unknown_column() {
        let dir = tempfile::tempdir().unwrap();
        let raw = load_raw(raw_csv(dir.path(), &[1.0, 2.0]), &ForecastConfig::default()).unwrap();

        assert_eq!(target_table(&raw, "Deals").unwrap().column_names(), &["Deals".to_string()]);
        assert!(matches!(
            target_table(&raw, "Revenue"),
            Err(ForecastError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_prepare_data_writes_features() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_csv(dir.path(), &[5.0; 6]);
        let output = dir.path().join("prepared.csv");

        let features = prepare_data(&raw, &output, &ForecastConfig::default()).unwrap();
        assert_eq!(features.len(), 6);
        assert_eq!(
            features.column_names(),
            &["Deals lag1", "Calls lag1", "sin_season", "cos_season"].map(String::from)
        );
        assert!(output.is_file());
    }

    #[test]
    fn test_constant_target_forecast() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_csv(dir.path(), &[100.0; 12]);

        let path = train_and_save(&raw, "Deals", dir.path().join("models"), "deals", &ForecastConfig::default())
            .unwrap();
        let value = forecast_next(&path).unwrap();
        assert!((value - 100.0).abs() < 1e-6, "forecast was {}", value);
    }

    #[test]
    fn test_validate_report_shape() {
        let dir = tempfile::tempdir().unwrap();
        let deals: Vec<f64> = (1..=12).map(|i| 10.0 + i as f64).collect();
        let raw = raw_csv(dir.path(), &deals);

        let report = validate(&raw, "Deals", &ForecastConfig::default()).unwrap();
        let parts: Vec<&str> = report.records.iter().map(|r| r.train_part.as_str()).collect();
        // 12 raw months align to 11 feature rows
        assert_eq!(parts, vec!["5/11", "8/11", "9/11", "10/11"]);
        assert!(report.records.iter().all(|r| r.mape.is_some()));
    }

    #[test]
    fn test_smoke_test_months() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_csv(dir.path(), &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);

        let report = smoke_test(&raw, "Deals", &ForecastConfig::default()).unwrap();
        assert_eq!(report.records.len(), 3);
        // 7 aligned rows from 2023-02: splits 3, 5, 6
        let months: Vec<String> = report.records.iter().map(|r| r.month.to_string()).collect();
        assert_eq!(months, vec!["2023-05-01", "2023-07-01", "2023-08-01"]);
    }

    #[test]
    fn test_validate_too_short() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_csv(dir.path(), &[1.0, 2.0, 3.0, 4.0]);
        let result = validate(&raw, "Deals", &ForecastConfig::default());
        assert!(matches!(
            result,
            Err(ForecastError::InsufficientData { required: 4, actual: 3 })
        ));
    }
}
