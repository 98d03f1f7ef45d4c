//! Next-month forecaster

use std::path::Path;
use std::time::Instant;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::artifact::ModelArtifact;
use crate::error::{ForecastError, Result};
use crate::timeseries::TimeSeriesTable;
use crate::training::{GradientBoostingRegressor, Regressor, TrainedModel};

/// A single forecast value and the month it belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    pub month: NaiveDate,
    pub value: f64,
}

/// Model and feature table loaded from one artifact
#[derive(Debug, Clone)]
pub struct Forecaster<M = GradientBoostingRegressor> {
    model: TrainedModel<M>,
    features: TimeSeriesTable,
}

impl Forecaster {
    /// Open a gradient boosting artifact.
    pub fn open(artifact_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_as(artifact_path)
    }
}

impl<M: Regressor + DeserializeOwned> Forecaster<M> {
    /// Open an artifact holding a model of type `M`.
    ///
    /// A save racing this call can leave the directory briefly missing
    /// (`FileNotFound`) or pair the old model with the new feature file
    /// (`ArtifactChanged`). Both are returned as is; opening again later reads
    /// the new artifact.
    pub fn open_as(artifact_path: impl AsRef<Path>) -> Result<Self> {
        let (model, features) = ModelArtifact::open(artifact_path)?.load::<M>()?;
        Self::from_parts(model, features)
    }

    /// Pair a trained model with its feature table.
    ///
    /// The table's columns must equal the model's feature names, in order.
    pub fn from_parts(model: TrainedModel<M>, features: TimeSeriesTable) -> Result<Self> {
        model.check_schema(features.column_names())?;
        Ok(Self { model, features })
    }

    pub fn model(&self) -> &TrainedModel<M> {
        &self.model
    }

    pub fn features(&self) -> &TimeSeriesTable {
        &self.features
    }

    /// Predict the target for the last row of the feature table.
    pub fn forecast(&self) -> Result<Forecast> {
        let start = Instant::now();
        let last = self.features.len().checked_sub(1).ok_or_else(|| {
            ForecastError::DataError("feature table has no rows".to_string())
        })?;
        let month = self.features.months()[last];
        let row = self
            .features
            .row(last)
            .ok_or_else(|| ForecastError::DataError(format!("missing feature row {}", last)))?;

        let value = self.model.predict_row(self.features.column_names(), &row)?;
        info!(
            month = %month,
            value,
            model = self.model.model.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "forecast"
        );
        Ok(Forecast { month, value })
    }

    /// Predict the target value for the next month.
    pub fn predict_next(&self) -> Result<f64> {
        Ok(self.forecast()?.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::AlignedData;
    use crate::training::{train, GradientBoostingConfig};
    use ndarray::{Array1, Array2};

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    fn trained(names: &[&str]) -> TrainedModel<GradientBoostingRegressor> {
        let data = AlignedData {
            months: (1..=4).map(month).collect(),
            feature_names: names.iter().map(|s| s.to_string()).collect(),
            x: Array2::from_shape_fn((4, names.len()), |(r, c)| (r + c) as f64),
            y: Array1::from_elem(4, 7.0),
        };
        let model = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 3,
            ..Default::default()
        });
        train(model, &data).unwrap()
    }

    fn features(names: &[&str]) -> TimeSeriesTable {
        TimeSeriesTable::new(
            (1..=5).map(month).collect(),
            names
                .iter()
                .map(|n| (n.to_string(), vec![1.0, 2.0, 3.0, 4.0, 5.0]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_forecast_uses_last_row() {
        let forecaster = Forecaster::from_parts(trained(&["a", "b"]), features(&["a", "b"])).unwrap();
        let forecast = forecaster.forecast().unwrap();
        assert_eq!(forecast.month, month(5));
        assert!((forecast.value - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_schema_mismatch() {
        let result = Forecaster::from_parts(trained(&["a", "b"]), features(&["a", "c"]));
        assert!(matches!(result, Err(ForecastError::SchemaMismatch { .. })));

        let result = Forecaster::from_parts(trained(&["a", "b"]), features(&["b", "a"]));
        assert!(matches!(result, Err(ForecastError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_open_rejects_features_from_another_save() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["a", "b"];
        let path = ModelArtifact::save(&trained(&names), &features(&names), dir.path(), "m").unwrap();

        let newer = features(&names).filter_rows(|i| i < 3);
        crate::utils::save_table(&newer, path.join("features.csv")).unwrap();

        let result = Forecaster::open(&path);
        assert!(matches!(result, Err(ForecastError::ArtifactChanged(_))));
    }

    #[test]
    fn test_open_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let result = Forecaster::open(dir.path().join("nothing"));
        assert!(matches!(result, Err(ForecastError::FileNotFound(_))));
    }
}
