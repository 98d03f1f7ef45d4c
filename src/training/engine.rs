//! Fitting a regressor on aligned data and carrying its feature schema

use std::time::Instant;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Regressor;
use crate::error::{ForecastError, Result};
use crate::timeseries::AlignedData;

/// A fitted regressor together with the schema it was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel<M> {
    /// Feature names in the column order the model expects
    pub feature_names: Vec<String>,
    /// Number of training rows
    pub n_samples: usize,
    pub model: M,
    /// Fingerprint of the feature file saved beside the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features_fingerprint: Option<u64>,
}

impl<M: Regressor> TrainedModel<M> {
    /// Check a caller's feature names against the training schema.
    pub fn check_schema<S: AsRef<str>>(&self, feature_names: &[S]) -> Result<()> {
        let matches = feature_names.len() == self.feature_names.len()
            && feature_names
                .iter()
                .zip(self.feature_names.iter())
                .all(|(a, b)| a.as_ref() == b);
        if matches {
            Ok(())
        } else {
            Err(ForecastError::SchemaMismatch {
                expected: self.feature_names.clone(),
                actual: feature_names.iter().map(|s| s.as_ref().to_string()).collect(),
            })
        }
    }

    /// Predict a single feature row whose columns are named `feature_names`.
    pub fn predict_row<S: AsRef<str>>(&self, feature_names: &[S], row: &[f64]) -> Result<f64> {
        self.check_schema(feature_names)?;
        if row.len() != feature_names.len() {
            return Err(ForecastError::DataError(format!(
                "row has {} values for {} feature columns",
                row.len(),
                feature_names.len()
            )));
        }

        let x = Array2::from_shape_vec((1, row.len()), row.to_vec())?;
        let predictions = self.model.predict(&x)?;
        predictions
            .get(0)
            .copied()
            .ok_or_else(|| ForecastError::DataError("model returned no prediction".to_string()))
    }
}

/// Fit `model` once on the full aligned data.
pub fn train<M: Regressor>(mut model: M, data: &AlignedData) -> Result<TrainedModel<M>> {
    if data.is_empty() {
        return Err(ForecastError::FitFailure(
            "no months shared by features and target".to_string(),
        ));
    }

    let start = Instant::now();
    model.fit(&data.x, &data.y)?;
    info!(
        model = model.name(),
        rows = data.len(),
        features = data.feature_names.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "model trained"
    );

    Ok(TrainedModel {
        feature_names: data.feature_names.clone(),
        n_samples: data.len(),
        model,
        features_fingerprint: None,
    })
}
