//! Forecast configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::timeseries::FeatureConfig;
use crate::training::GradientBoostingConfig;

/// Default name of the forecast target
pub const DEFAULT_TARGET: &str = "Deals";

/// Configuration for the whole forecasting pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Raw column the model predicts
    pub target_column: String,

    /// Name of the month column in raw CSV input; detected when unset
    pub month_column: Option<String>,

    /// Feature engineering settings
    pub features: FeatureConfig,

    /// Boosting hyperparameters
    pub model: GradientBoostingConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            target_column: DEFAULT_TARGET.to_string(),
            month_column: None,
            features: FeatureConfig::default(),
            model: GradientBoostingConfig::default(),
        }
    }
}

impl ForecastConfig {
    /// Create a new forecast configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::FileNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to set the target column
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    /// Builder method to set the raw month column name
    pub fn with_month_column(mut self, name: impl Into<String>) -> Self {
        self.month_column = Some(name.into());
        self
    }

    /// Builder method to set the seasonality period
    pub fn with_seasonality_period(mut self, period: usize) -> Self {
        self.features.seasonality_period = period;
        self
    }

    /// Builder method to turn seasonal columns off
    pub fn without_seasonality(mut self) -> Self {
        self.features.include_seasonality = false;
        self
    }

    /// Builder method to restrict the raw columns used as lag sources
    pub fn with_source_columns(mut self, columns: Vec<String>) -> Self {
        self.features.source_columns = Some(columns);
        self
    }

    /// Builder method to set boosting hyperparameters
    pub fn with_model(mut self, model: GradientBoostingConfig) -> Self {
        self.model = model;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_column.trim().is_empty() {
            return Err(ForecastError::InvalidConfiguration(
                "target_column must not be empty".to_string(),
            ));
        }
        if self.features.include_seasonality && self.features.seasonality_period == 0 {
            return Err(ForecastError::InvalidConfiguration(
                "seasonality_period must be positive".to_string(),
            ));
        }
        self.model.validate()
    }
}
