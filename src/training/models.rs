//! Regressor trait

use crate::error::Result;
use ndarray::{Array1, Array2};

/// A regression model the forecasting pipeline can fit and query.
///
/// Implementations must be deterministic for a fixed configuration, and
/// `fit` must discard any state from a previous fit.
pub trait Regressor: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}
