//! Gradient Boosting implementation
//!
//! A native Rust implementation of gradient boosted regression trees,
//! similar to XGBoost's `XGBRegressor` with squared-error loss but simpler.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use super::Regressor;
use crate::error::{ForecastError, Result};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Subsample ratio for each tree
    pub subsample: f64,
    /// Column subsample ratio
    pub colsample_bytree: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_samples_leaf: 1,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(42),
        }
    }
}

impl GradientBoostingConfig {
    /// Reject settings the boosting loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidConfiguration(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::InvalidConfiguration(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, ratio) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ForecastError::InvalidConfiguration(format!(
                    "{} must be in (0, 1], got {}",
                    name, ratio
                )));
            }
        }
        Ok(())
    }
}

/// Gradient Boosting Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    col_indices_per_tree: Vec<Vec<usize>>,
    initial_prediction: f64,
    n_features: Option<usize>,
    feature_importances: Vec<f64>,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            col_indices_per_tree: Vec::new(),
            initial_prediction: 0.0,
            n_features: None,
            feature_importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.n_features.is_some()
    }

    /// Number of trees in the fitted ensemble
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    fn reset(&mut self) {
        self.trees.clear();
        self.col_indices_per_tree.clear();
        self.initial_prediction = 0.0;
        self.n_features = None;
        self.feature_importances.clear();
    }

    fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(ForecastError::FitFailure("cannot fit on zero rows".to_string()));
        }
        if x.nrows() != y.len() {
            return Err(ForecastError::FitFailure(format!(
                "x has {} rows but y has {} values",
                x.nrows(),
                y.len()
            )));
        }
        if x.ncols() == 0 {
            return Err(ForecastError::FitFailure("cannot fit without feature columns".to_string()));
        }
        if let Some((col, _)) = x
            .axis_iter(Axis(1))
            .enumerate()
            .find(|(_, col)| col.iter().any(|v| !v.is_finite()))
        {
            return Err(ForecastError::FitFailure(format!(
                "feature column {} contains undefined values",
                col
            )));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::FitFailure("target contains undefined values".to_string()));
        }
        Ok(())
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        sample_indices(n, self.config.subsample, rng)
    }

    fn colsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        sample_indices(n, self.config.colsample_bytree, rng)
    }
}

fn sample_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    if ratio >= 1.0 {
        return indices;
    }
    let sample_size = (((n as f64) * ratio).ceil() as usize).clamp(1, n);
    indices.shuffle(rng);
    indices.truncate(sample_size);
    indices.sort_unstable();
    indices
}

impl Regressor for GradientBoostingRegressor {
    fn name(&self) -> &'static str {
        "gradient_boosting"
    }

    /// Fit the ensemble from scratch; any previously fitted trees are discarded.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;
        Self::check_training_data(x, y)?;
        self.reset();

        let n_samples = x.nrows();
        let n_features = x.ncols();

        // Initialize with mean
        self.initial_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut importances = vec![0.0; n_features];

        for _ in 0..self.config.n_estimators {
            let residuals: Array1<f64> = y
                .iter()
                .zip(predictions.iter())
                .map(|(yi, pi)| yi - pi)
                .collect();

            let row_indices = self.subsample_indices(n_samples, &mut rng);
            let col_indices = self.colsample_indices(n_features, &mut rng);

            let x_sub = x.select(Axis(0), &row_indices).select(Axis(1), &col_indices);
            let y_sub: Array1<f64> = row_indices.iter().map(|&i| residuals[i]).collect();

            let mut tree = DecisionTree::new()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit(&x_sub, &y_sub)?;

            // Every row advances, including those left out of this tree's sample
            let tree_pred = tree.predict(&x.select(Axis(1), &col_indices))?;
            predictions.scaled_add(self.config.learning_rate, &tree_pred);

            if let Some(tree_importance) = tree.feature_importances() {
                for (j, &col_idx) in col_indices.iter().enumerate() {
                    importances[col_idx] += tree_importance[j];
                }
            }

            self.trees.push(tree);
            self.col_indices_per_tree.push(col_indices);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = importances;
        self.n_features = Some(n_features);

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let n_features = self.n_features.ok_or(ForecastError::ModelNotFitted)?;
        if x.ncols() != n_features {
            return Err(ForecastError::SchemaMismatch {
                expected: vec![format!("{} feature columns", n_features)],
                actual: vec![format!("{} feature columns", x.ncols())],
            });
        }

        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for (tree, col_indices) in self.trees.iter().zip(self.col_indices_per_tree.iter()) {
            let tree_pred = tree.predict(&x.select(Axis(1), col_indices))?;
            predictions.scaled_add(self.config.learning_rate, &tree_pred);
        }

        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((100, 2), (0..200).map(|i| i as f64 * 0.1).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| row[0] * 2.0 + row[1] * 0.5 + 1.0)
            .collect();
        (x, y)
    }

    fn small_config() -> GradientBoostingConfig {
        GradientBoostingConfig {
            n_estimators: 10,
            max_depth: 3,
            learning_rate: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_gradient_boosting_regressor() {
        let (x, y) = create_regression_data();
        let mut model = GradientBoostingRegressor::new(small_config());
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions.len(), 100);

        let mse: f64 = y
            .iter()
            .zip(predictions.iter())
            .map(|(yi, pi)| (yi - pi).powi(2))
            .sum::<f64>()
            / y.len() as f64;

        // MSE should be less than variance of y
        let y_var = y.var(0.0);
        assert!(mse < y_var, "MSE ({}) should be less than variance ({})", mse, y_var);
    }

    #[test]
    fn test_refit_discards_previous_trees() {
        let (x, y) = create_regression_data();
        let mut model = GradientBoostingRegressor::new(small_config());
        model.fit(&x, &y).unwrap();
        let first = model.predict(&x).unwrap();

        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_trees(), 10);
        assert_eq!(model.predict(&x).unwrap(), first);
    }

    #[test]
    fn test_constant_target() {
        let x = Array2::from_shape_fn((11, 3), |(r, c)| (r * (c + 1)) as f64);
        let y = Array1::from_elem(11, 100.0);

        let mut model = GradientBoostingRegressor::default();
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&Array2::from_elem((1, 3), 50.0)).unwrap();
        assert!((pred[0] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_subsampled_fit_is_seeded() {
        let (x, y) = create_regression_data();
        let config = GradientBoostingConfig {
            subsample: 0.8,
            colsample_bytree: 0.5,
            ..small_config()
        };
        let mut a = GradientBoostingRegressor::new(config.clone());
        let mut b = GradientBoostingRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_fit_rejects_bad_data() {
        let mut model = GradientBoostingRegressor::default();

        let empty = model.fit(&Array2::zeros((0, 2)), &Array1::zeros(0));
        assert!(matches!(empty, Err(ForecastError::FitFailure(_))));

        let mut x = Array2::from_elem((4, 2), 1.0);
        x.column_mut(1).fill(f64::NAN);
        let nan = model.fit(&x, &Array1::from_elem(4, 1.0));
        assert!(matches!(nan, Err(ForecastError::FitFailure(_))));
    }

    #[test]
    fn test_predict_checks_width() {
        let (x, y) = create_regression_data();
        let mut model = GradientBoostingRegressor::new(small_config());

        assert!(matches!(model.predict(&x), Err(ForecastError::ModelNotFitted)));

        model.fit(&x, &y).unwrap();
        let wrong = Array2::zeros((1, 3));
        assert!(matches!(
            model.predict(&wrong),
            Err(ForecastError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_config() {
        let config = GradientBoostingConfig {
            subsample: 0.0,
            ..Default::default()
        };
        let mut model = GradientBoostingRegressor::new(config);
        let (x, y) = create_regression_data();
        assert!(matches!(
            model.fit(&x, &y),
            Err(ForecastError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_feature_importances() {
        let (x, y) = create_regression_data();
        let mut model = GradientBoostingRegressor::new(small_config());
        model.fit(&x, &y).unwrap();

        let importances = model.feature_importances();
        assert_eq!(importances.len(), 2);

        let sum: f64 = importances.iter().sum();
        assert!((sum - 1.0).abs() < 0.01, "Sum of importances ({}) should be ~1", sum);
    }
}
