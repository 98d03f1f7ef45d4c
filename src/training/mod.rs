//! Model training module
//!
//! Provides the regression models behind the forecast:
//! - Regression decision tree (weak learner)
//! - Gradient boosted trees
//! - Fitting on aligned month data with the feature schema attached

mod engine;
mod models;
pub mod decision_tree;
pub mod gradient_boosting;

pub use decision_tree::{DecisionTree, TreeNode};
pub use engine::{train, TrainedModel};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use models::Regressor;
