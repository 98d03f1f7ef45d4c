//! Time series module
//!
//! Provides the month-keyed table and everything built on it:
//! - Lag and seasonal feature engineering
//! - Month alignment of features and target
//! - Walk-forward validation

mod align;
mod features;
mod table;
mod validation;

pub use align::{align, intersect_months, AlignedData};
pub use features::{
    build_feature_table, compute_seasonal, derive_lag_column, lag_column_name, FeatureBuilder,
    FeatureConfig, COS_SEASON, DEFAULT_PERIOD, LAG_SUFFIX, SIN_SEASON,
};
pub use table::{next_month, normalize_month, parse_month, TimeSeriesTable, MONTH_COLUMN, MONTH_FORMAT};
pub use validation::{
    mape, smoke_test_splits, walk_forward_splits, SmokeTestRecord, SmokeTestReport,
    ValidationRecord, ValidationReport, WalkForwardValidator, MIN_VALIDATION_ROWS,
};
