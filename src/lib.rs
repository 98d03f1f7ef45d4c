//! Deal Forecast - monthly sales forecasting
//!
//! This crate turns a monthly CSV of sales activity into a one-month-ahead
//! forecast of a target metric (deals by default):
//! - Lag-1 and seasonal feature engineering on a month-keyed table
//! - Gradient boosted regression trees
//! - Walk-forward validation with MAPE
//! - Atomically replaced on-disk model artifacts
//!
//! # Modules
//!
//! ## Core
//! - [`timeseries`] - Month-keyed tables, features, alignment, validation
//! - [`training`] - Regression trees and gradient boosting
//! - [`inference`] - Next-month forecasting from a saved artifact
//! - [`artifact`] - Model artifact layout and persistence
//!
//! ## Workflows
//! - [`pipeline`] - Prepare, train, validate, smoke-test and forecast jobs
//! - [`config`] - Pipeline configuration
//! - [`cli`] - Command-line interface
//!
//! ## Utilities
//! - [`utils`] - CSV loading and saving

// Core error handling
pub mod error;

// Core modules
pub mod timeseries;
pub mod training;
pub mod inference;
pub mod artifact;

// Workflows
pub mod config;
pub mod pipeline;
pub mod cli;

// Utilities
pub mod utils;

pub use artifact::ModelArtifact;
pub use config::ForecastConfig;
pub use error::{ForecastError, Result};
pub use inference::{Forecast, Forecaster};
pub use timeseries::{AlignedData, FeatureBuilder, TimeSeriesTable, WalkForwardValidator};
pub use training::{GradientBoostingConfig, GradientBoostingRegressor, Regressor, TrainedModel};
