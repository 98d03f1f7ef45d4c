//! Inference module
//!
//! Loads a saved model artifact and predicts the month after the last
//! observed one from the artifact's own next-month feature row.

mod engine;

pub use engine::{Forecast, Forecaster};
