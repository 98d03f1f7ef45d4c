//! Deal Forecast CLI Module
//!
//! Command-line interface for preparing data, training, validating and
//! forecasting.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::ForecastConfig;
use crate::inference::Forecaster;
use crate::pipeline;
use crate::utils::save_csv;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white().bold());
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn print_table(rendered: &str) {
    println!();
    for line in rendered.lines() {
        println!("  {}", line);
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "deal-forecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Monthly deal forecasting with gradient boosted trees")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the feature table from raw monthly data
    Prepare {
        /// Raw monthly CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Output feature CSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Train on all months and save the model artifact
    Train {
        /// Raw monthly CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Target column (defaults to the configured target)
        #[arg(short, long)]
        target: Option<String>,

        /// Directory holding model artifacts
        #[arg(long, default_value = "saved_models")]
        dir: PathBuf,

        /// Artifact name
        #[arg(short, long, default_value = "deals_model")]
        name: String,
    },

    /// Walk-forward validation at n/2, 3n/4, n-2 and n-1
    Validate {
        /// Raw monthly CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Target column (defaults to the configured target)
        #[arg(short, long)]
        target: Option<String>,

        /// Write the report as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Quick walk-forward check at n/2, 3n/4 and n-1
    SmokeTest {
        /// Raw monthly CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Target column (defaults to the configured target)
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Forecast the next month from a saved artifact
    Predict {
        /// Artifact directory
        #[arg(short, long)]
        model: PathBuf,
    },
}

/// Load `--config` or fall back to defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ForecastConfig> {
    let config = match path {
        Some(path) => ForecastConfig::from_json_file(path)?,
        None => ForecastConfig::default(),
    };
    Ok(config)
}

fn target_or_default<'a>(target: Option<&'a str>, config: &'a ForecastConfig) -> &'a str {
    target.unwrap_or(&config.target_column)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_prepare(data: &Path, output: &Path, config: &ForecastConfig) -> anyhow::Result<()> {
    section("Prepare");

    step_run(&format!("Building features → {}", output.display()));
    let start = Instant::now();
    let features = pipeline::prepare_data(data, output, config)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        features.len(),
        features.column_names().len(),
        start.elapsed()
    ));

    if let Some(last) = features.last_month() {
        kv("Forecast month", &last.to_string());
    }
    println!();
    Ok(())
}

pub fn cmd_train(
    data: &Path,
    target: Option<&str>,
    dir: &Path,
    name: &str,
    config: &ForecastConfig,
) -> anyhow::Result<()> {
    section("Train");
    let target = target_or_default(target, config);

    step_run(&format!("Training on {}", target.cyan()));
    let start = Instant::now();
    let path = pipeline::train_and_save(data, target, dir, name, config)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_ok(&format!("Saved {}", path.display()));
    println!();
    Ok(())
}

pub fn cmd_validate(
    data: &Path,
    target: Option<&str>,
    output: Option<&Path>,
    config: &ForecastConfig,
) -> anyhow::Result<()> {
    section("Validate");
    let target = target_or_default(target, config);

    step_run(&format!("Walk-forward on {}", target.cyan()));
    let start = Instant::now();
    let report = pipeline::validate(data, target, config)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_table(&report.to_string());
    match report.mean_mape() {
        Some(m) => kv("Mean MAPE", &format!("{:.2}%", m)),
        None => kv("Mean MAPE", "-"),
    }

    if let Some(output) = output {
        let mut df = report.to_dataframe()?;
        save_csv(&mut df, output)?;
        step_ok(&format!("Report written to {}", output.display()));
    }
    println!();
    Ok(())
}

pub fn cmd_smoke_test(data: &Path, target: Option<&str>, config: &ForecastConfig) -> anyhow::Result<()> {
    section("Smoke test");
    let target = target_or_default(target, config);

    step_run(&format!("Walk-forward on {}", target.cyan()));
    let start = Instant::now();
    let report = pipeline::smoke_test(data, target, config)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_table(&report.to_string());
    println!();
    Ok(())
}

pub fn cmd_predict(model: &Path) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading artifact");
    let forecaster = Forecaster::open(model)?;
    step_done(&format!("{} features", forecaster.model().feature_names.len()));

    let forecast = forecaster.forecast()?;
    println!();
    kv("Month", &forecast.month.to_string());
    kv("Forecast", &format!("{:.2}", forecast.value));
    println!();
    Ok(())
}
