//! Deal Forecast - Main Entry Point

use clap::Parser;
use deal_forecast::cli::{
    cmd_predict, cmd_prepare, cmd_smoke_test, cmd_train, cmd_validate, load_config, Cli, Commands,
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deal_forecast=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Prepare { data, output } => {
            cmd_prepare(&data, &output, &config)?;
        }
        Commands::Train { data, target, dir, name } => {
            cmd_train(&data, target.as_deref(), &dir, &name, &config)?;
        }
        Commands::Validate { data, target, output } => {
            cmd_validate(&data, target.as_deref(), output.as_deref(), &config)?;
        }
        Commands::SmokeTest { data, target } => {
            cmd_smoke_test(&data, target.as_deref(), &config)?;
        }
        Commands::Predict { model } => {
            cmd_predict(&model)?;
        }
    }

    Ok(())
}
