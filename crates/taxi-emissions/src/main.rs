use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::analyze::{handle_analyze_command, AnalyzeArgs};
use commands::run::{handle_run_command, RunArgs};

/// Taxi trip emissions fact pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pipeline configuration (TOML). Built-in defaults are used when omitted.
    #[arg(long, global = true, env = "TAXI_EMISSIONS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build fct_trips and fct_trips_enriched and write the materialized outputs
    Run(RunArgs),
    /// Print the data quality checklist for fct_trips
    Quality,
    /// Print emissions analysis tables over fct_trips_enriched
    Analyze(AnalyzeArgs),
    /// Print the number of distinct taxi categories in fct_trips
    Categories,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => handle_run_command(&config, args),
        Command::Quality => commands::quality::handle_quality_command(&config),
        Command::Analyze(args) => handle_analyze_command(&config, args),
        Command::Categories => commands::categories::handle_categories_command(&config),
    }
}
