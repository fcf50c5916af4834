//! FARS - Accident Data Summaries & State Accident Maps
//!
//! Command-line front end: monthly summaries across years and per-state maps.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fars::{Config, DataProcessor, MapOutcome, StateMapper};
use polars::prelude::{CsvWriter, SerWriter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "fars")]
#[command(about = "Summarize and map FARS traffic-fatality data", long_about = None)]
struct Cli {
    /// Directory containing the accident_<year>.csv.bz2 files
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count accidents per month for each year
    Summarize {
        #[arg(required = true, value_name = "YEAR")]
        years: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Plot the accidents of one state in one year
    Map {
        /// Numeric FARS state code
        state: String,

        year: String,

        /// PNG file to write
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// GeoJSON file with state boundaries
        #[arg(short, long)]
        boundaries: Option<PathBuf>,

        /// Open the map in the default image viewer
        #[arg(long)]
        open: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Commands::Summarize { years, format } => summarize(&config, &years, format),
        Commands::Map {
            state,
            year,
            output,
            boundaries,
            open,
        } => {
            if let Some(output) = output {
                config.output = output;
            }
            if boundaries.is_some() {
                config.boundaries = boundaries;
            }
            map(&config, &state, &year, open)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn summarize(config: &Config, years: &[String], format: Format) -> Result<()> {
    let table = DataProcessor::summarize_years(&config.loader(), years)?;

    match format {
        Format::Table => print!("{}", table),
        Format::Csv => {
            let mut df = table.to_dataframe()?;
            CsvWriter::new(std::io::stdout())
                .finish(&mut df)
                .context("Failed to write CSV summary")?;
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(&table)?),
    }
    Ok(())
}

fn map(config: &Config, state: &str, year: &str, open: bool) -> Result<()> {
    let mapper = StateMapper::new(config.loader(), config.map_options());

    match mapper.map_state(state, year)? {
        MapOutcome::Rendered(map) => {
            info!(
                "Plotted {} accidents for state {} in {} to {}",
                map.points,
                map.state,
                map.year,
                map.output.display()
            );
            if open {
                open::that(&map.output)
                    .with_context(|| format!("Failed to open {}", map.output.display()))?;
            }
        }
        MapOutcome::NoAccidents => {}
    }
    Ok(())
}
