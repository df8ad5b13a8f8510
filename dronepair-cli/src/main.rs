//! DronePair CLI - Command-line interface
//!
//! Generates random landmark locations and camera pairs, manages the
//! configuration file and follows dataset generation progress.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::generate::GenerateArgs;
use commands::monitor::MonitorArgs;
use commands::place::PlaceArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Debug, Parser)]
#[command(name = "dronepair", version, about = "Paired aerial views of real landmarks")]
struct Cli {
    /// Configuration file (default: ~/.dronepair/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate random landmark locations
    Generate {
        /// Number of locations to generate
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,

        /// Place cameras and classify a view pair for each location
        #[arg(long)]
        pairs: bool,

        /// Seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Place a camera pair around a coordinate
    Place {
        /// Anchor latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Anchor longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Seed for reproducible placement
        #[arg(long)]
        seed: Option<u64>,

        /// Print the pair as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Follow generation progress by counting files in a folder
    Monitor {
        /// Folder receiving generated items
        folder: PathBuf,

        /// Item count to wait for
        target: usize,

        /// Print progress lines instead of a progress bar
        #[arg(long)]
        plain: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Generate {
            count,
            json,
            pairs,
            seed,
        } => {
            let runner = CliRunner::new(config_path, cli.verbose)?;
            commands::generate::run(
                &runner,
                GenerateArgs {
                    count,
                    json,
                    pairs,
                    seed,
                },
            )
        }
        Commands::Place {
            lat,
            lon,
            seed,
            json,
        } => {
            let runner = CliRunner::new(config_path, cli.verbose)?;
            commands::place::run(
                &runner,
                PlaceArgs {
                    lat,
                    lon,
                    seed,
                    json,
                },
            )
        }
        Commands::Config { command } => commands::config::run(command, config_path),
        Commands::Monitor {
            folder,
            target,
            plain,
        } => commands::monitor::run(MonitorArgs {
            folder,
            target,
            plain,
        }),
    }
}
