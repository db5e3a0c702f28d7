//! Stockpile Ignition Forecast CLI
//!
//! A command-line tool for uploading measurement files, running ignition
//! forecasts and browsing pile and weather history.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{forecast, piles, predict, upload, weather};
use std::path::PathBuf;

/// Stockpile Ignition Forecast CLI
#[derive(Parser)]
#[command(name = "ignctl")]
#[command(author, version, about = "CLI for the Stockpile Ignition Forecast service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via IGNITION_API_URL env var)
    #[arg(long, env = "IGNITION_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a CSV file of temperatures, fires, weather or supplies
    Upload {
        /// Path to the CSV file
        file: PathBuf,

        /// File kind (temperature, fire, weather, supply); inferred from the name if omitted
        #[arg(long, short)]
        kind: Option<String>,
    },

    /// Forecast high-risk piles over a date window
    Forecast {
        /// Days after the latest recorded data
        #[arg(long, conflicts_with_all = ["start", "end"])]
        days: Option<u32>,

        /// First day of an explicit window (YYYY-MM-DD)
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Last day of an explicit window (YYYY-MM-DD)
        #[arg(long, requires = "start")]
        end: Option<String>,
    },

    /// Predict days to ignition for one pile
    Predict {
        /// JSON file with the pile's feature fields
        #[arg(long, short)]
        input: PathBuf,

        /// Reference date for the prediction (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// List warehouses, or the piles of one warehouse
    Piles {
        /// Warehouse number
        #[arg(long, short)]
        warehouse: Option<i64>,
    },

    /// Show the age of a pile in days
    Age {
        /// Warehouse number
        #[arg(long, short)]
        warehouse: i64,

        /// Pile identifier
        #[arg(long, short)]
        pile: String,
    },

    /// Show daily weather, or a pile's history when a pile is given
    Weather {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Warehouse number of the pile
        #[arg(long, short, requires = "pile")]
        warehouse: Option<i64>,

        /// Pile identifier
        #[arg(long, short, requires = "warehouse")]
        pile: Option<String>,
    },

    /// Reload the regression model on the server
    ReloadModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Upload { file, kind } => {
            upload::upload_file(&client, &file, kind, cli.format).await?;
        }
        Commands::Forecast { days, start, end } => {
            forecast::show_forecast(&client, days, start, end, cli.format).await?;
        }
        Commands::Predict { input, date } => {
            predict::predict(&client, &input, date, cli.format).await?;
        }
        Commands::Piles { warehouse } => {
            piles::list(&client, warehouse, cli.format).await?;
        }
        Commands::Age { warehouse, pile } => {
            piles::show_age(&client, warehouse, &pile, cli.format).await?;
        }
        Commands::Weather {
            start,
            end,
            warehouse,
            pile,
        } => {
            weather::show_weather(&client, start, end, warehouse, pile, cli.format).await?;
        }
        Commands::ReloadModel => {
            predict::reload_model(&client, cli.format).await?;
        }
    }

    Ok(())
}
