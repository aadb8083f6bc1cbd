//! # Newspaper ETL
//!
//! A batch pipeline over Library of Congress newspaper issue metadata: fetch
//! pages from the JSON API, flatten the nested records to CSV, clean and
//! validate them, load the result into SQLite and render summary charts.
//!
//! ## Usage
//!
//! ```sh
//! newspaper_etl run
//! newspaper_etl --config etl.yaml clean --input data/processed/newspapers.csv
//! ```
//!
//! ## Architecture
//!
//! The pipeline runs as sequential stages, each reading the file the previous
//! one wrote:
//! 1. **Fetch**: page through the API and save the raw records as JSON
//! 2. **Flatten**: lift nested fields into a fixed set of CSV columns
//! 3. **Clean**: deduplicate, reject incomplete rows, fill and normalize text
//! 4. **Schema / Load**: recreate the tables and insert the cleaned rows
//! 5. **Charts**: aggregate queries written as Markdown and JSON reports

use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, instrument};

mod api;
mod cli;
mod config;
mod dataset;
mod dates;
mod error;
mod logging;
mod models;
mod outputs;
mod stages;
mod utils;

use cli::{Cli, Command};
use config::PipelineConfig;
use stages::{charts, clean, fetch, flatten, load, schema};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    let mut config = PipelineConfig::load(args.config.as_deref())?;
    if let Command::Fetch { overrides } | Command::Run { overrides } = &args.command {
        overrides.apply(&mut config)?;
    }

    let _log_guard = logging::init_tracing(&config.log_dir)?;

    let start_time = Instant::now();
    info!(command = ?args.command, collection = %config.collection, "newspaper_etl starting up");

    let result = match args.command {
        Command::Fetch { .. } => fetch_stage(&config).await.map(|_| ()),
        Command::Flatten { input, output } => {
            let input = input.unwrap_or_else(|| config.raw_json_path());
            let output = output.unwrap_or_else(|| config.processed_csv_path(&input));
            flatten::flatten_json(&input, &output).map(|_| ())
        }
        Command::Clean {
            input,
            output,
            rejected,
        } => {
            let input = input.unwrap_or_else(|| config.processed_csv_path(&config.raw_json_path()));
            let output = output.unwrap_or_else(|| config.cleaned_csv_path());
            let rejected = rejected.unwrap_or_else(|| config.rejected_csv_path());
            clean_stage(&input, &output, &rejected)
        }
        Command::Schema => schema_stage(&config),
        Command::Load { input } => {
            let input = input.unwrap_or_else(|| config.cleaned_csv_path());
            load_stage(&input, &config)
        }
        Command::Charts => charts_stage(&config).await,
        Command::Run { .. } => run_pipeline(&config).await,
    };

    if let Err(e) = result {
        error!(error = %e, "Pipeline failed");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

async fn fetch_stage(config: &PipelineConfig) -> error::Result<PathBuf> {
    ensure_writable_dir(&config.raw_dir).await?;
    fetch::run(config).await
}

fn clean_stage(input: &Path, output: &Path, rejected: &Path) -> error::Result<()> {
    let summary = clean::clean_csv(input, output, rejected)?;
    println!("{}", summary);
    Ok(())
}

fn schema_stage(config: &PipelineConfig) -> error::Result<()> {
    let conn = schema::open(&config.database_path)?;
    schema::create_tables(&conn)
}

fn load_stage(input: &Path, config: &PipelineConfig) -> error::Result<()> {
    let report = load::load_csv(input, &config.database_path)?;
    info!(
        newspapers = report.newspapers,
        locations = report.locations,
        issues = report.issues,
        languages = report.languages,
        subjects = report.subjects,
        skipped = report.skipped,
        "Data loading complete"
    );
    Ok(())
}

async fn charts_stage(config: &PipelineConfig) -> error::Result<()> {
    let series = {
        let conn = schema::open(&config.database_path)?;
        charts::all_series(&conn)?
    };
    outputs::markdown::write_charts(&series, &config.reports_dir).await?;
    outputs::json::write_charts(&series, &config.reports_dir).await?;
    Ok(())
}

/// Every stage in dependency order. Output directories are checked up front
/// so a permissions problem fails before any network traffic.
#[instrument(level = "info", skip_all, fields(collection = %config.collection))]
async fn run_pipeline(config: &PipelineConfig) -> error::Result<()> {
    for dir in [&config.processed_dir, &config.cleaned_dir, &config.reports_dir] {
        ensure_writable_dir(dir).await?;
    }

    let stage_start = Instant::now();
    let raw = fetch_stage(config).await?;
    info!(elapsed_ms = stage_start.elapsed().as_millis() as u64, "Fetch stage done");

    let stage_start = Instant::now();
    let processed = flatten::flatten_json(&raw, &config.processed_csv_path(&raw))?;
    info!(elapsed_ms = stage_start.elapsed().as_millis() as u64, "Flatten stage done");

    let stage_start = Instant::now();
    let cleaned = config.cleaned_csv_path();
    clean_stage(&processed, &cleaned, &config.rejected_csv_path())?;
    info!(elapsed_ms = stage_start.elapsed().as_millis() as u64, "Clean stage done");

    let stage_start = Instant::now();
    schema_stage(config)?;
    load_stage(&cleaned, config)?;
    info!(elapsed_ms = stage_start.elapsed().as_millis() as u64, "Load stage done");

    let stage_start = Instant::now();
    charts_stage(config).await?;
    info!(elapsed_ms = stage_start.elapsed().as_millis() as u64, "Charts stage done");

    Ok(())
}
