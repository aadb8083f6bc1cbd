//! Command-line interface definitions.
//!
//! Every stage is its own subcommand so a run can be resumed from any point;
//! `run` chains them all. Paths default to the locations derived from the
//! configuration file.

use crate::config::PipelineConfig;
use crate::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Newspaper metadata ETL pipeline.
///
/// # Examples
///
/// ```sh
/// # Whole pipeline with defaults
/// newspaper_etl run
///
/// # Fetch two pages of a different collection
/// newspaper_etl --config etl.yaml fetch --max-pages 2 --collection chronicling-america
///
/// # Re-clean an existing flattened file
/// newspaper_etl clean --input data/processed/newspapers.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long, global = true, env = "NEWSPAPER_ETL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings that override the configuration file for one invocation.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    /// Maximum number of API pages to request
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Collection to fetch
    #[arg(long)]
    pub collection: Option<String>,
}

impl Overrides {
    /// Copy the given settings onto `config` and revalidate it.
    pub fn apply(&self, config: &mut PipelineConfig) -> Result<()> {
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(collection) = &self.collection {
            config.collection = collection.clone();
        }
        config.validate()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download raw records from the API
    Fetch {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Flatten a raw JSON file into CSV
    Flatten {
        /// Raw JSON input (default: the configured raw file)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// CSV output (default: derived from the input name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Clean a flattened CSV into accepted and rejected files
    Clean {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        rejected: Option<PathBuf>,
    },
    /// Drop and recreate the database tables
    Schema,
    /// Load a cleaned CSV into the database
    Load {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Render chart reports from the database
    Charts,
    /// Run every stage in order
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_without_arguments() {
        let cli = Cli::parse_from(["newspaper_etl", "run"]);
        assert!(cli.config.is_none());
        match cli.command {
            Command::Run { overrides } => assert_eq!(overrides, Overrides::default()),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_fetch_overrides() {
        let cli = Cli::parse_from([
            "newspaper_etl",
            "--config",
            "etl.yaml",
            "fetch",
            "--max-pages",
            "2",
            "--collection",
            "maps",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("etl.yaml")));
        match cli.command {
            Command::Fetch { overrides } => {
                assert_eq!(overrides.max_pages, Some(2));
                assert_eq!(overrides.collection.as_deref(), Some("maps"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_clean_short_flags() {
        let cli = Cli::parse_from(["newspaper_etl", "clean", "-i", "in.csv", "-o", "out.csv"]);
        match cli.command {
            Command::Clean { input, output, rejected } => {
                assert_eq!(input, Some(PathBuf::from("in.csv")));
                assert_eq!(output, Some(PathBuf::from("out.csv")));
                assert!(rejected.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = PipelineConfig::default();
        let overrides = Overrides {
            max_pages: Some(3),
            collection: Some("maps".to_string()),
        };
        overrides.apply(&mut config).unwrap();
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.collection, "maps");
        assert_eq!(config.page_delay_ms, 1000);
    }

    #[test]
    fn test_overrides_rejects_zero_pages() {
        let mut config = PipelineConfig::default();
        let overrides = Overrides {
            max_pages: Some(0),
            collection: None,
        };
        assert!(overrides.apply(&mut config).is_err());
    }

    #[test]
    fn test_config_after_subcommand() {
        let cli = Cli::parse_from(["newspaper_etl", "schema", "-c", "etl.yaml"]);
        assert_eq!(cli.config, Some(PathBuf::from("etl.yaml")));
        assert!(matches!(cli.command, Command::Schema));
    }
}
