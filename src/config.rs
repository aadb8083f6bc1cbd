//! Pipeline configuration.
//!
//! Settings are read from an optional YAML file. Every key has a default, so
//! an empty file (or no file at all) yields a working configuration that
//! writes under `data/`, `reports/` and `logs/` relative to the working
//! directory.

use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Paths and fetch settings for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Collection name on the API (`https://www.loc.gov/<collection>/`).
    pub collection: String,
    /// Upper bound on the number of result pages requested.
    pub max_pages: usize,
    /// Pause between page requests, in milliseconds.
    pub page_delay_ms: u64,
    /// Scheme and host of the API.
    pub api_base: String,
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub cleaned_dir: PathBuf,
    pub database_path: PathBuf,
    pub reports_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collection: "newspapers".to_string(),
            max_pages: 25,
            page_delay_ms: 1000,
            api_base: "https://www.loc.gov".to_string(),
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            cleaned_dir: PathBuf::from("data/cleaned"),
            database_path: PathBuf::from("data/newspapers.db"),
            reports_dir: PathBuf::from("reports"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration file, or fall back to defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| EtlError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&text)?;
        info!(path = %path.display(), collection = %config.collection, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)
            .map_err(|e| EtlError::Config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(EtlError::Config("collection must not be empty".to_string()));
        }
        if self.max_pages == 0 {
            return Err(EtlError::Config("max_pages must be at least 1".to_string()));
        }
        url::Url::parse(&self.api_base)
            .map_err(|e| EtlError::Config(format!("api_base {:?}: {}", self.api_base, e)))?;
        Ok(())
    }

    /// `<raw_dir>/<collection>_raw.json`
    pub fn raw_json_path(&self) -> PathBuf {
        self.raw_dir.join(format!("{}_raw.json", self.collection))
    }

    /// Flattened CSV for a raw JSON file: the `_raw.json` suffix becomes `.csv`.
    pub fn processed_csv_path(&self, raw_json: &Path) -> PathBuf {
        let name = raw_json
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}_raw.json", self.collection));
        let stem = name
            .strip_suffix("_raw.json")
            .or_else(|| name.strip_suffix(".json"))
            .unwrap_or(&name);
        self.processed_dir.join(format!("{}.csv", stem))
    }

    pub fn cleaned_csv_path(&self) -> PathBuf {
        self.cleaned_dir.join(format!("{}_cleaned.csv", self.collection))
    }

    pub fn rejected_csv_path(&self) -> PathBuf {
        self.cleaned_dir.join(format!("{}_rejected.csv", self.collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.raw_json_path(), PathBuf::from("data/raw/newspapers_raw.json"));
        assert_eq!(
            config.cleaned_csv_path(),
            PathBuf::from("data/cleaned/newspapers_cleaned.csv")
        );
        assert_eq!(
            config.rejected_csv_path(),
            PathBuf::from("data/cleaned/newspapers_rejected.csv")
        );
    }

    #[test]
    fn test_processed_path_strips_raw_suffix() {
        let config = PipelineConfig::default();
        let csv = config.processed_csv_path(Path::new("data/raw/newspapers_raw.json"));
        assert_eq!(csv, PathBuf::from("data/processed/newspapers.csv"));

        let csv = config.processed_csv_path(Path::new("/tmp/sample.json"));
        assert_eq!(csv, PathBuf::from("data/processed/sample.csv"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = PipelineConfig::from_yaml("max_pages: 3\ncleaned_dir: out/clean\n").unwrap();
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.cleaned_dir, PathBuf::from("out/clean"));
        assert_eq!(config.collection, "newspapers");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(PipelineConfig::from_yaml("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_rejects_zero_pages() {
        let err = PipelineConfig::from_yaml("max_pages: 0\n").unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_api_base() {
        assert!(PipelineConfig::from_yaml("api_base: not a url\n").is_err());
    }
}
