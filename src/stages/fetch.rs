//! Fetch stage: page through the API and save the raw records.

use crate::api::{HttpPageSource, PageSource, fetch_collection, first_page_url};
use crate::config::PipelineConfig;
use crate::error::{EtlError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{error, info, instrument};

/// Fetch the configured collection over HTTP and write it to the raw JSON file.
#[instrument(level = "info", skip_all, fields(collection = %config.collection))]
pub async fn run(config: &PipelineConfig) -> Result<PathBuf> {
    let source = HttpPageSource::new()?;
    run_with_source(&source, config).await
}

pub async fn run_with_source<S: PageSource>(source: &S, config: &PipelineConfig) -> Result<PathBuf> {
    let start = first_page_url(&config.api_base, &config.collection)?;
    let records = fetch_collection(
        source,
        &start,
        config.max_pages,
        Duration::from_millis(config.page_delay_ms),
    )
    .await?;
    write_raw(&records, &config.raw_json_path()).await
}

/// Write records as a pretty-printed JSON array, replacing any previous file.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_raw(records: &[Value], path: &Path) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(records)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| EtlError::sink_unwritable(parent, e))?;
    }
    if let Err(e) = fs::write(path, json).await {
        error!(error = %e, "Failed to write JSON output");
        return Err(EtlError::sink_unwritable(path, e));
    }
    info!("Saved raw records");
    Ok(path.to_path_buf())
}
