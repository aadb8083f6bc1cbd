//! JSON bundle of every chart series.

use crate::error::{EtlError, Result};
use crate::stages::charts::Series;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
struct ChartBundle<'a> {
    generated_at: String,
    charts: &'a [Series],
}

/// Write all series to `<reports_dir>/charts.json`, replacing any previous bundle.
#[instrument(level = "info", skip_all, fields(reports_dir = %reports_dir.display()))]
pub async fn write_charts(series: &[Series], reports_dir: &Path) -> Result<PathBuf> {
    let bundle = ChartBundle {
        generated_at: chrono::Utc::now().to_rfc3339(),
        charts: series,
    };
    let json = serde_json::to_string_pretty(&bundle)?;

    if let Err(e) = fs::create_dir_all(reports_dir).await {
        error!(error = %e, "Failed to create reports dir");
        return Err(EtlError::sink_unwritable(reports_dir, e));
    }
    let path = reports_dir.join("charts.json");
    fs::write(&path, json)
        .await
        .map_err(|e| EtlError::sink_unwritable(&path, e))?;
    info!(path = %path.display(), charts = series.len(), "Wrote chart bundle");
    Ok(path)
}
