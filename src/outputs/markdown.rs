//! Markdown rendering of chart series.
//!
//! Each non-empty [`Series`] becomes `<name>.md` with a count table and a
//! horizontal text bar per point, scaled so the largest count fills
//! [`BAR_WIDTH`] cells. An `index.md` links every rendered chart.

use crate::error::{EtlError, Result};
use crate::stages::charts::Series;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

pub const BAR_WIDTH: usize = 40;

fn bar(count: u64, max: u64) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let cells = ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(cells.max(1))
}

/// Render one series as a Markdown document.
pub fn series_to_markdown(series: &Series) -> String {
    let mut md = String::new();
    let max = series.max_count();

    md.push_str(&format!("# {}\n\n", series.title));
    md.push_str(&format!("| {} | {} | |\n", series.x_label, series.y_label));
    md.push_str("|---|---:|---|\n");
    for point in &series.points {
        md.push_str(&format!(
            "| {} | {} | `{}` |\n",
            point.label.replace('|', "\\|"),
            point.count,
            bar(point.count, max)
        ));
    }
    md
}

fn index_markdown(rendered: &[&Series]) -> String {
    let mut md = String::from("# Newspaper Charts\n\n");
    if rendered.is_empty() {
        md.push_str("_No charts could be generated; the database returned no data._\n");
        return md;
    }
    for series in rendered {
        md.push_str(&format!("- [{}]({}.md)\n", series.title, series.name));
    }
    md
}

/// Write `<name>.md` for each non-empty series plus `index.md`.
/// Returns the paths written, index last.
#[instrument(level = "info", skip_all, fields(reports_dir = %reports_dir.display()))]
pub async fn write_charts(series: &[Series], reports_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(reports_dir)
        .await
        .map_err(|e| EtlError::sink_unwritable(reports_dir, e))?;

    let mut written = Vec::new();
    let mut rendered = Vec::new();
    for s in series {
        if s.is_empty() {
            warn!(chart = s.name, "Skipping chart with no data");
            continue;
        }
        let path = reports_dir.join(format!("{}.md", s.name));
        fs::write(&path, series_to_markdown(s))
            .await
            .map_err(|e| EtlError::sink_unwritable(&path, e))?;
        info!(chart = s.name, path = %path.display(), "Chart saved");
        written.push(path);
        rendered.push(s);
    }

    let index = reports_dir.join("index.md");
    fs::write(&index, index_markdown(&rendered))
        .await
        .map_err(|e| EtlError::sink_unwritable(&index, e))?;
    written.push(index);
    Ok(written)
}
