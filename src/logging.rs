//! Tracing setup: human-readable output on stderr plus a daily-rotated
//! diagnostic log file.

use crate::error::{EtlError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_FILE_NAME: &str = "etl_pipeline.log";

/// Daily-rotated appender under `log_dir`, creating the directory if needed.
fn file_appender(log_dir: &Path) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_NAME)
        .build(log_dir)
        .map_err(|e| EtlError::sink_unwritable(log_dir, e))
}

/// Install the global subscriber. `RUST_LOG` controls the filter (default `info`).
///
/// The returned guard flushes the file writer on drop; hold it for the
/// lifetime of the process.
pub fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender(log_dir)?);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(UtcTime::rfc_3339());

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_timer(UtcTime::rfc_3339());

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
