//! Validation and normalization of flattened issue rows.
//!
//! [`clean`] runs a fixed sequence of passes over a [`Dataset`]. Each pass
//! sees only the rows that survived the passes before it, and a rejected row
//! is never looked at again:
//!
//! 1. drop repeated `id`s, keeping the first occurrence
//! 2. reject rows missing a critical field, one field per pass
//! 3. reject rows whose issue date does not parse
//! 4. reject rows missing a location field, one field per pass
//! 5. replace blank optional fields with [`UNKNOWN`]
//! 6. lowercase the text fields
//!
//! Rejections are counted per pass. A row blank in both `title` and
//! `item_lccn` is rejected by the `title` pass and counted once; the `lccn`
//! pass never sees it.

use crate::dataset::{Dataset, Row};
use crate::dates::is_valid_date;
use crate::error::{EtlError, Result};
use crate::models::Field;
use itertools::Itertools;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Placeholder written into blank optional fields.
pub const UNKNOWN: &str = "unknown";

/// Per-field counter, kept in the order the fields were processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCount {
    pub field: Field,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningStats {
    pub missing_critical_rows: usize,
    pub invalid_date_rows: usize,
    pub missing_location_rows: usize,
    /// Only fields that needed at least one fill appear here.
    pub placeholder_fills: Vec<FieldCount>,
    /// Every lowercased field appears here, even with a zero count.
    pub lowercase_ops: Vec<FieldCount>,
}

impl CleaningStats {
    pub fn fills(&self, field: Field) -> usize {
        lookup(&self.placeholder_fills, field)
    }

    pub fn lowercased(&self, field: Field) -> usize {
        lookup(&self.lowercase_ops, field)
    }

    pub fn total_rejected(&self) -> usize {
        self.missing_critical_rows + self.invalid_date_rows + self.missing_location_rows
    }
}

fn lookup(counts: &[FieldCount], field: Field) -> usize {
    counts
        .iter()
        .find(|c| c.field == field)
        .map_or(0, |c| c.count)
}

/// Everything a cleaning run produces.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub accepted: Dataset,
    /// Rejected rows in the order the rejecting passes ran.
    pub rejected: Dataset,
    pub duplicates_removed: usize,
    pub stats: CleaningStats,
}

impl CleanOutcome {
    pub fn summary(&self, total_before: usize) -> CleaningSummary {
        debug_assert_eq!(self.stats.total_rejected(), self.rejected.len());
        CleaningSummary {
            total_before,
            duplicates_removed: self.duplicates_removed,
            total_rejected: self.rejected.len(),
            total_after: self.accepted.len(),
            stats: self.stats.clone(),
        }
    }
}

/// Counters reported after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningSummary {
    pub total_before: usize,
    pub duplicates_removed: usize,
    pub total_rejected: usize,
    pub total_after: usize,
    pub stats: CleaningStats,
}

impl fmt::Display for CleaningSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== CLEANING SUMMARY ===")?;
        writeln!(f, "Rows before cleaning: {}", self.total_before)?;
        writeln!(f, "Duplicates removed:  {}", self.duplicates_removed)?;
        writeln!(f, "Rows rejected:       {}", self.total_rejected)?;
        writeln!(f, "Rows after cleaning: {}", self.total_after)?;
        writeln!(f)?;
        writeln!(f, "Reasons for rejection:")?;
        writeln!(f, "  Missing critical fields: {}", self.stats.missing_critical_rows)?;
        writeln!(f, "  Invalid date formats:    {}", self.stats.invalid_date_rows)?;
        writeln!(f, "  Missing location fields: {}", self.stats.missing_location_rows)?;
        writeln!(f)?;
        writeln!(f, "Placeholder fills:")?;
        for c in &self.stats.placeholder_fills {
            writeln!(f, "  {}: {}", c.field, c.count)?;
        }
        writeln!(f)?;
        writeln!(f, "Lowercase operations:")?;
        for c in &self.stats.lowercase_ops {
            writeln!(f, "  {}: {}", c.field, c.count)?;
        }
        Ok(())
    }
}

/// Clean a dataset in memory.
///
/// Known columns the input lacks are added (as absent cells) before any pass
/// runs, so both outputs always carry the full known column set in addition
/// to whatever extra columns the input had.
#[instrument(level = "info", skip_all, fields(rows = input.len()))]
pub fn clean(mut input: Dataset) -> CleanOutcome {
    input.ensure_fields(&Field::ALL);

    let (pool, duplicates_removed) = drop_duplicate_ids(input);
    let mut rejected = pool.empty_like();
    let mut stats = CleaningStats::default();

    let (pool, chunk) = reject_missing(pool, &Field::CRITICAL);
    stats.missing_critical_rows = chunk.len();
    rejected.extend(chunk);

    let (pool, chunk) = reject_invalid_dates(pool);
    stats.invalid_date_rows = chunk.len();
    rejected.extend(chunk);

    let (pool, chunk) = reject_missing(pool, &Field::LOCATION);
    stats.missing_location_rows = chunk.len();
    rejected.extend(chunk);

    let (pool, fills) = fill_unknown(pool, &Field::FILLABLE);
    stats.placeholder_fills = fills;

    let (accepted, lowered) = lowercase(pool, &Field::LOWERCASE);
    stats.lowercase_ops = lowered;

    debug!(
        accepted = accepted.len(),
        rejected = rejected.len(),
        duplicates_removed,
        "Cleaning passes complete"
    );

    CleanOutcome {
        accepted,
        rejected,
        duplicates_removed,
        stats,
    }
}

/// Keeps the first row for each `id`. Absent and empty ids share one key.
fn drop_duplicate_ids(dataset: Dataset) -> (Dataset, usize) {
    let before = dataset.len();
    let Some(idx) = dataset.field_position(Field::Id) else {
        return (dataset, 0);
    };
    let header = dataset.header().to_vec();
    let rows: Vec<Row> = dataset
        .into_rows()
        .into_iter()
        .unique_by(|row| row.get(idx).filter(|v| !v.is_empty()).map(str::to_string))
        .collect();
    let removed = before - rows.len();
    if removed > 0 {
        debug!(removed, "Dropped duplicate ids");
    }
    (Dataset::new(header, rows), removed)
}

/// One pass per field, in order. Returns survivors and the rejected rows.
fn reject_missing(mut pool: Dataset, fields: &[Field]) -> (Dataset, Vec<Row>) {
    let mut rejected = Vec::new();
    for field in fields {
        let Some(idx) = pool.field_position(*field) else {
            continue;
        };
        let (kept, chunk) = pool.partition(|row| row.is_missing(idx));
        if !chunk.is_empty() {
            debug!(field = %field, rows = chunk.len(), "Rejected rows missing field");
        }
        rejected.extend(chunk.into_rows());
        pool = kept;
    }
    (pool, rejected)
}

fn reject_invalid_dates(pool: Dataset) -> (Dataset, Vec<Row>) {
    let Some(idx) = pool.field_position(Field::DateIssued) else {
        return (pool, Vec::new());
    };
    let (kept, chunk) = pool.partition(|row| !is_valid_date(row.get(idx)));
    if !chunk.is_empty() {
        debug!(rows = chunk.len(), "Rejected rows with unparseable issue date");
    }
    (kept, chunk.into_rows())
}

fn fill_unknown(mut pool: Dataset, fields: &[Field]) -> (Dataset, Vec<FieldCount>) {
    let mut fills = Vec::new();
    for field in fields {
        let Some(idx) = pool.field_position(*field) else {
            continue;
        };
        let mut count = 0;
        for row in pool.rows_mut() {
            if row.is_missing(idx) {
                row.set(idx, UNKNOWN);
                count += 1;
            }
        }
        if count > 0 {
            fills.push(FieldCount {
                field: *field,
                count,
            });
        }
    }
    (pool, fills)
}

/// Counts every value visited, whether or not its case changed.
fn lowercase(mut pool: Dataset, fields: &[Field]) -> (Dataset, Vec<FieldCount>) {
    let mut ops = Vec::new();
    for field in fields {
        let Some(idx) = pool.field_position(*field) else {
            continue;
        };
        let mut count = 0;
        for row in pool.rows_mut() {
            if row.is_missing(idx) {
                continue;
            }
            if let Some(lowered) = row.get(idx).map(str::to_lowercase) {
                row.set(idx, lowered);
                count += 1;
            }
        }
        ops.push(FieldCount {
            field: *field,
            count,
        });
    }
    (pool, ops)
}

/// Clean a CSV file, writing the accepted and rejected rows to two files.
///
/// The input is read completely before anything is processed; neither output
/// is touched until all passes have finished. Both outputs are staged next to
/// their destination and only renamed into place once both were written, so a
/// failed run never leaves a cleaned file behind that could be mistaken for a
/// complete one.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn clean_csv(input: &Path, accepted_path: &Path, rejected_path: &Path) -> Result<CleaningSummary> {
    let dataset = Dataset::read_path(input)?;
    let total_before = dataset.len();
    info!(rows = total_before, "Rows before cleaning");

    let outcome = clean(dataset);
    let summary = outcome.summary(total_before);

    // accepted goes last: its presence implies the rejected file landed too
    write_outputs(&[
        (&outcome.rejected, rejected_path),
        (&outcome.accepted, accepted_path),
    ])?;

    info!(
        total_before = summary.total_before,
        duplicates_removed = summary.duplicates_removed,
        total_rejected = summary.total_rejected,
        total_after = summary.total_after,
        missing_critical_rows = summary.stats.missing_critical_rows,
        invalid_date_rows = summary.stats.invalid_date_rows,
        missing_location_rows = summary.stats.missing_location_rows,
        cleaned = %accepted_path.display(),
        rejected = %rejected_path.display(),
        "Cleaning complete"
    );
    for field in Field::FILLABLE {
        debug!(field = %field, fills = summary.stats.fills(field), "Placeholder fills");
    }
    for field in Field::LOWERCASE {
        debug!(field = %field, lowercased = summary.stats.lowercased(field), "Lowercased values");
    }
    Ok(summary)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_outputs(outputs: &[(&Dataset, &Path)]) -> Result<()> {
    let staged: Vec<(PathBuf, &Path)> = outputs
        .iter()
        .map(|(_, dest)| (staging_path(dest), *dest))
        .collect();

    let written = outputs
        .iter()
        .zip(&staged)
        .try_for_each(|((dataset, _), (tmp, _))| dataset.write_path(tmp));

    let renamed = written.and_then(|()| {
        staged.iter().try_for_each(|(tmp, dest)| {
            fs::rename(tmp, dest).map_err(|e| EtlError::sink_unwritable(*dest, e))
        })
    });

    if let Err(e) = renamed {
        for (tmp, _) in &staged {
            if tmp.exists() {
                if let Err(rm) = fs::remove_file(tmp) {
                    warn!(path = %tmp.display(), error = %rm, "Failed to remove staged output");
                }
            }
        }
        return Err(e);
    }
    Ok(())
}
