//! Charts stage: aggregate queries over the loaded schema.
//!
//! Each query produces a [`Series`] of labelled counts. Rendering lives in
//! [`crate::outputs`]; this module only asks the database.

use crate::error::Result;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{instrument, warn};

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").expect("valid digit regex"));

/// One labelled count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Point {
    pub label: String,
    pub count: u64,
}

/// A named chart: axis labels plus its points in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series {
    /// File stem for rendered output.
    pub name: &'static str,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub points: Vec<Point>,
}

impl Series {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_count(&self) -> u64 {
        self.points.iter().map(|p| p.count).max().unwrap_or(0)
    }
}

fn labelled_counts(conn: &Connection, sql: &str) -> Result<Vec<Point>> {
    let mut stmt = conn.prepare(sql)?;
    let points = stmt
        .query_map([], |row| {
            let label: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok(Point {
                label,
                count: count as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(points)
}

/// Issues grouped by publication year, oldest first.
pub fn issues_per_year(conn: &Connection) -> Result<Series> {
    let points = labelled_counts(
        conn,
        "SELECT strftime('%Y', date_issued) AS year, COUNT(*) AS issue_count
         FROM issues
         WHERE strftime('%Y', date_issued) IS NOT NULL
         GROUP BY year
         ORDER BY year",
    )?;
    Ok(Series {
        name: "issues_per_year",
        title: "Number of Issues Published Per Year",
        x_label: "Year",
        y_label: "Number of Issues",
        points,
    })
}

/// Issues grouped by state, most issues first.
pub fn issues_per_state(conn: &Connection) -> Result<Series> {
    let points = labelled_counts(
        conn,
        "SELECT l.state, COUNT(i.issue_id) AS issue_count
         FROM issues i
         JOIN locations l ON i.location_id = l.location_id
         GROUP BY l.state
         ORDER BY issue_count DESC, l.state",
    )?;
    Ok(Series {
        name: "issues_per_state",
        title: "Number of Issues Published Per State",
        x_label: "State",
        y_label: "Number of Issues",
        points,
    })
}

/// Issues per language, most common first.
pub fn language_frequency(conn: &Connection) -> Result<Series> {
    let points = labelled_counts(
        conn,
        "SELECT l.name AS language, COUNT(il.issue_id) AS issue_count
         FROM languages l
         JOIN issue_languages il ON l.language_id = il.language_id
         GROUP BY l.name
         ORDER BY issue_count DESC, l.name",
    )?;
    Ok(Series {
        name: "language_frequency",
        title: "Number of Issues by Language",
        x_label: "Language",
        y_label: "Number of Issues",
        points,
    })
}

/// Page count read from a medium description: every digit in it, in order
/// (`"4 pages"` gives 4). `None` when there are no digits.
pub fn page_count(medium: &str) -> Option<u64> {
    let digits = NON_DIGIT.replace_all(medium, "");
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Distribution of page counts per issue, fewest pages first.
pub fn pages_per_issue(conn: &Connection) -> Result<Series> {
    let mut stmt = conn.prepare("SELECT medium FROM issues WHERE medium IS NOT NULL")?;
    let media = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let points = media
        .iter()
        .filter_map(|m| page_count(m))
        .counts()
        .into_iter()
        .sorted()
        .map(|(pages, count)| Point {
            label: pages.to_string(),
            count: count as u64,
        })
        .collect();

    Ok(Series {
        name: "pages_per_issue",
        title: "Distribution of Page Counts per Issue",
        x_label: "Page Count",
        y_label: "Number of Issues",
        points,
    })
}

/// All chart series, in a fixed order. Empty series are kept but logged.
#[instrument(level = "info", skip_all)]
pub fn all_series(conn: &Connection) -> Result<Vec<Series>> {
    let series = vec![
        issues_per_year(conn)?,
        issues_per_state(conn)?,
        language_frequency(conn)?,
        pages_per_issue(conn)?,
    ];
    for s in series.iter().filter(|s| s.is_empty()) {
        warn!(chart = s.name, "No data returned from database; chart will be skipped");
    }
    Ok(series)
}
