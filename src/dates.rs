//! Permissive calendar date parsing for issue dates.
//!
//! Issue dates arrive in whatever form the catalog record used: ISO dates,
//! timestamps, US numeric dates, or written out (`January 1, 1900`). This
//! module accepts all of those and rejects blank or non-date text.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Day numbers written with an English ordinal suffix (`1st`, `22nd`).
static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex"));

/// A leading weekday name (`Monday January 1 1900` once commas are gone).
static WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(mon|tue|tues|wed|thu|thur|thurs|fri|sat|sun)(day|sday|nesday|rsday|urday)?\.?\s+")
        .expect("valid weekday regex")
});

/// A period closing an abbreviated word (`Jan.`).
static ABBREV_DOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z]{3,})\.").expect("valid abbreviation regex"));

/// `Sept`, which chrono does not know as a short month name.
static SEPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bsept\b").expect("valid sept regex"));

/// `January 1900`, `Jan 1900`
static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+) (\d{4})$").expect("valid month-year regex"));

/// `1900-06`, `1900/6`
static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/](\d{1,2})$").expect("valid year-month regex"));

/// A standalone four-digit year. Day-month-year formats only apply when one
/// is present, since chrono's `%Y` would otherwise accept a one- or
/// two-digit year.
static FULL_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^0-9])[0-9]{4}([^0-9]|$)").expect("valid year regex"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d %Y",
    "%d %B %Y",
    "%Y %B %d",
    "%b %d %Y",
    "%d %b %Y",
];

/// Parse a date string, returning `None` when it is blank or not a date.
///
/// Time-of-day and offset information is discarded. A month and year without
/// a day resolve to the first of the month; a bare four-digit year resolves
/// to January 1st.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    let normalized = normalize(s);
    if let Some(d) = parse_partial(&normalized) {
        return Some(d);
    }
    if !FULL_YEAR.is_match(&normalized) {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&normalized, fmt).ok())
}

/// Month-year, year-month, bare year and compact `YYYYMMDD` forms. These run
/// before the full formats: `%B %d %Y` would read `January 1900` as day 19
/// of year 0.
fn parse_partial(normalized: &str) -> Option<NaiveDate> {
    if let Some(caps) = MONTH_YEAR.captures(normalized) {
        let with_day = format!("{} 1 {}", &caps[1], &caps[2]);
        return ["%B %d %Y", "%b %d %Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&with_day, fmt).ok());
    }
    if let Some(caps) = YEAR_MONTH.captures(normalized) {
        return NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 1);
    }

    if normalized.len() == 4 && normalized.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = normalized.parse().ok()?;
        if year >= 1000 {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }
    if normalized.len() == 8 && normalized.bytes().all(|b| b.is_ascii_digit()) {
        let (y, m, d) = (&normalized[..4], &normalized[4..6], &normalized[6..]);
        return NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?);
    }
    None
}

/// Whether `value` is present and parses as a calendar date.
pub fn is_valid_date(value: Option<&str>) -> bool {
    value.and_then(parse_date).is_some()
}

/// Drops commas, weekday prefixes, ordinal suffixes and abbreviation periods,
/// spells `Sept` as `Sep` and collapses whitespace.
fn normalize(s: &str) -> String {
    let s = s.replace(',', " ");
    let s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let s = WEEKDAY.replace(&s, "");
    let s = ORDINAL.replace_all(&s, "$1");
    let s = ABBREV_DOT.replace_all(&s, "$1 ");
    let s = SEPT.replace_all(&s, "Sep");
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_is_valid_date() {
        assert!(is_valid_date(Some("1900-01-01")));
        assert!(is_valid_date(Some("January 1, 1900")));
        assert!(!is_valid_date(Some("")));
        assert!(!is_valid_date(None));
        assert!(!is_valid_date(Some("not-a-date")));
    }

    #[test]
    fn test_whitespace_only_is_invalid() {
        assert!(!is_valid_date(Some("   ")));
        assert!(!is_valid_date(Some("\t\n")));
    }

    #[test]
    fn test_iso_forms() {
        assert_eq!(parse_date("1910-01-01"), ymd(1910, 1, 1));
        assert_eq!(parse_date("1910/03/15"), ymd(1910, 3, 15));
        assert_eq!(parse_date("1910-03-15T00:00:00"), ymd(1910, 3, 15));
        assert_eq!(parse_date("1910-03-15T08:30:00Z"), ymd(1910, 3, 15));
        assert_eq!(parse_date(" 1910-03-15 "), ymd(1910, 3, 15));
    }

    #[test]
    fn test_natural_language_forms() {
        assert_eq!(parse_date("January 1, 1900"), ymd(1900, 1, 1));
        assert_eq!(parse_date("january 1, 1900"), ymd(1900, 1, 1));
        assert_eq!(parse_date("Jan 1 1900"), ymd(1900, 1, 1));
        assert_eq!(parse_date("1 January 1900"), ymd(1900, 1, 1));
        assert_eq!(parse_date("March 3rd, 1921"), ymd(1921, 3, 3));
        assert_eq!(parse_date("Monday, January 1, 1900"), ymd(1900, 1, 1));
        assert_eq!(parse_date("Tuesday, June 5th, 1917"), ymd(1917, 6, 5));
        assert_eq!(parse_date("Mon. Jan. 1, 1900"), ymd(1900, 1, 1));
    }

    #[test]
    fn test_abbreviated_months() {
        assert_eq!(parse_date("Jan. 1, 1900"), ymd(1900, 1, 1));
        assert_eq!(parse_date("Sept 5, 1900"), ymd(1900, 9, 5));
        assert_eq!(parse_date("Sept. 5, 1900"), ymd(1900, 9, 5));
        assert_eq!(parse_date("5 Sept 1900"), ymd(1900, 9, 5));
        assert_eq!(parse_date("September 5, 1900"), ymd(1900, 9, 5));
    }

    #[test]
    fn test_partial_dates() {
        assert_eq!(parse_date("January 1900"), ymd(1900, 1, 1));
        assert_eq!(parse_date("March 1921"), ymd(1921, 3, 1));
        assert_eq!(parse_date("May 2024"), ymd(2024, 5, 1));
        assert_eq!(parse_date("Sept. 1900"), ymd(1900, 9, 1));
        assert_eq!(parse_date("1900/6"), ymd(1900, 6, 1));
        assert_eq!(parse_date("1900-06"), ymd(1900, 6, 1));
        assert_eq!(parse_date("1900"), ymd(1900, 1, 1));
        assert_eq!(parse_date("19000615"), ymd(1900, 6, 15));
    }

    #[test]
    fn test_us_numeric() {
        assert_eq!(parse_date("02/01/1900"), ymd(1900, 2, 1));
    }

    #[test]
    fn test_rejects_impossible_and_garbage() {
        assert_eq!(parse_date("1900-02-30"), None);
        assert_eq!(parse_date("hello world"), None);
        assert_eq!(parse_date("12"), None);
        assert_eq!(parse_date("unknown"), None);
        assert_eq!(parse_date("January 19"), None);
        assert_eq!(parse_date("Jan 5 00"), None);
    }
}
