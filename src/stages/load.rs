//! Load stage: cleaned rows into the relational schema.
//!
//! Natural keys deduplicate everything: newspapers by control number,
//! locations by (city, state, country), issues by catalog id, languages and
//! subjects by name. Re-inserting an existing key is a no-op, so loading the
//! same file twice leaves the tables unchanged.

use crate::dataset::{Dataset, Row};
use crate::dates::parse_date;
use crate::error::Result;
use crate::models::Field;
use itertools::Itertools;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Row counts in each table after a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub newspapers: usize,
    pub locations: usize,
    pub issues: usize,
    pub languages: usize,
    pub subjects: usize,
    /// Input rows skipped because a key field was blank or the date did not parse.
    pub skipped: usize,
}

/// An input row with its keys resolved to trimmed strings.
struct IssueRecord<'a> {
    id: &'a str,
    lccn: &'a str,
    newspaper_title: &'a str,
    city: &'a str,
    state: &'a str,
    country: &'a str,
    date_issued: String,
    title: &'a str,
    medium: Option<&'a str>,
    image_url: Option<&'a str>,
    url: Option<&'a str>,
    languages: Vec<&'a str>,
    subjects: Vec<&'a str>,
}

/// Split a joined multi-value cell (`"english, spanish"`) into its parts.
pub fn split_values(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unique()
        .collect()
}

fn to_record<'a>(ds: &Dataset, row: &'a Row, url_idx: Option<usize>) -> Option<IssueRecord<'a>> {
    let required = |field: Field| {
        ds.value(row, field)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let optional = |field: Field| ds.value(row, field).filter(|v| !v.trim().is_empty());

    let date = parse_date(required(Field::DateIssued)?)?;
    Some(IssueRecord {
        id: required(Field::Id)?,
        lccn: required(Field::Lccn)?,
        newspaper_title: required(Field::NewspaperTitle)?,
        city: required(Field::City)?,
        state: required(Field::State)?,
        country: required(Field::Country)?,
        date_issued: date.format("%Y-%m-%d").to_string(),
        title: required(Field::Title)?,
        medium: optional(Field::Medium),
        image_url: optional(Field::ImageUrl),
        url: url_idx.and_then(|i| row.get(i)).filter(|v| !v.trim().is_empty()),
        languages: optional(Field::ItemLanguage).map(split_values).unwrap_or_default(),
        subjects: optional(Field::Subject).map(split_values).unwrap_or_default(),
    })
}

/// Insert every row of `ds` in a single transaction.
#[instrument(level = "info", skip_all, fields(rows = ds.len()))]
pub fn load_dataset(conn: &mut Connection, ds: &Dataset) -> Result<LoadReport> {
    let url_idx = ds.position("url");
    let mut skipped = 0;
    let records: Vec<IssueRecord<'_>> = ds
        .rows()
        .iter()
        .filter_map(|row| {
            let record = to_record(ds, row, url_idx);
            if record.is_none() {
                warn!(id = ?ds.value(row, Field::Id), "Skipping row with blank key or bad date");
                skipped += 1;
            }
            record
        })
        .collect();

    let tx = conn.transaction()?;
    insert_newspapers(&tx, &records)?;
    insert_locations(&tx, &records)?;
    insert_issues(&tx, &records)?;
    insert_tags(&tx, &records, Tag::Language)?;
    insert_tags(&tx, &records, Tag::Subject)?;

    let report = LoadReport {
        newspapers: count(&tx, "newspapers")?,
        locations: count(&tx, "locations")?,
        issues: count(&tx, "issues")?,
        languages: count(&tx, "languages")?,
        subjects: count(&tx, "subjects")?,
        skipped,
    };
    tx.commit()?;

    info!(
        newspapers = report.newspapers,
        locations = report.locations,
        issues = report.issues,
        languages = report.languages,
        subjects = report.subjects,
        skipped = report.skipped,
        "Finished inserting data"
    );
    Ok(report)
}

/// Read a cleaned CSV and load it into the database at `db_path`.
/// The schema must already exist.
#[instrument(level = "info", skip_all, fields(input = %input.display(), db = %db_path.display()))]
pub fn load_csv(input: &Path, db_path: &Path) -> Result<LoadReport> {
    let ds = Dataset::read_path(input)?;
    info!(rows = ds.len(), "Loaded cleaned rows");
    let mut conn = crate::stages::schema::open(db_path)?;
    load_dataset(&mut conn, &ds)
}

fn count(tx: &Transaction<'_>, table: &str) -> Result<usize> {
    let n: i64 = tx.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
    Ok(n as usize)
}

fn insert_newspapers(tx: &Transaction<'_>, records: &[IssueRecord<'_>]) -> Result<()> {
    let mut stmt = tx.prepare("INSERT OR IGNORE INTO newspapers (lccn, title) VALUES (?1, ?2)")?;
    for (lccn, title) in records.iter().map(|r| (r.lccn, r.newspaper_title)).unique() {
        stmt.execute(params![lccn, title])?;
    }
    debug!("newspapers table populated");
    Ok(())
}

fn insert_locations(tx: &Transaction<'_>, records: &[IssueRecord<'_>]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO locations (city, state, country) VALUES (?1, ?2, ?3)",
    )?;
    for (city, state, country) in records.iter().map(|r| (r.city, r.state, r.country)).unique() {
        stmt.execute(params![city, state, country])?;
    }
    debug!("locations table populated");
    Ok(())
}

fn insert_issues(tx: &Transaction<'_>, records: &[IssueRecord<'_>]) -> Result<()> {
    let mut newspaper = tx.prepare("SELECT newspaper_id FROM newspapers WHERE lccn = ?1")?;
    let mut location = tx.prepare(
        "SELECT location_id FROM locations WHERE city = ?1 AND state = ?2 AND country = ?3",
    )?;
    let mut insert = tx.prepare(
        "INSERT OR IGNORE INTO issues
            (issue_loc_id, date_issued, title, medium, image_url, url, newspaper_id, location_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;

    for r in records {
        let newspaper_id: i64 = newspaper.query_row(params![r.lccn], |row| row.get(0))?;
        let location_id: i64 =
            location.query_row(params![r.city, r.state, r.country], |row| row.get(0))?;
        insert.execute(params![
            r.id,
            r.date_issued,
            r.title,
            r.medium,
            r.image_url,
            r.url,
            newspaper_id,
            location_id
        ])?;
    }
    debug!("issues table populated");
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Tag {
    Language,
    Subject,
}

impl Tag {
    fn insert_sql(self) -> &'static str {
        match self {
            Tag::Language => "INSERT OR IGNORE INTO languages (name) VALUES (?1)",
            Tag::Subject => "INSERT OR IGNORE INTO subjects (name) VALUES (?1)",
        }
    }

    fn lookup_sql(self) -> &'static str {
        match self {
            Tag::Language => "SELECT language_id FROM languages WHERE name = ?1",
            Tag::Subject => "SELECT subject_id FROM subjects WHERE name = ?1",
        }
    }

    fn link_sql(self) -> &'static str {
        match self {
            Tag::Language => {
                "INSERT OR IGNORE INTO issue_languages (issue_id, language_id) VALUES (?1, ?2)"
            }
            Tag::Subject => {
                "INSERT OR IGNORE INTO issue_subjects (issue_id, subject_id) VALUES (?1, ?2)"
            }
        }
    }

    fn values<'r, 'a>(self, record: &'r IssueRecord<'a>) -> &'r [&'a str] {
        match self {
            Tag::Language => &record.languages,
            Tag::Subject => &record.subjects,
        }
    }
}

/// Insert names into a lookup table and link them to their issues.
fn insert_tags(tx: &Transaction<'_>, records: &[IssueRecord<'_>], tag: Tag) -> Result<()> {
    let mut issue = tx.prepare("SELECT issue_id FROM issues WHERE issue_loc_id = ?1")?;
    let mut insert = tx.prepare(tag.insert_sql())?;
    let mut lookup = tx.prepare(tag.lookup_sql())?;
    let mut link = tx.prepare(tag.link_sql())?;

    for r in records {
        let Some(issue_id) = issue
            .query_row(params![r.id], |row| row.get::<_, i64>(0))
            .optional()?
        else {
            continue;
        };
        for name in tag.values(r) {
            insert.execute(params![name])?;
            let tag_id: i64 = lookup.query_row(params![name], |row| row.get(0))?;
            link.execute(params![issue_id, tag_id])?;
        }
    }
    debug!(?tag, "tag tables populated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::schema::create_tables;

    const HEADER: &str = "id,title,item_lccn,item_date_issued,item_newspaper_title,\
location_city,location_state,location_country,description,language,subject,image_url,\
item_medium,item_created_published,item_place_of_publication,item_language,url";

    fn cleaned(rows: &[&str]) -> Dataset {
        let text = format!("{}\n{}\n", HEADER, rows.join("\n"));
        Dataset::from_reader(text.as_bytes()).unwrap()
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    const ROW_A: &str = "a1,daily news,sn1,1910-01-01,daily news,juneau,alaska,united states,d,english,\"news, alaska\",http://i/1.jpg,4 pages,1910,juneau,\"english, spanish\",http://loc/a1";
    const ROW_B: &str = "b2,daily news,sn1,\"january 2, 1910\",daily news,juneau,alaska,united states,d,english,news,http://i/2.jpg,8 pages,1910,juneau,english,http://loc/b2";
    const ROW_C: &str = "c3,the star,sn2,1911-05-05,the star,sitka,alaska,united states,d,english,unknown,unknown,unknown,1911,sitka,unknown,http://loc/c3";

    #[test]
    fn test_split_values() {
        assert_eq!(split_values("english, spanish"), vec!["english", "spanish"]);
        assert_eq!(split_values(" news ,, news"), vec!["news"]);
        assert!(split_values("").is_empty());
    }

    #[test]
    fn test_load_deduplicates_by_natural_key() {
        let mut conn = setup();
        let report = load_dataset(&mut conn, &cleaned(&[ROW_A, ROW_B, ROW_C])).unwrap();
        assert_eq!(report.newspapers, 2);
        assert_eq!(report.locations, 2);
        assert_eq!(report.issues, 3);
        // english, spanish, unknown
        assert_eq!(report.languages, 3);
        // news, alaska, unknown
        assert_eq!(report.subjects, 3);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_dates_normalized_to_iso() {
        let mut conn = setup();
        load_dataset(&mut conn, &cleaned(&[ROW_B])).unwrap();
        let date: String = conn
            .query_row("SELECT date_issued FROM issues WHERE issue_loc_id = 'b2'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(date, "1910-01-02");
    }

    #[test]
    fn test_month_year_date_keeps_its_year() {
        let mut conn = setup();
        let row = ROW_C.replace("1911-05-05", "march 1921");
        load_dataset(&mut conn, &cleaned(&[row.as_str()])).unwrap();
        let date: String = conn
            .query_row("SELECT date_issued FROM issues WHERE issue_loc_id = 'c3'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(date, "1921-03-01");
    }

    #[test]
    fn test_junction_rows() {
        let mut conn = setup();
        load_dataset(&mut conn, &cleaned(&[ROW_A])).unwrap();
        let links: i64 = conn
            .query_row("SELECT COUNT(*) FROM issue_languages", [], |r| r.get(0))
            .unwrap();
        assert_eq!(links, 2);
        let links: i64 = conn
            .query_row("SELECT COUNT(*) FROM issue_subjects", [], |r| r.get(0))
            .unwrap();
        assert_eq!(links, 2);
    }

    #[test]
    fn test_reload_is_noop() {
        let mut conn = setup();
        let ds = cleaned(&[ROW_A, ROW_B, ROW_C]);
        let first = load_dataset(&mut conn, &ds).unwrap();
        let second = load_dataset(&mut conn, &ds).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rows_with_blank_keys_skipped() {
        let mut conn = setup();
        let bad = "x9,t,,1910-01-01,n,c,s,k,d,l,s,i,m,c,p,l,u";
        let report = load_dataset(&mut conn, &cleaned(&[ROW_A, bad])).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.issues, 1);
    }

    #[test]
    fn test_load_csv_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cleaned.csv");
        std::fs::write(&input, format!("{}\n{}\n", HEADER, ROW_C)).unwrap();
        let db = dir.path().join("n.db");
        {
            let conn = crate::stages::schema::open(&db).unwrap();
            create_tables(&conn).unwrap();
        }
        let report = load_csv(&input, &db).unwrap();
        assert_eq!(report.issues, 1);
    }
}
