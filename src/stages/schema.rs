//! Relational schema for cleaned issues.
//!
//! Tables are dropped and recreated on every run so a load always starts
//! from an empty database.

use crate::error::{EtlError, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::{info, instrument};

const DROP_TABLES: &str = r#"
DROP TABLE IF EXISTS issue_subjects;
DROP TABLE IF EXISTS subjects;
DROP TABLE IF EXISTS issue_languages;
DROP TABLE IF EXISTS languages;
DROP TABLE IF EXISTS issues;
DROP TABLE IF EXISTS locations;
DROP TABLE IF EXISTS newspapers;
"#;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS newspapers (
    newspaper_id INTEGER PRIMARY KEY AUTOINCREMENT,
    lccn         TEXT UNIQUE NOT NULL,
    title        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS locations (
    location_id INTEGER PRIMARY KEY AUTOINCREMENT,
    city        TEXT NOT NULL,
    state       TEXT NOT NULL,
    country     TEXT NOT NULL,
    UNIQUE (city, state, country)
);

CREATE TABLE IF NOT EXISTS issues (
    issue_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    issue_loc_id TEXT UNIQUE NOT NULL,
    date_issued  TEXT NOT NULL,
    title        TEXT NOT NULL,
    medium       TEXT,
    image_url    TEXT,
    url          TEXT,
    newspaper_id INTEGER NOT NULL REFERENCES newspapers(newspaper_id) ON DELETE CASCADE,
    location_id  INTEGER NOT NULL REFERENCES locations(location_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS languages (
    language_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS issue_languages (
    issue_id    INTEGER NOT NULL REFERENCES issues(issue_id) ON DELETE CASCADE,
    language_id INTEGER NOT NULL REFERENCES languages(language_id) ON DELETE CASCADE,
    PRIMARY KEY (issue_id, language_id)
);

CREATE TABLE IF NOT EXISTS subjects (
    subject_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS issue_subjects (
    issue_id   INTEGER NOT NULL REFERENCES issues(issue_id) ON DELETE CASCADE,
    subject_id INTEGER NOT NULL REFERENCES subjects(subject_id) ON DELETE CASCADE,
    PRIMARY KEY (issue_id, subject_id)
);
"#;

/// Open (creating if needed) the database file with foreign keys enforced.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| EtlError::sink_unwritable(parent, e))?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Drop every table and recreate the schema.
#[instrument(level = "info", skip_all)]
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(DROP_TABLES)?;
    conn.execute_batch(CREATE_TABLES)?;
    info!("All tables dropped and recreated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        names
    }

    #[test]
    fn test_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        assert_eq!(
            table_names(&conn),
            vec![
                "issue_languages",
                "issue_subjects",
                "issues",
                "languages",
                "locations",
                "newspapers",
                "subjects"
            ]
        );
    }

    #[test]
    fn test_recreate_empties_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute("INSERT INTO newspapers (lccn, title) VALUES ('sn1', 'a')", [])
            .unwrap();
        create_tables(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM newspapers", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_lccn_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute("INSERT INTO newspapers (lccn, title) VALUES ('sn1', 'a')", [])
            .unwrap();
        assert!(
            conn.execute("INSERT INTO newspapers (lccn, title) VALUES ('sn1', 'b')", [])
                .is_err()
        );
    }

    #[test]
    fn test_open_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("n.db");
        let conn = open(&path).unwrap();
        create_tables(&conn).unwrap();
        assert!(path.exists());
    }
}
