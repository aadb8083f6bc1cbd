//! Tabular rows read from and written to delimited text files.
//!
//! A [`Dataset`] is a header plus rows whose cells line up with it. A cell is
//! `None` when the input had no value for that column at all (a short record,
//! or a known column the file never declared) and `Some` otherwise, even when
//! the string is empty. Unknown columns are carried through untouched.

use crate::error::{EtlError, Result};
use crate::models::Field;
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info, instrument};

/// One record, positionally aligned with [`Dataset::header`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<Option<String>>,
}

impl Row {
    pub fn new(cells: Vec<Option<String>>) -> Self {
        Self { cells }
    }

    /// Builds a row of present cells.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: values.into_iter().map(|v| Some(v.into())).collect(),
        }
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).and_then(|c| c.as_deref())
    }

    /// Absent, or blank after trimming whitespace.
    pub fn is_missing(&self, idx: usize) -> bool {
        self.get(idx).is_none_or(|v| v.trim().is_empty())
    }

    pub fn set(&mut self, idx: usize, value: impl Into<String>) {
        if idx >= self.cells.len() {
            self.cells.resize(idx + 1, None);
        }
        self.cells[idx] = Some(value.into());
    }

    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }

    fn cells_mut(&mut self) -> &mut Vec<Option<String>> {
        &mut self.cells
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    header: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(header: Vec<String>, rows: Vec<Row>) -> Self {
        let mut dataset = Self { header, rows };
        dataset.pad_rows();
        dataset
    }

    /// An empty dataset sharing this one's header.
    pub fn empty_like(&self) -> Self {
        Self {
            header: self.header.clone(),
            rows: Vec::new(),
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
        self.pad_last();
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = Row>) {
        for row in rows {
            self.push(row);
        }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|h| h == column)
    }

    pub fn field_position(&self, field: Field) -> Option<usize> {
        self.position(field.column())
    }

    /// Value of `field` in `row`, if the column exists and the cell is present.
    pub fn value<'a>(&self, row: &'a Row, field: Field) -> Option<&'a str> {
        self.field_position(field).and_then(|idx| row.get(idx))
    }

    /// Appends any of `fields` the header lacks. Existing rows get an absent
    /// cell for each added column.
    pub fn ensure_fields(&mut self, fields: &[Field]) {
        let mut added = Vec::new();
        for field in fields {
            if self.field_position(*field).is_none() {
                self.header.push(field.column().to_string());
                added.push(field.column());
            }
        }
        if !added.is_empty() {
            debug!(columns = ?added, "Added columns missing from input header");
            self.pad_rows();
        }
    }

    /// Splits the dataset in two, keeping row order in both halves.
    /// Rows for which `pred` holds go to the second half.
    pub fn partition(self, mut pred: impl FnMut(&Row) -> bool) -> (Self, Self) {
        let header = self.header;
        let (matched, kept): (Vec<Row>, Vec<Row>) = self.rows.into_iter().partition(|r| pred(r));
        (
            Self {
                header: header.clone(),
                rows: kept,
            },
            Self {
                header,
                rows: matched,
            },
        )
    }

    /// Parses delimited text with a header row.
    pub fn from_reader<R: Read>(reader: R) -> std::result::Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let width = header.len();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let cells = (0..width)
                .map(|i| record.get(i).map(str::to_string))
                .collect();
            rows.push(Row::new(cells));
        }
        Ok(Self { header, rows })
    }

    /// Reads a CSV file. Any failure to open or parse it is a
    /// [`EtlError::SourceUnavailable`].
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn read_path(path: &Path) -> Result<Self> {
        let file = fs::File::open(path).map_err(|e| EtlError::source_unavailable(path, e))?;
        let dataset = Self::from_reader(file).map_err(|e| EtlError::source_unavailable(path, e))?;
        info!(rows = dataset.len(), columns = dataset.header.len(), "Loaded CSV");
        Ok(dataset)
    }

    /// Writes the header and every row. Absent cells are written empty.
    pub fn write_to<W: Write>(&self, writer: W) -> std::result::Result<(), csv::Error> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row.cells().iter().map(|c| c.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes a CSV file, replacing any previous contents. Parent directories
    /// are created. Failures are [`EtlError::SinkUnwritable`].
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn write_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| EtlError::sink_unwritable(parent, e))?;
        }
        let file = fs::File::create(path).map_err(|e| EtlError::sink_unwritable(path, e))?;
        self.write_to(file)
            .map_err(|e| EtlError::sink_unwritable(path, e))?;
        info!(rows = self.len(), "Wrote CSV");
        Ok(())
    }

    fn pad_rows(&mut self) {
        let width = self.header.len();
        for row in &mut self.rows {
            row.cells_mut().resize(width, None);
        }
    }

    fn pad_last(&mut self) {
        let width = self.header.len();
        if let Some(row) = self.rows.last_mut() {
            row.cells_mut().resize(width, None);
        }
    }
}
