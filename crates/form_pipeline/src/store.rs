//! Record store backed by an xlsx workbook
//!
//! The first worksheet holds one header row of field names followed by one
//! row per record. Every append reads the whole sheet, merges the new
//! records in and rewrites the file through a temporary file and a rename.

use crate::error::StoreError;
use crate::types::{Record, SearchScope, Table};
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, XlsxError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Spreadsheet-backed, append-only record table
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Full table, or an empty one if nothing has been stored yet
    pub fn load_all(&self) -> Result<Table, StoreError> {
        if !self.exists() {
            debug!(path = %self.path.display(), "Store does not exist yet");
            return Ok(Table::new());
        }
        self.read_table()
    }

    /// Full table, failing with [`StoreError::Missing`] if there is no store file
    pub fn load_existing(&self) -> Result<Table, StoreError> {
        if !self.exists() {
            return Err(StoreError::Missing {
                path: self.path.clone(),
            });
        }
        self.read_table()
    }

    /// Rows matching `needle` under `scope`
    pub fn search(&self, needle: &str, scope: SearchScope) -> Result<Table, StoreError> {
        Ok(self.load_existing()?.search(needle, scope))
    }

    /// Add `records` as new rows after the existing ones
    ///
    /// Returns the total number of rows now stored. Records without any
    /// non-empty value would be written as blank rows that do not survive a
    /// reload, so they are dropped; if nothing remains the file is untouched.
    pub fn append(&self, records: &[Record]) -> Result<usize, StoreError> {
        let (kept, blank): (Vec<&Record>, Vec<&Record>) =
            records.iter().partition(|r| r.has_values());
        if !blank.is_empty() {
            debug!(count = blank.len(), "Dropping records without values");
        }

        let mut table = self.load_all()?;
        if kept.is_empty() {
            return Ok(table.len());
        }

        let before = table.len();
        for record in kept {
            table.push_record(record);
        }

        self.write_table(&table)?;
        info!(
            path = %self.path.display(),
            added = table.len() - before,
            total = table.len(),
            columns = table.columns().len(),
            "Saved records"
        );
        Ok(table.len())
    }

    fn read_table(&self) -> Result<Table, StoreError> {
        let read_err = |source: calamine::Error| StoreError::Read {
            path: self.path.clone(),
            source,
        };

        let mut workbook = open_workbook_auto(&self.path).map_err(read_err)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| StoreError::Malformed {
                path: self.path.clone(),
            })?
            .map_err(read_err)?;

        let mut rows = range.rows();
        let columns: Vec<String> = match rows.next() {
            Some(header) => header.iter().map(cell_to_string).collect(),
            None => return Ok(Table::new()),
        };
        let rows = rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        let table = Table::from_parts(columns, rows);
        debug!(
            path = %self.path.display(),
            rows = table.len(),
            columns = table.columns().len(),
            "Loaded store"
        );
        Ok(table)
    }

    fn write_table(&self, table: &Table) -> Result<(), StoreError> {
        let bytes = render_workbook(table).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

fn render_workbook(table: &Table) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header = Format::new().set_bold();

    for (c, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col_num(c)?, name, &header)?;
    }
    for (r, row) in table.rows().iter().enumerate() {
        let r = RowNum::try_from(r + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(r, col_num(c)?, value)?;
            }
        }
    }
    worksheet.autofit();

    workbook.save_to_buffer()
}

fn col_num(c: usize) -> Result<ColNum, XlsxError> {
    ColNum::try_from(c).map_err(|_| XlsxError::RowColumnLimitError)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // Whole numbers written by other tools come back as floats
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
