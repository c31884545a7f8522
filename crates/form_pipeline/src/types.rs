//! Core types for the form pipeline
//!
//! A [`Record`] is the set of fields read from one scanned form. A
//! [`Table`] is the persisted collection of records: one row per record,
//! one column per field name ever seen.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fields extracted from one form, in the order they were first seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, overwriting the value in place if the name already exists
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut String> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// At least one field has a non-empty value
    pub fn has_values(&self) -> bool {
        self.fields.iter().any(|(_, v)| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Rewrite every value with `f`
    pub fn map_values(&mut self, mut f: impl FnMut(&str) -> String) {
        for (_, value) in &mut self.fields {
            *value = f(value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Which cells a search looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Every cell of the row, joined with single spaces
    #[default]
    AllColumns,
    /// Only the first column
    FirstColumn,
}

/// Tabular view of all stored records
///
/// Rows are always as wide as `columns`; cells a record never had are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a header and rows, padding or cutting rows to the header width
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a cell by row index and column name
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    fn column_index_or_add(&mut self, name: &str) -> usize {
        if let Some(idx) = self.columns.iter().position(|c| c == name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.columns.len() - 1
    }

    /// Append one record as a new row, adding any columns it introduces
    pub fn push_record(&mut self, record: &Record) {
        let indices: Vec<(usize, &str)> = record
            .iter()
            .map(|(name, value)| (self.column_index_or_add(name), value))
            .collect();

        let mut row = vec![String::new(); self.columns.len()];
        for (idx, value) in indices {
            row[idx] = value.to_string();
        }
        self.rows.push(row);
    }

    /// Append all rows of `other` after this table's rows, unioning the columns
    pub fn extend(&mut self, other: &Table) {
        let indices: Vec<usize> = other
            .columns
            .iter()
            .map(|name| self.column_index_or_add(name))
            .collect();

        for source in &other.rows {
            let mut row = vec![String::new(); self.columns.len()];
            for (cell, &idx) in source.iter().zip(&indices) {
                row[idx] = cell.clone();
            }
            self.rows.push(row);
        }
    }

    /// Rows in which `needle` occurs, keeping the full column set
    pub fn search(&self, needle: &str, scope: SearchScope) -> Table {
        let rows = self
            .rows
            .iter()
            .filter(|row| match scope {
                SearchScope::AllColumns => row.join(" ").contains(needle),
                SearchScope::FirstColumn => row.first().is_some_and(|c| c.contains(needle)),
            })
            .cloned()
            .collect();

        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}

impl fmt::Display for Table {
    /// Columns left-aligned and padded to their widest cell
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        write_row(f, &self.columns, &widths)?;
        for row in &self.rows {
            write_row(f, row, &widths)?;
        }
        Ok(())
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{:<w$}", cell, w = w))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(f, "{}", line.trim_end())
}
