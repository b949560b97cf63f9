//! # In-Memory Tables
//!
//! `MemoryTable` owns its rows outright. Consumers use it for small
//! derived datasets and tests use it as the canonical mutable source:
//! it is the one table in the crate whose row numbering can change after
//! computation, which makes it the producer side of the renumbering
//! protocol (`remove_rows` returns the `RowIndexRemap` dependents pull).

use eyre::{ensure, Result};
use smallvec::SmallVec;
use std::borrow::Cow;

use super::{CellLink, ColumnMeta, RowIndexRemap, Table};
use crate::types::CellValue;

/// A table whose rows live in memory.
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<CellValue<'static>>>,
    primary_key: SmallVec<[usize; 2]>,
    computed: bool,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnMeta>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
            primary_key: SmallVec::new(),
            computed: false,
        }
    }

    /// Declares the primary-key column set by name, in key order.
    pub fn with_primary_key(mut self, names: &[&str]) -> Result<Self> {
        let mut key = SmallVec::new();
        for name in names {
            let index = self
                .column_index(name)
                .ok_or_else(|| eyre::eyre!("unknown key column '{}' in table '{}'", name, self.name))?;
            key.push(index);
        }
        self.primary_key = key;
        Ok(self)
    }

    /// Appends a row. Rows can only be appended before the row count is
    /// computed; later changes go through the renumbering protocol.
    pub fn push_row(&mut self, row: Vec<CellValue<'static>>) -> Result<()> {
        ensure!(
            !self.computed,
            "cannot append rows to '{}' after row count computation",
            self.name
        );
        ensure!(
            row.len() == self.columns.len(),
            "row arity {} does not match {} columns of '{}'",
            row.len(),
            self.columns.len(),
            self.name
        );
        self.rows.push(row);
        Ok(())
    }

    /// Removes rows and renumbers the survivors, returning the remap that
    /// dependents apply to their own stored indexes.
    pub fn remove_rows(&mut self, removed: &[usize]) -> RowIndexRemap {
        assert!(self.computed, "remove_rows on uncomputed table");

        let remap = RowIndexRemap::from_removed_rows(self.rows.len(), removed);
        let old_rows = std::mem::take(&mut self.rows);
        self.rows = old_rows
            .into_iter()
            .enumerate()
            .filter_map(|(i, row)| remap.remap(i).map(|_| row))
            .collect();
        remap
    }
}

impl Table for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn row_count(&self) -> Option<usize> {
        self.computed.then_some(self.rows.len())
    }

    fn ensure_computed(&mut self) -> Result<bool> {
        if self.computed {
            return Ok(false);
        }
        self.computed = true;
        Ok(true)
    }

    fn value_at(&self, row: usize, col: usize) -> Result<CellValue<'_>> {
        assert!(row < self.rows.len(), "row {} out of range", row);
        assert!(col < self.columns.len(), "column {} out of range", col);
        Ok(match &self.rows[row][col] {
            CellValue::Str(s) => CellValue::Str(Cow::Borrowed(s)),
            other => other.clone(),
        })
    }

    fn link_at(&self, row: usize, col: usize) -> Option<CellLink> {
        let target = self.columns[col].link_to()?;
        match self.rows.get(row)?.get(col)? {
            CellValue::Int(n) if *n >= 0 => Some(CellLink {
                table: target.to_string(),
                row: *n as usize,
                source_slot: None,
            }),
            _ => None,
        }
    }

    fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }
}
