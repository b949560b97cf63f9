//! # Table and Schema Abstraction
//!
//! The query engine sees every data source through one contract: a
//! `Table` is an ordered list of named, typed columns plus a row count
//! that must be explicitly computed before it can be read. Concrete
//! implementations include file-backed section tables, in-memory tables,
//! and the derived views (match filters, diffs) in the query module.
//!
//! ## Row Count Lifecycle
//!
//! A freshly constructed table does not know its row count;
//! `row_count()` returns `None` until `ensure_computed()` has run.
//! `ensure_computed` is idempotent and reports whether it actually did
//! work, so callers can use it both as a barrier ("make this queryable")
//! and as a cheap no-op on an already-computed table. The engine is
//! single-writer by design: computation takes `&mut self`, shared read
//! access starts after computation, typically behind `Arc<dyn Table>`.
//!
//! ## Derived Views and Renumbering
//!
//! Derived tables hold non-owning `Arc` references to their sources.
//! When a source renumbers its rows, the change propagates through the
//! explicit pull protocol in [`remap`]: the source hands out a
//! `RowIndexRemap`, each dependent rebuilds its indexes through it and
//! produces its own remap for views derived from *it*. Nothing here is
//! event-driven; ordering stays deterministic.
//!
//! ## Components
//!
//! - [`column`]: `ColumnMeta` (type, comparison method, display style)
//! - [`remap`]: `RowIndexRemap`, the renumbering value
//! - [`memory`]: `MemoryTable`, the owned-rows implementation
//! - `Table` / `ColumnRef` / `Schema` in this module

pub mod column;
pub mod memory;
pub mod remap;

pub use column::ColumnMeta;
pub use memory::MemoryTable;
pub use remap::RowIndexRemap;

use eyre::{ensure, Result};
use hashbrown::HashMap;
use std::sync::Arc;

use crate::types::{CellValue, SortOrder};

/// A cross-reference from a cell into another table, used by consumers to
/// drill down. Views over two sources tag which source slot the link
/// resolved into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLink {
    /// Name of the table the link points into.
    pub table: String,
    /// Row within the target table.
    pub row: usize,
    /// For two-source views: which source (0 or 1) produced the link.
    pub source_slot: Option<usize>,
}

/// The virtual-relation contract every data source implements.
pub trait Table: Send + Sync {
    /// Table name, unique within its owning schema.
    fn name(&self) -> &str;

    /// Ordered column metadata.
    fn columns(&self) -> &[ColumnMeta];

    /// Row count, or `None` until `ensure_computed` has run.
    fn row_count(&self) -> Option<usize>;

    /// Computes the row count (and whatever backs it) if not yet done.
    /// Returns true if work was actually performed.
    fn ensure_computed(&mut self) -> Result<bool>;

    /// Value of one cell. Row and column must be in range (a violation is
    /// a caller bug, not a recoverable condition); decoding the cell can
    /// still fail for file-backed tables.
    fn value_at(&self, row: usize, col: usize) -> Result<CellValue<'_>>;

    /// Cross-reference link carried by a cell, if the column declares one.
    fn link_at(&self, row: usize, col: usize) -> Option<CellLink>;

    /// Indexes of the primary-key column set; empty if none is declared.
    fn primary_key(&self) -> &[usize];

    /// Position of a column by name.
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.name() == name)
    }

    fn column_count(&self) -> usize {
        self.columns().len()
    }
}

/// A borrowed view of one column of a table, combining the table's data
/// access with the column's metadata.
#[derive(Clone, Copy)]
pub struct ColumnRef<'t> {
    table: &'t dyn Table,
    index: usize,
}

impl<'t> ColumnRef<'t> {
    pub fn new(table: &'t dyn Table, index: usize) -> Self {
        assert!(
            index < table.column_count(),
            "column index {} out of range for table '{}' with {} columns",
            index,
            table.name(),
            table.column_count()
        );
        Self { table, index }
    }

    /// Looks a column up by name.
    pub fn by_name(table: &'t dyn Table, name: &str) -> Option<Self> {
        table.column_index(name).map(|index| Self { table, index })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn meta(&self) -> &'t ColumnMeta {
        &self.table.columns()[self.index]
    }

    /// Value of this column at `row`.
    pub fn value_at(&self, row: usize) -> Result<CellValue<'t>> {
        self.table.value_at(row, self.index)
    }

    /// Rendered value of this column at `row`, honoring the column's
    /// display style and enum names.
    pub fn display_at(&self, row: usize) -> Result<String> {
        let value = self.table.value_at(row, self.index)?;
        Ok(self.meta().display_cell(&value))
    }

    /// Row-index permutation of the whole table sorted by this column.
    pub fn sorted_row_indices(&self, order: SortOrder) -> Result<Vec<usize>> {
        crate::query::sort::sorted_rows(
            self.table,
            &[crate::query::sort::SortKey::new(self.index, order)],
        )
    }

    /// Sorted permutation of an explicit row subset.
    pub fn sorted_row_indices_within(
        &self,
        order: SortOrder,
        subset: &[usize],
    ) -> Result<Vec<usize>> {
        crate::query::sort::sorted_rows_subset(
            self.table,
            &[crate::query::sort::SortKey::new(self.index, order)],
            subset,
        )
    }
}

/// A named collection of computed tables.
pub struct Schema {
    name: String,
    tables: Vec<Arc<dyn Table>>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a table. The table must already have computed its row count;
    /// a schema only hands out shared references, so there is no later
    /// opportunity to compute.
    pub fn add_table(&mut self, table: Arc<dyn Table>) -> Result<()> {
        ensure!(
            table.row_count().is_some(),
            "table '{}' must be computed before joining schema '{}'",
            table.name(),
            self.name
        );
        ensure!(
            !self.index.contains_key(table.name()),
            "duplicate table name '{}' in schema '{}'",
            table.name(),
            self.name
        );
        self.index.insert(table.name().to_string(), self.tables.len());
        self.tables.push(table);
        Ok(())
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn table_by_name(&self, name: &str) -> Option<&Arc<dyn Table>> {
        self.index.get(name).map(|&i| &self.tables[i])
    }

    /// Tables in insertion order.
    pub fn tables(&self) -> impl Iterator<Item = &Arc<dyn Table>> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name())
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("tables", &self.tables.iter().map(|t| t.name()).collect::<Vec<_>>())
            .finish()
    }
}
