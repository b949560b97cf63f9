//! # Row Sorting
//!
//! Produces row-index permutations sorted by one or more columns. The
//! comparison is lexicographic across the keys: the first column whose
//! comparison is non-equal decides, later keys only break ties. Sorting
//! is stable, so rows with fully equal keys keep their source order.
//!
//! Key cells are materialized once before sorting; the comparator itself
//! is infallible, so any decode error surfaces before the sort starts.

use eyre::Result;
use smallvec::SmallVec;
use std::cmp::Ordering;

use crate::schema::Table;
use crate::types::{CellValue, Comparer, SortOrder};

/// One column of a sort key.
#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    pub column: usize,
    pub order: SortOrder,
}

impl SortKey {
    pub fn new(column: usize, order: SortOrder) -> Self {
        Self { column, order }
    }
}

pub(crate) type KeyCells<'a> = SmallVec<[CellValue<'a>; 2]>;

/// Reads the key cells of every row up front, so sort and merge
/// comparators stay infallible.
pub(crate) fn materialize_keys<'t>(
    table: &'t dyn Table,
    columns: &[usize],
) -> Result<Vec<KeyCells<'t>>> {
    let count = table
        .row_count()
        .ok_or_else(|| eyre::eyre!("row count of '{}' not computed", table.name()))?;

    let mut cells = Vec::with_capacity(count);
    for row in 0..count {
        let mut key: KeyCells = SmallVec::with_capacity(columns.len());
        for &col in columns {
            key.push(table.value_at(row, col)?);
        }
        cells.push(key);
    }
    Ok(cells)
}

/// First-difference-wins comparison of two key-cell sequences.
pub(crate) fn lexicographic_compare(
    a: &[CellValue],
    b: &[CellValue],
    comparers: &[Comparer],
) -> Ordering {
    for ((av, bv), cmp) in a.iter().zip(b).zip(comparers) {
        let ord = cmp.compare(av, bv);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Row-index permutation of `table` sorted by `keys`.
pub fn sorted_rows(table: &dyn Table, keys: &[SortKey]) -> Result<Vec<usize>> {
    let count = table
        .row_count()
        .ok_or_else(|| eyre::eyre!("cannot sort '{}': row count not computed", table.name()))?;

    let columns: Vec<usize> = keys.iter().map(|k| k.column).collect();
    let comparers: Vec<Comparer> = keys
        .iter()
        .map(|k| Comparer::for_method(table.columns()[k.column].compare_method(), k.order))
        .collect();

    let cells = materialize_keys(table, &columns)?;

    let mut indices: Vec<usize> = (0..count).collect();
    indices.sort_by(|&a, &b| lexicographic_compare(&cells[a], &cells[b], &comparers));
    Ok(indices)
}

/// Sorted permutation of an explicit row subset, preserving the subset's
/// membership. Used when a consumer sorts a restricted range instead of
/// the whole table.
pub fn sorted_rows_subset(
    table: &dyn Table,
    keys: &[SortKey],
    subset: &[usize],
) -> Result<Vec<usize>> {
    let columns: Vec<usize> = keys.iter().map(|k| k.column).collect();
    let comparers: Vec<Comparer> = keys
        .iter()
        .map(|k| Comparer::for_method(table.columns()[k.column].compare_method(), k.order))
        .collect();

    let mut cells = Vec::with_capacity(subset.len());
    for &row in subset {
        let mut key: KeyCells = SmallVec::with_capacity(columns.len());
        for &col in &columns {
            key.push(table.value_at(row, col)?);
        }
        cells.push(key);
    }

    let mut order: Vec<usize> = (0..subset.len()).collect();
    order.sort_by(|&a, &b| lexicographic_compare(&cells[a], &cells[b], &comparers));
    Ok(order.into_iter().map(|i| subset[i]).collect())
}

/// Ascending permutation by a key column set, as the diff engine needs it.
pub fn sorted_rows_ascending(table: &dyn Table, key_columns: &[usize]) -> Result<Vec<usize>> {
    let keys: Vec<SortKey> = key_columns
        .iter()
        .map(|&c| SortKey::new(c, SortOrder::Ascending))
        .collect();
    sorted_rows(table, &keys)
}
