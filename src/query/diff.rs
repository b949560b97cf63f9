//! # Two-Table Diff Engine
//!
//! `DiffTable` classifies the rows of two schema-identical tables by a
//! sort-merge join over a primary-key column set:
//!
//! - **Deleted**: the key exists only in the first table
//! - **New**: the key exists only in the second table
//! - **Same**: the key exists, sorted-equal, in both
//!
//! ## Presence Bits and Filter Masks
//!
//! A classification is encoded in two presence bits (bit 0 = present in
//! first, bit 1 = present in second), which makes the result filter a
//! pair of 2-bit masks: a classification passes iff
//! `(bits & include) == include && (bits & exclude) == 0`. "In first
//! only" is therefore include=01/exclude=10, and a mask requiring and
//! excluding the same bit is legal and simply admits nothing.
//!
//! ## Merge Join
//!
//! Both sources are sorted ascending by the key columns (lexicographic,
//! first non-equal column wins — see `query::sort`). Two cursors walk the
//! permutations: a lesser left key emits Deleted and advances the left, a
//! greater one emits New and advances the right, equality emits Same and
//! advances both. Once a side is exhausted the rest of the other side
//! flushes under its single classification. The filter mask applies at
//! emission; excluded entries are counted and logged, not surfaced.
//!
//! The entry sequence is computed exactly once: `update` is memoized and
//! later calls return without touching the sources.
//!
//! ## Reading Through the Diff
//!
//! Column 0 is the synthetic classification column; columns `1..=n` map
//! to source columns `0..n-1`. A read resolves the row's `DiffEntry` to
//! `(source slot, source row)` and forwards. Same entries reference the
//! second source, so an unchanged key reads its current (after-side)
//! values. Links gain a `source_slot` tag so drill-downs know which
//! physical table they resolve into.

use eyre::{ensure, Result};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use super::sort::{lexicographic_compare, materialize_keys, sorted_rows_ascending};
use crate::schema::{CellLink, ColumnMeta, Table};
use crate::types::{CellValue, Comparer, DataType, SortOrder};

/// Presence bit: the key exists in the first source table.
pub const PRESENT_IN_FIRST: u8 = 0b01;
/// Presence bit: the key exists in the second source table.
pub const PRESENT_IN_SECOND: u8 = 0b10;

/// Classification of one diff row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DiffResult {
    /// The zero value of the presence encoding. Never materialized by the
    /// merge join, but representable, so formatting handles it.
    None = 0b00,
    Deleted = PRESENT_IN_FIRST,
    New = PRESENT_IN_SECOND,
    Same = PRESENT_IN_FIRST | PRESENT_IN_SECOND,
}

impl DiffResult {
    pub fn bits(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            DiffResult::None => "",
            DiffResult::Deleted => "deleted",
            DiffResult::New => "new",
            DiffResult::Same => "same",
        }
    }
}

/// Include/exclude mask over the presence bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffFilter {
    include: u8,
    exclude: u8,
}

impl DiffFilter {
    /// Admits every classification, `None` included.
    pub const ALL: Self = Self::new(0, 0);
    /// Admits only keys present in the first table alone (Deleted).
    pub const IN_FIRST_ONLY: Self = Self::new(PRESENT_IN_FIRST, PRESENT_IN_SECOND);
    /// Admits only keys present in the second table alone (New).
    pub const IN_SECOND_ONLY: Self = Self::new(PRESENT_IN_SECOND, PRESENT_IN_FIRST);
    /// Admits only keys present in both tables (Same).
    pub const IN_BOTH_ONLY: Self = Self::new(PRESENT_IN_FIRST | PRESENT_IN_SECOND, 0);

    pub const fn new(include: u8, exclude: u8) -> Self {
        Self {
            include: include & 0b11,
            exclude: exclude & 0b11,
        }
    }

    pub fn admits(&self, result: DiffResult) -> bool {
        let bits = result.bits();
        (bits & self.include) == self.include && (bits & self.exclude) == 0
    }
}

/// One classified row of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffEntry {
    pub result: DiffResult,
    /// Which source the row reads from: 0 = first, 1 = second.
    pub slot: usize,
    /// Row index within that source.
    pub row: usize,
}

/// A table classifying the rows of two schema-identical sources.
pub struct DiffTable {
    name: String,
    sources: [Arc<dyn Table>; 2],
    key: SmallVec<[usize; 2]>,
    filter: DiffFilter,
    columns: Vec<ColumnMeta>,
    key_shifted: SmallVec<[usize; 2]>,
    entries: Option<Vec<DiffEntry>>,
}

impl DiffTable {
    /// Pairs two computed, schema-identical tables over the first table's
    /// declared primary key. A missing key is a configuration error.
    pub fn new(
        name: impl Into<String>,
        first: Arc<dyn Table>,
        second: Arc<dyn Table>,
        filter: DiffFilter,
    ) -> Result<Self> {
        let key: SmallVec<[usize; 2]> = first.primary_key().iter().copied().collect();
        Self::with_key(name, first, second, &key, filter)
    }

    /// Pairs two tables over an explicit key column set.
    pub fn with_key(
        name: impl Into<String>,
        first: Arc<dyn Table>,
        second: Arc<dyn Table>,
        key: &[usize],
        filter: DiffFilter,
    ) -> Result<Self> {
        let name = name.into();
        ensure!(
            first.row_count().is_some() && second.row_count().is_some(),
            "both sources of diff '{}' must be computed",
            name
        );
        ensure!(!key.is_empty(), "diff '{}' has no key columns", name);

        ensure!(
            first.column_count() == second.column_count(),
            "diff '{}' sources disagree on column count: {} vs {}",
            name,
            first.column_count(),
            second.column_count()
        );
        for (a, b) in first.columns().iter().zip(second.columns()) {
            ensure!(
                a.name() == b.name() && a.data_type() == b.data_type(),
                "diff '{}' sources disagree on column '{}'",
                name,
                a.name()
            );
        }
        ensure!(
            key.iter().all(|&k| k < first.column_count()),
            "diff '{}' key column out of range",
            name
        );

        let mut columns = Vec::with_capacity(first.column_count() + 1);
        columns.push(ColumnMeta::new("diff", DataType::Str));
        columns.extend(first.columns().iter().cloned());

        let key_shifted = key.iter().map(|&k| k + 1).collect();

        Ok(Self {
            name,
            sources: [first, second],
            key: key.iter().copied().collect(),
            filter,
            columns,
            key_shifted,
            entries: None,
        })
    }

    /// Runs the merge join once. Returns true if the entries were
    /// actually computed by this call.
    pub fn update(&mut self) -> Result<bool> {
        if self.entries.is_some() {
            return Ok(false);
        }

        let entries = {
            let first = &*self.sources[0];
            let second = &*self.sources[1];

            let sorted_a = sorted_rows_ascending(first, &self.key)?;
            let sorted_b = sorted_rows_ascending(second, &self.key)?;

            let keys_a = materialize_keys(first, &self.key)?;
            let keys_b = materialize_keys(second, &self.key)?;

            let comparers: Vec<Comparer> = self
                .key
                .iter()
                .map(|&k| {
                    Comparer::for_method(
                        first.columns()[k].compare_method(),
                        SortOrder::Ascending,
                    )
                })
                .collect();

            let mut entries = Vec::new();
            let mut ignored = 0usize;
            let mut emit = |result: DiffResult, slot: usize, row: usize| {
                if self.filter.admits(result) {
                    entries.push(DiffEntry { result, slot, row });
                } else {
                    ignored += 1;
                }
            };

            let (mut a, mut b) = (0usize, 0usize);
            while a < sorted_a.len() && b < sorted_b.len() {
                let row_a = sorted_a[a];
                let row_b = sorted_b[b];
                match lexicographic_compare(&keys_a[row_a], &keys_b[row_b], &comparers) {
                    Ordering::Less => {
                        emit(DiffResult::Deleted, 0, row_a);
                        a += 1;
                    }
                    Ordering::Equal => {
                        // Same rows read through the second source so an
                        // unchanged key shows its current values.
                        emit(DiffResult::Same, 1, row_b);
                        a += 1;
                        b += 1;
                    }
                    Ordering::Greater => {
                        emit(DiffResult::New, 1, row_b);
                        b += 1;
                    }
                }
            }
            while a < sorted_a.len() {
                emit(DiffResult::Deleted, 0, sorted_a[a]);
                a += 1;
            }
            while b < sorted_b.len() {
                emit(DiffResult::New, 1, sorted_b[b]);
                b += 1;
            }

            if ignored > 0 {
                debug!(table = %self.name, ignored, "diff entries excluded by filter mask");
            }
            entries
        };

        self.entries = Some(entries);
        Ok(true)
    }

    /// The computed entry sequence.
    pub fn entries(&self) -> Option<&[DiffEntry]> {
        self.entries.as_deref()
    }

    /// Entry backing one diff row.
    pub fn entry(&self, row: usize) -> &DiffEntry {
        &self.entries.as_ref().expect("diff not computed")[row]
    }

    /// The two source tables, in declaration order.
    pub fn sources(&self) -> &[Arc<dyn Table>; 2] {
        &self.sources
    }

    /// Number of entries with each classification, for reporting.
    pub fn classification_counts(&self) -> (usize, usize, usize) {
        let mut counts = (0usize, 0usize, 0usize);
        if let Some(entries) = &self.entries {
            for entry in entries {
                match entry.result {
                    DiffResult::Deleted => counts.0 += 1,
                    DiffResult::New => counts.1 += 1,
                    DiffResult::Same => counts.2 += 1,
                    DiffResult::None => {}
                }
            }
        }
        counts
    }
}

impl Table for DiffTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn row_count(&self) -> Option<usize> {
        self.entries.as_ref().map(Vec::len)
    }

    fn ensure_computed(&mut self) -> Result<bool> {
        self.update()
    }

    fn value_at(&self, row: usize, col: usize) -> Result<CellValue<'_>> {
        let entry = self.entry(row);
        if col == 0 {
            return Ok(CellValue::Str(Cow::Borrowed(entry.result.label())));
        }
        self.sources[entry.slot].value_at(entry.row, col - 1)
    }

    fn link_at(&self, row: usize, col: usize) -> Option<CellLink> {
        if col == 0 {
            return None;
        }
        let entry = self.entry(row);
        let mut link = self.sources[entry.slot].link_at(entry.row, col - 1)?;
        link.source_slot = Some(entry.slot);
        Some(link)
    }

    fn primary_key(&self) -> &[usize] {
        &self.key_shifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnMeta, MemoryTable};
    use std::borrow::Cow;

    fn objects(name: &str, rows: &[(&str, i64, i64)]) -> Arc<dyn Table> {
        let mut t = MemoryTable::new(
            name,
            vec![
                ColumnMeta::new("name", DataType::Str),
                ColumnMeta::new("key", DataType::Int),
                ColumnMeta::new("size", DataType::Int),
            ],
        )
        .with_primary_key(&["key"])
        .unwrap();
        for (object_name, key, size) in rows {
            t.push_row(vec![
                CellValue::Str(Cow::Owned(object_name.to_string())),
                CellValue::Int(*key),
                CellValue::Int(*size),
            ])
            .unwrap();
        }
        t.ensure_computed().unwrap();
        Arc::new(t)
    }

    fn diff(
        first: Arc<dyn Table>,
        second: Arc<dyn Table>,
        filter: DiffFilter,
    ) -> DiffTable {
        let mut d = DiffTable::new("objects_diff", first, second, filter).unwrap();
        d.update().unwrap();
        d
    }

    #[test]
    fn filter_mask_algebra() {
        assert!(DiffFilter::ALL.admits(DiffResult::None));
        assert!(DiffFilter::ALL.admits(DiffResult::Deleted));
        assert!(DiffFilter::ALL.admits(DiffResult::New));
        assert!(DiffFilter::ALL.admits(DiffResult::Same));

        assert!(DiffFilter::IN_FIRST_ONLY.admits(DiffResult::Deleted));
        assert!(!DiffFilter::IN_FIRST_ONLY.admits(DiffResult::New));
        assert!(!DiffFilter::IN_FIRST_ONLY.admits(DiffResult::Same));
        assert!(!DiffFilter::IN_FIRST_ONLY.admits(DiffResult::None));

        assert!(DiffFilter::IN_SECOND_ONLY.admits(DiffResult::New));
        assert!(!DiffFilter::IN_SECOND_ONLY.admits(DiffResult::Deleted));

        assert!(DiffFilter::IN_BOTH_ONLY.admits(DiffResult::Same));
        assert!(!DiffFilter::IN_BOTH_ONLY.admits(DiffResult::Deleted));
        assert!(!DiffFilter::IN_BOTH_ONLY.admits(DiffResult::New));
    }

    #[test]
    fn contradictory_mask_admits_nothing() {
        let filter = DiffFilter::new(PRESENT_IN_FIRST, PRESENT_IN_FIRST);
        for result in [
            DiffResult::None,
            DiffResult::Deleted,
            DiffResult::New,
            DiffResult::Same,
        ] {
            assert!(!filter.admits(result));
        }
    }

    #[test]
    fn self_diff_yields_only_same() {
        let a = objects("a", &[("Foo", 1, 100), ("Bar", 2, 50), ("Baz", 3, 10)]);
        let b = objects("b", &[("Foo", 1, 100), ("Bar", 2, 50), ("Baz", 3, 10)]);
        let d = diff(a, b, DiffFilter::ALL);

        let (deleted, new, same) = d.classification_counts();
        assert_eq!((deleted, new, same), (0, 0, 3));
        assert_eq!(d.row_count(), Some(3));
    }

    #[test]
    fn update_is_idempotent() {
        let a = objects("a", &[("Foo", 1, 100)]);
        let b = objects("b", &[("Foo", 1, 100)]);
        let mut d = DiffTable::new("d", a, b, DiffFilter::ALL).unwrap();

        assert!(d.update().unwrap());
        let first_ptr = d.entries().unwrap().as_ptr();
        assert!(!d.update().unwrap());
        assert_eq!(d.entries().unwrap().as_ptr(), first_ptr);
    }

    #[test]
    fn end_to_end_scenario() {
        // Snapshot A: ("Foo", 1) size 100, ("Bar", 2) size 50.
        // Snapshot B: ("Foo", 1) size 120, ("Baz", 3) size 10.
        let a = objects("a", &[("Foo", 1, 100), ("Bar", 2, 50)]);
        let b = objects("b", &[("Foo", 1, 120), ("Baz", 3, 10)]);
        let d = diff(a, b, DiffFilter::ALL);

        let entries = d.entries().unwrap();
        assert_eq!(entries.len(), 3);

        // Key 1 is Same; reading through it yields the after-side size.
        let same_row = entries
            .iter()
            .position(|e| e.result == DiffResult::Same)
            .unwrap();
        match d.value_at(same_row, 3).unwrap() {
            CellValue::Int(size) => assert_eq!(size, 120),
            other => panic!("unexpected cell {:?}", other),
        }

        // Key 2 is Deleted, read from the first table.
        let deleted_row = entries
            .iter()
            .position(|e| e.result == DiffResult::Deleted)
            .unwrap();
        assert_eq!(entries[deleted_row].slot, 0);
        match d.value_at(deleted_row, 2).unwrap() {
            CellValue::Int(key) => assert_eq!(key, 2),
            other => panic!("unexpected cell {:?}", other),
        }

        // Key 3 is New, read from the second table.
        let new_row = entries
            .iter()
            .position(|e| e.result == DiffResult::New)
            .unwrap();
        assert_eq!(entries[new_row].slot, 1);
        match d.value_at(new_row, 2).unwrap() {
            CellValue::Int(key) => assert_eq!(key, 3),
            other => panic!("unexpected cell {:?}", other),
        }
    }

    #[test]
    fn totality_partitions_both_tables() {
        let a = objects("a", &[("A", 1, 1), ("B", 2, 2), ("C", 3, 3), ("D", 4, 4)]);
        let b = objects("b", &[("C", 3, 3), ("D", 4, 40), ("E", 5, 5), ("F", 6, 6)]);
        let d = diff(a, b, DiffFilter::ALL);

        let (deleted, new, same) = d.classification_counts();
        // Every row of A is Deleted or Same, every row of B is New or Same.
        assert_eq!(deleted + same, 4);
        assert_eq!(new + same, 4);
        assert_eq!((deleted, new, same), (2, 2, 2));
    }

    #[test]
    fn filter_mask_applies_to_trailing_entries() {
        // B's extra keys all sort after A's; they flush as trailing New
        // entries and the mask must still apply.
        let a = objects("a", &[("A", 1, 1)]);
        let b = objects("b", &[("A", 1, 1), ("Y", 8, 8), ("Z", 9, 9)]);
        let d = diff(a, b, DiffFilter::IN_FIRST_ONLY);

        assert_eq!(d.row_count(), Some(0));
    }

    #[test]
    fn classification_column_renders_labels() {
        let a = objects("a", &[("Foo", 1, 100), ("Bar", 2, 50)]);
        let b = objects("b", &[("Foo", 1, 120)]);
        let d = diff(a, b, DiffFilter::ALL);

        let labels: Vec<String> = (0..d.row_count().unwrap())
            .map(|row| match d.value_at(row, 0).unwrap() {
                CellValue::Str(s) => s.into_owned(),
                other => panic!("unexpected cell {:?}", other),
            })
            .collect();
        assert_eq!(labels, vec!["same", "deleted"]);
    }

    #[test]
    fn links_carry_the_source_slot() {
        let mut first = MemoryTable::new(
            "refs",
            vec![
                ColumnMeta::new("key", DataType::Int),
                ColumnMeta::new("target", DataType::Int).with_link_to("objects"),
            ],
        )
        .with_primary_key(&["key"])
        .unwrap();
        first
            .push_row(vec![CellValue::Int(1), CellValue::Int(4)])
            .unwrap();
        first.ensure_computed().unwrap();

        let mut second = MemoryTable::new(
            "refs",
            vec![
                ColumnMeta::new("key", DataType::Int),
                ColumnMeta::new("target", DataType::Int).with_link_to("objects"),
            ],
        )
        .with_primary_key(&["key"])
        .unwrap();
        second
            .push_row(vec![CellValue::Int(2), CellValue::Int(7)])
            .unwrap();
        second.ensure_computed().unwrap();

        let d = diff(Arc::new(first), Arc::new(second), DiffFilter::ALL);

        for row in 0..d.row_count().unwrap() {
            let entry = *d.entry(row);
            let link = d.link_at(row, 2).unwrap();
            assert_eq!(link.source_slot, Some(entry.slot));
            assert_eq!(link.table, "objects");
        }
    }

    #[test]
    fn missing_key_is_an_error() {
        let mut t = MemoryTable::new("plain", vec![ColumnMeta::new("v", DataType::Int)]);
        t.push_row(vec![CellValue::Int(1)]).unwrap();
        t.ensure_computed().unwrap();
        let t: Arc<dyn Table> = Arc::new(t);

        let result = DiffTable::new("d", Arc::clone(&t), t, DiffFilter::ALL);
        assert!(result.is_err());
    }

    #[test]
    fn mismatched_schemas_are_an_error() {
        let a = objects("a", &[("Foo", 1, 100)]);

        let mut b = MemoryTable::new(
            "b",
            vec![
                ColumnMeta::new("name", DataType::Str),
                ColumnMeta::new("key", DataType::Int),
            ],
        )
        .with_primary_key(&["key"])
        .unwrap();
        b.push_row(vec![
            CellValue::Str(Cow::Borrowed("Foo")),
            CellValue::Int(1),
        ])
        .unwrap();
        b.ensure_computed().unwrap();

        assert!(DiffTable::new("d", a, Arc::new(b), DiffFilter::ALL).is_err());
    }

    #[test]
    fn composite_key_first_difference_wins() {
        let make = |name: &str, rows: &[(i64, i64)]| -> Arc<dyn Table> {
            let mut t = MemoryTable::new(
                name,
                vec![
                    ColumnMeta::new("hi", DataType::Int),
                    ColumnMeta::new("lo", DataType::Int),
                ],
            )
            .with_primary_key(&["hi", "lo"])
            .unwrap();
            for (hi, lo) in rows {
                t.push_row(vec![CellValue::Int(*hi), CellValue::Int(*lo)])
                    .unwrap();
            }
            t.ensure_computed().unwrap();
            Arc::new(t)
        };

        // (1, 2) matches only (1, 2); (1, 3) and (2, 2) are distinct keys.
        let a = make("a", &[(1, 2), (1, 3)]);
        let b = make("b", &[(1, 2), (2, 2)]);
        let d = diff(a, b, DiffFilter::ALL);

        let (deleted, new, same) = d.classification_counts();
        assert_eq!((deleted, new, same), (1, 1, 1));
    }
}
