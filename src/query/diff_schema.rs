//! # Whole-Schema Diffing
//!
//! `DiffSchema` pairs every table of a "before" schema with the
//! same-named table of an "after" schema and builds one `DiffTable` per
//! pair, eagerly, at construction time. Eagerness is deliberate: paying
//! the merge joins up front is what makes an orientation swap a pure
//! metadata flip — the entry sequences never have to be recomputed.
//!
//! ## Skipped Pairs
//!
//! A table is skipped, with a warning, when it lacks a counterpart of the
//! same name, lacks a declared primary key, or fails to pair (column
//! layouts differ). Pairing problems are schema errors: they are absorbed
//! here so one bad table cannot fail the rest of the diff.
//!
//! ## Orientation
//!
//! Which snapshot counts as "older" is display metadata. Entries store
//! source slots 0/1, not older/newer, so `on_snapshots_swapped` flips a
//! flag that only [`DiffSchema::classification_label`] reads.

use eyre::Result;
use hashbrown::HashMap;
use tracing::warn;

use super::diff::{DiffFilter, DiffResult, DiffTable};
use crate::schema::Schema;
use std::sync::Arc;

/// Eagerly built diffs of every pairable table of two schemas.
pub struct DiffSchema {
    first_name: String,
    second_name: String,
    tables: Vec<DiffTable>,
    index: HashMap<String, usize>,
    swapped: bool,
    same_session: bool,
}

impl DiffSchema {
    /// Pairs and diffs `before` and `after`. `swapped` marks the second
    /// schema as the older one for labeling; `same_session` records that
    /// both captures came from one process run (labels may then treat
    /// object identifiers as stable).
    pub fn build(
        before: &Schema,
        after: &Schema,
        swapped: bool,
        same_session: bool,
    ) -> Result<Self> {
        let mut tables = Vec::new();
        let mut index = HashMap::new();

        for table in before.tables() {
            let name = table.name();
            let Some(counterpart) = after.table_by_name(name) else {
                warn!(table = name, "skipping diff: no counterpart in second schema");
                continue;
            };
            if table.primary_key().is_empty() {
                warn!(table = name, "skipping diff: no usable primary key");
                continue;
            }

            let diff = DiffTable::new(
                format!("{}_diff", name),
                Arc::clone(table),
                Arc::clone(counterpart),
                DiffFilter::ALL,
            )
            .and_then(|mut diff| {
                diff.update()?;
                Ok(diff)
            });
            match diff {
                Ok(diff) => {
                    index.insert(name.to_string(), tables.len());
                    tables.push(diff);
                }
                Err(error) => {
                    warn!(table = name, %error, "skipping diff: pairing failed");
                }
            }
        }

        Ok(Self {
            first_name: before.name().to_string(),
            second_name: after.name().to_string(),
            tables,
            index,
            swapped,
            same_session,
        })
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Diff of the named source table, if the pair was built.
    pub fn table_by_name(&self, name: &str) -> Option<&DiffTable> {
        self.index.get(name).map(|&i| &self.tables[i])
    }

    pub fn tables(&self) -> impl Iterator<Item = &DiffTable> {
        self.tables.iter()
    }

    /// Flips which snapshot is considered older. Pure metadata: the
    /// entries of every built diff stay untouched.
    pub fn on_snapshots_swapped(&mut self) {
        self.swapped = !self.swapped;
    }

    pub fn swapped(&self) -> bool {
        self.swapped
    }

    pub fn same_session(&self) -> bool {
        self.same_session
    }

    /// The snapshot currently considered newer, per the orientation flag.
    pub fn newer_snapshot_name(&self) -> &str {
        if self.swapped {
            &self.first_name
        } else {
            &self.second_name
        }
    }

    /// Orientation-aware label for a classification, e.g. "deleted in B".
    pub fn classification_label(&self, result: DiffResult) -> String {
        match result {
            DiffResult::None => String::new(),
            DiffResult::Same => "same".to_string(),
            DiffResult::Deleted => format!("deleted in {}", self.newer_snapshot_name()),
            DiffResult::New => format!("new in {}", self.newer_snapshot_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::diff::DiffResult;
    use crate::schema::{ColumnMeta, MemoryTable, Table};
    use crate::types::{CellValue, DataType};
    use std::borrow::Cow;
    use std::sync::Arc;

    fn keyed_table(name: &str, rows: &[(i64, &str)]) -> Arc<dyn Table> {
        let mut t = MemoryTable::new(
            name,
            vec![
                ColumnMeta::new("key", DataType::Int),
                ColumnMeta::new("name", DataType::Str),
            ],
        )
        .with_primary_key(&["key"])
        .unwrap();
        for (key, name) in rows {
            t.push_row(vec![
                CellValue::Int(*key),
                CellValue::Str(Cow::Owned(name.to_string())),
            ])
            .unwrap();
        }
        t.ensure_computed().unwrap();
        Arc::new(t)
    }

    fn keyless_table(name: &str) -> Arc<dyn Table> {
        let mut t = MemoryTable::new(name, vec![ColumnMeta::new("v", DataType::Int)]);
        t.push_row(vec![CellValue::Int(1)]).unwrap();
        t.ensure_computed().unwrap();
        Arc::new(t)
    }

    fn schemas() -> (Schema, Schema) {
        let mut before = Schema::new("A");
        before
            .add_table(keyed_table("objects", &[(1, "Foo"), (2, "Bar")]))
            .unwrap();
        before.add_table(keyless_table("stats")).unwrap();
        before
            .add_table(keyed_table("orphan", &[(1, "X")]))
            .unwrap();

        let mut after = Schema::new("B");
        after
            .add_table(keyed_table("objects", &[(1, "Foo"), (3, "Baz")]))
            .unwrap();
        after.add_table(keyless_table("stats")).unwrap();

        (before, after)
    }

    #[test]
    fn pairs_only_keyed_tables_with_counterparts() {
        let (before, after) = schemas();
        let diff = DiffSchema::build(&before, &after, false, false).unwrap();

        // "stats" has no key and "orphan" has no counterpart.
        assert_eq!(diff.table_count(), 1);
        assert!(diff.table_by_name("objects").is_some());
        assert!(diff.table_by_name("stats").is_none());
        assert!(diff.table_by_name("orphan").is_none());
    }

    #[test]
    fn diffs_are_built_eagerly() {
        let (before, after) = schemas();
        let diff = DiffSchema::build(&before, &after, false, false).unwrap();

        // Entries exist without any further update call.
        let objects = diff.table_by_name("objects").unwrap();
        assert_eq!(objects.row_count(), Some(3));
    }

    #[test]
    fn orientation_swap_keeps_entries_and_flips_labels() {
        let (before, after) = schemas();
        let mut diff = DiffSchema::build(&before, &after, false, false).unwrap();

        let before_counts = diff.table_by_name("objects").unwrap().classification_counts();
        assert_eq!(
            diff.classification_label(DiffResult::Deleted),
            "deleted in B"
        );

        diff.on_snapshots_swapped();

        let after_counts = diff.table_by_name("objects").unwrap().classification_counts();
        assert_eq!(before_counts, after_counts);
        assert_eq!(
            diff.classification_label(DiffResult::Deleted),
            "deleted in A"
        );
        assert_eq!(diff.classification_label(DiffResult::Same), "same");
    }

    #[test]
    fn mismatched_layout_pair_is_skipped_not_fatal() {
        let mut before = Schema::new("A");
        before
            .add_table(keyed_table("objects", &[(1, "Foo")]))
            .unwrap();

        // Same name, same key, different column layout.
        let mut odd = MemoryTable::new(
            "objects",
            vec![ColumnMeta::new("key", DataType::Int)],
        )
        .with_primary_key(&["key"])
        .unwrap();
        odd.push_row(vec![CellValue::Int(1)]).unwrap();
        odd.ensure_computed().unwrap();
        let mut after = Schema::new("B");
        after.add_table(Arc::new(odd)).unwrap();

        let diff = DiffSchema::build(&before, &after, false, false).unwrap();
        assert_eq!(diff.table_count(), 0);
    }
}
