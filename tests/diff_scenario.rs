//! # Snapshot Diffing Integration Tests
//!
//! Drives the full pipeline the analysis UI uses: write two captures,
//! load each into a schema, filter and diff them, and read results back
//! through the public table surface.
//!
//! ## Test Categories
//!
//! 1. **Diff Tests**: classification, value forwarding, orientation
//! 2. **Filter Tests**: match filters layered over file-backed tables
//! 3. **Composition Tests**: filters over diffs (views are tables too)
//!
//! ## Running Tests
//!
//! ```sh
//! cargo test --test diff_scenario
//! ```

use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use snapview::query::sorted_rows_ascending;
use snapview::types::{CellValue, DataType, DisplayStyle};
use snapview::{
    ColumnMeta, DiffFilter, DiffResult, DiffSchema, DiffTable, MatchTable, RowRange, Schema,
    Snapshot, Table, TableSpec,
};

fn write_capture(path: &Path, rows: &[(&str, i64, i64)]) {
    let mut writer = snapview::CaptureWriter::new();

    let names: Vec<&[u8]> = rows.iter().map(|(name, _, _)| name.as_bytes()).collect();
    writer.add_entries("object_names", &names).unwrap();

    let keys: Vec<[u8; 8]> = rows.iter().map(|(_, key, _)| key.to_le_bytes()).collect();
    let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();
    writer.add_entries("object_keys", &key_refs).unwrap();

    let sizes: Vec<[u8; 8]> = rows.iter().map(|(_, _, size)| size.to_le_bytes()).collect();
    let size_refs: Vec<&[u8]> = sizes.iter().map(|s| s.as_slice()).collect();
    writer.add_entries("object_sizes", &size_refs).unwrap();

    writer.finish(path).unwrap();
}

fn objects_spec() -> TableSpec {
    TableSpec::new("native_objects")
        .column(ColumnMeta::new("name", DataType::Str), "object_names")
        .column(ColumnMeta::new("key", DataType::Int), "object_keys")
        .column(
            ColumnMeta::new("size", DataType::Int).with_display(DisplayStyle::Bytes),
            "object_sizes",
        )
        .primary_key(&["key"])
}

/// Loads the canonical two-snapshot fixture: A has (Foo,1)=100 and
/// (Bar,2)=50; B has (Foo,1)=120 and (Baz,3)=10.
fn load_fixture(dir: &Path) -> (Schema, Schema) {
    let path_a = dir.join("a.snap");
    let path_b = dir.join("b.snap");
    write_capture(&path_a, &[("Foo", 1, 100), ("Bar", 2, 50)]);
    write_capture(&path_b, &[("Foo", 1, 120), ("Baz", 3, 10)]);

    let schema_a = Snapshot::open(&path_a)
        .unwrap()
        .load_schema("A", &[objects_spec()])
        .unwrap();
    let schema_b = Snapshot::open(&path_b)
        .unwrap()
        .load_schema("B", &[objects_spec()])
        .unwrap();
    (schema_a, schema_b)
}

mod diff_tests {
    use super::*;

    #[test]
    fn schema_diff_classifies_the_fixture() {
        let dir = tempdir().unwrap();
        let (schema_a, schema_b) = load_fixture(dir.path());

        let diff = DiffSchema::build(&schema_a, &schema_b, false, true).unwrap();
        let objects = diff.table_by_name("native_objects").unwrap();

        let (deleted, new, same) = objects.classification_counts();
        assert_eq!((deleted, new, same), (1, 1, 1));
    }

    #[test]
    fn same_rows_read_after_side_values() {
        let dir = tempdir().unwrap();
        let (schema_a, schema_b) = load_fixture(dir.path());

        let diff = DiffSchema::build(&schema_a, &schema_b, false, true).unwrap();
        let objects = diff.table_by_name("native_objects").unwrap();

        for row in 0..objects.row_count().unwrap() {
            let entry = *objects.entry(row);
            if entry.result != DiffResult::Same {
                continue;
            }
            // Column 3 is "size" (column 0 is the classification).
            match objects.value_at(row, 3).unwrap() {
                CellValue::Int(size) => assert_eq!(size, 120),
                other => panic!("unexpected cell {:?}", other),
            }
        }
    }

    #[test]
    fn deleted_and_new_read_their_own_side() {
        let dir = tempdir().unwrap();
        let (schema_a, schema_b) = load_fixture(dir.path());

        let diff = DiffSchema::build(&schema_a, &schema_b, false, true).unwrap();
        let objects = diff.table_by_name("native_objects").unwrap();

        for row in 0..objects.row_count().unwrap() {
            let entry = *objects.entry(row);
            let key = match objects.value_at(row, 2).unwrap() {
                CellValue::Int(key) => key,
                other => panic!("unexpected cell {:?}", other),
            };
            match entry.result {
                DiffResult::Deleted => {
                    assert_eq!(entry.slot, 0);
                    assert_eq!(key, 2);
                }
                DiffResult::New => {
                    assert_eq!(entry.slot, 1);
                    assert_eq!(key, 3);
                }
                DiffResult::Same => assert_eq!(key, 1),
                DiffResult::None => panic!("merge join materialized None"),
            }
        }
    }

    #[test]
    fn orientation_swap_is_pure_metadata() {
        let dir = tempdir().unwrap();
        let (schema_a, schema_b) = load_fixture(dir.path());

        let mut diff = DiffSchema::build(&schema_a, &schema_b, false, true).unwrap();
        let counts = diff
            .table_by_name("native_objects")
            .unwrap()
            .classification_counts();
        assert_eq!(diff.classification_label(DiffResult::New), "new in B");

        diff.on_snapshots_swapped();

        assert_eq!(
            diff.table_by_name("native_objects")
                .unwrap()
                .classification_counts(),
            counts
        );
        assert_eq!(diff.classification_label(DiffResult::New), "new in A");
    }

    #[test]
    fn restrictive_masks_on_file_backed_tables() {
        let dir = tempdir().unwrap();
        let (schema_a, schema_b) = load_fixture(dir.path());
        let a = schema_a.table_by_name("native_objects").unwrap();
        let b = schema_b.table_by_name("native_objects").unwrap();

        let mut deleted_only = DiffTable::new(
            "deleted_only",
            Arc::clone(a),
            Arc::clone(b),
            DiffFilter::IN_FIRST_ONLY,
        )
        .unwrap();
        deleted_only.update().unwrap();
        assert_eq!(deleted_only.classification_counts(), (1, 0, 0));

        let mut same_only = DiffTable::new(
            "same_only",
            Arc::clone(a),
            Arc::clone(b),
            DiffFilter::IN_BOTH_ONLY,
        )
        .unwrap();
        same_only.update().unwrap();
        assert_eq!(same_only.classification_counts(), (0, 0, 1));
    }
}

mod filter_tests {
    use super::*;

    #[test]
    fn match_filter_over_section_table() {
        let dir = tempdir().unwrap();
        let (schema_a, _) = load_fixture(dir.path());
        let table = schema_a.table_by_name("native_objects").unwrap();

        let mut filter =
            MatchTable::build(Arc::clone(table), 0, "Foo", false, RowRange::All).unwrap();
        filter.ensure_computed().unwrap();

        assert_eq!(filter.row_count(), Some(1));
        match filter.value_at(0, 2).unwrap() {
            CellValue::Int(size) => assert_eq!(size, 100),
            other => panic!("unexpected cell {:?}", other),
        }
    }

    #[test]
    fn numeric_filter_over_section_table() {
        let dir = tempdir().unwrap();
        let (schema_a, _) = load_fixture(dir.path());
        let table = schema_a.table_by_name("native_objects").unwrap();

        let mut filter =
            MatchTable::build(Arc::clone(table), 2, ">= 100", false, RowRange::All).unwrap();
        filter.ensure_computed().unwrap();

        assert_eq!(filter.indices().unwrap(), &[0]);
    }
}

mod composition_tests {
    use super::*;

    #[test]
    fn filter_composes_over_a_diff() {
        let dir = tempdir().unwrap();
        let (schema_a, schema_b) = load_fixture(dir.path());
        let a = schema_a.table_by_name("native_objects").unwrap();
        let b = schema_b.table_by_name("native_objects").unwrap();

        let mut diff =
            DiffTable::new("d", Arc::clone(a), Arc::clone(b), DiffFilter::ALL).unwrap();
        diff.update().unwrap();
        let diff: Arc<dyn Table> = Arc::new(diff);

        // Column 0 of a diff is the classification; select the Same rows.
        let mut same_rows =
            MatchTable::build(Arc::clone(&diff), 0, "same", true, RowRange::All).unwrap();
        same_rows.ensure_computed().unwrap();

        assert_eq!(same_rows.row_count(), Some(1));
        match same_rows.value_at(0, 1).unwrap() {
            CellValue::Str(name) => assert_eq!(name, "Foo"),
            other => panic!("unexpected cell {:?}", other),
        }
    }

    #[test]
    fn sorting_a_diff_by_forwarded_columns() {
        let dir = tempdir().unwrap();
        let (schema_a, schema_b) = load_fixture(dir.path());
        let a = schema_a.table_by_name("native_objects").unwrap();
        let b = schema_b.table_by_name("native_objects").unwrap();

        let mut diff =
            DiffTable::new("d", Arc::clone(a), Arc::clone(b), DiffFilter::ALL).unwrap();
        diff.update().unwrap();

        // Sort the classified rows by key (column 2 of the diff view).
        let order = sorted_rows_ascending(&diff, &[2]).unwrap();
        let keys: Vec<i64> = order
            .iter()
            .map(|&row| match diff.value_at(row, 2).unwrap() {
                CellValue::Int(key) => key,
                other => panic!("unexpected cell {:?}", other),
            })
            .collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }
}
