//! # Query Module
//!
//! The derived-view layer over tables: sorted permutations, match
//! filters, and the two-table diff engine with its whole-schema
//! aggregation.
//!
//! ## Overview
//!
//! ```text
//! Table ── sort::sorted_rows ──────────> row-index permutation
//!   │
//!   ├─── MatchTable (per-column predicate, row range) ──> filtered view
//!   │
//!   └─┬─ DiffTable (sort-merge join on key columns) ───> classified view
//!     └─ DiffSchema (one DiffTable per same-named pair)
//! ```
//!
//! Every derived view is itself a `Table`, so filters and diffs compose
//! with the same read surface their sources expose.

pub mod diff;
pub mod diff_schema;
pub mod match_filter;
pub mod sort;

pub use diff::{DiffEntry, DiffFilter, DiffResult, DiffTable, PRESENT_IN_FIRST, PRESENT_IN_SECOND};
pub use diff_schema::DiffSchema;
pub use match_filter::{MatchTable, RowRange};
pub use sort::{sorted_rows, sorted_rows_ascending, sorted_rows_subset, SortKey};
