//! # SnapView - Memory Capture Query Engine
//!
//! SnapView loads captured memory snapshots and exposes them as typed,
//! sortable, filterable tables, including a computed row-by-row diff
//! between two snapshots. It is the query core under an analysis UI: the
//! windowing/rendering layer, breakdown model builders, and capture
//! triggering are external collaborators that only consume this crate's
//! tables.
//!
//! ## Quick Start
//!
//! ```ignore
//! use snapview::{DiffSchema, Snapshot};
//!
//! let before = Snapshot::open("before.snap")?;
//! let after = Snapshot::open("after.snap")?;
//!
//! let schema_a = before.load_schema("A", &specs)?;
//! let schema_b = after.load_schema("B", &specs)?;
//!
//! let diff = DiffSchema::build(&schema_a, &schema_b, false, true)?;
//! let objects = diff.table_by_name("native_objects").unwrap();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Snapshot / Schema API         │
//! ├─────────────────────────────────────┤
//! │  Query Layer (sort, match, diff)     │
//! ├─────────────────────────────────────┤
//! │  Table / Column Abstraction          │
//! ├─────────────────────────────────────┤
//! │  Section Readers (typed chapters)    │
//! ├─────────────────────────────────────┤
//! │  Storage (header, chapter index,     │
//! │           read-only mmap)            │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Capture Layout
//!
//! A capture file starts with a small header and two directories, then
//! raw byte blocks:
//!
//! ```text
//! capture.snap
//! ├── header (128 bytes: magic, version, directory geometry)
//! ├── block directory (offset/length per block)
//! ├── chapter directory (name + segment index per section)
//! └── blocks (raw bytes; chapters resolve entries inside them)
//! ```
//!
//! ## Concurrency Model
//!
//! The engine is single-threaded and synchronous by design. Computation
//! (`ensure_computed`, `DiffTable::update`) takes `&mut self` and is
//! memoized; shared read access happens afterwards through
//! `Arc<dyn Table>`. The capture mmap is immutable, so concurrent readers
//! need no coordination. Source renumbering propagates through the
//! explicit `RowIndexRemap` pull protocol, never through events.
//!
//! ## Module Overview
//!
//! - [`storage`]: capture header, chapter segment index, mmap reader,
//!   capture writer
//! - [`types`]: cell values, scalar types, ordering strategies
//! - [`schema`]: the `Table` contract, columns, schemas, remapping,
//!   in-memory tables
//! - [`snapshot`]: opened captures and file-backed section tables
//! - [`query`]: sorting, match filters, the diff engine, schema diffs

#[macro_use]
mod macros;

pub mod config;
pub mod query;
pub mod schema;
pub mod snapshot;
pub mod storage;
pub mod types;

pub use query::{DiffEntry, DiffFilter, DiffResult, DiffSchema, DiffTable, MatchTable, RowRange};
pub use schema::{CellLink, ColumnMeta, ColumnRef, MemoryTable, RowIndexRemap, Schema, Table};
pub use snapshot::{SectionTable, Snapshot, TableSpec};
pub use storage::{CaptureFile, CaptureWriter, Chapter};
pub use types::{CellValue, Comparer, DataType, SortOrder};
