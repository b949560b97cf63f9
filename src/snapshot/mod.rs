//! # Snapshot Module
//!
//! `Snapshot` is the top of the load path: it owns the opened capture
//! file and turns table specs into queryable tables and schemas. This is
//! the boundary where format errors surface — a capture that fails
//! validation never produces a `Snapshot`, so no partial table state can
//! escape a bad file.
//!
//! ## Data Flow
//!
//! ```text
//! capture bytes -> Chapter index -> typed section readers
//!               -> SectionTable / Schema -> filters, diffs -> consumers
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let snapshot = Snapshot::open("before.snap")?;
//! let schema = snapshot.load_schema("before", &specs)?;
//! let objects = schema.table_by_name("native_objects").unwrap();
//! ```

pub mod section;

pub use section::{SectionColumnSpec, SectionTable, TableSpec};

use eyre::{Result, WrapErr};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::schema::{Schema, Table};
use crate::storage::CaptureFile;

/// An opened capture, ready to serve tables.
#[derive(Debug)]
pub struct Snapshot {
    capture: Arc<CaptureFile>,
}

impl Snapshot {
    /// Opens and validates a capture file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let capture = CaptureFile::open(path)?;
        debug!(
            chapters = capture.chapter_count(),
            blocks = capture.block_count(),
            "opened capture '{}'",
            path.display()
        );
        Ok(Self {
            capture: Arc::new(capture),
        })
    }

    pub fn capture(&self) -> &Arc<CaptureFile> {
        &self.capture
    }

    /// Binds one table spec against this capture. The returned table has
    /// not computed its row count yet.
    pub fn open_table(&self, spec: &TableSpec) -> Result<SectionTable> {
        SectionTable::bind(Arc::clone(&self.capture), spec)
    }

    /// Binds, computes, and collects a set of table specs into a schema.
    pub fn load_schema(&self, name: impl Into<String>, specs: &[TableSpec]) -> Result<Schema> {
        let mut schema = Schema::new(name);
        for spec in specs {
            let mut table = self
                .open_table(spec)
                .wrap_err_with(|| format!("failed to bind table '{}'", spec.name))?;
            table.ensure_computed()?;
            schema.add_table(Arc::new(table))?;
        }
        Ok(schema)
    }
}
