//! # Section Tables
//!
//! A `SectionTable` exposes named chapters of a capture as a typed table:
//! one chapter per column, entry `i` of each chapter holding row `i` of
//! that column. Cells decode on demand, zero-copy for strings, straight
//! out of the mmap.
//!
//! ## Column Readers
//!
//! The semantic column type resolves to a concrete reader exactly once,
//! at table-build time, in [`SectionColumn::build`] — an explicit
//! type-tag-to-constructor factory. Fixed-width types validate their
//! entry size against the chapter geometry up front where the encoding
//! makes sizes static, and per entry otherwise.
//!
//! | DataType | Entry encoding |
//! |----------|----------------|
//! | Int | 8 bytes, i64 LE |
//! | Float | 8 bytes, f64 LE |
//! | Str | UTF-8 bytes, any length |
//! | Enum | 4 bytes, u32 LE ordinal |

use eyre::{bail, ensure, Result};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::sync::Arc;

use crate::schema::{CellLink, ColumnMeta, Table};
use crate::storage::{CaptureFile, Chapter};
use crate::types::{CellValue, DataType};

/// Declares one column of a section table: metadata plus the chapter
/// backing it.
#[derive(Debug, Clone)]
pub struct SectionColumnSpec {
    pub meta: ColumnMeta,
    pub chapter: String,
}

impl SectionColumnSpec {
    pub fn new(meta: ColumnMeta, chapter: impl Into<String>) -> Self {
        Self {
            meta,
            chapter: chapter.into(),
        }
    }
}

/// Declares a whole section table.
#[derive(Debug, Clone, Default)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<SectionColumnSpec>,
    pub primary_key: Vec<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn column(mut self, meta: ColumnMeta, chapter: impl Into<String>) -> Self {
        self.columns.push(SectionColumnSpec::new(meta, chapter));
        self
    }

    pub fn primary_key(mut self, names: &[&str]) -> Self {
        self.primary_key = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

/// A typed reader for one column's chapter, resolved at build time.
#[derive(Debug)]
enum SectionColumn {
    Int64(Chapter),
    Float64(Chapter),
    Utf8(Chapter),
    Enum32(Chapter),
}

impl SectionColumn {
    /// The type-tag registry: maps a semantic scalar type to its reader
    /// constructor. Fixed-width types reject chapters whose static
    /// geometry cannot hold them.
    fn build(column: &str, data_type: DataType, chapter: Chapter) -> Result<Self> {
        let fixed_width = match data_type {
            DataType::Int | DataType::Float => Some(8u64),
            DataType::Enum => Some(4u64),
            DataType::Str => None,
        };
        if let Some(width) = fixed_width {
            match &chapter {
                Chapter::SingleValue { entry_size, .. }
                | Chapter::ConstantSizeArray { entry_size, .. } => {
                    ensure!(
                        *entry_size == width,
                        "column '{}' expects {}-byte entries but chapter stores {}",
                        column,
                        width,
                        entry_size
                    );
                }
                // Dynamic chapters validate per entry at read time.
                Chapter::DynamicSizeArray { .. } => {}
            }
        }
        Ok(match data_type {
            DataType::Int => SectionColumn::Int64(chapter),
            DataType::Float => SectionColumn::Float64(chapter),
            DataType::Str => SectionColumn::Utf8(chapter),
            DataType::Enum => SectionColumn::Enum32(chapter),
        })
    }

    fn chapter(&self) -> &Chapter {
        match self {
            SectionColumn::Int64(c)
            | SectionColumn::Float64(c)
            | SectionColumn::Utf8(c)
            | SectionColumn::Enum32(c) => c,
        }
    }

    fn read<'a>(&self, capture: &'a CaptureFile, row: usize) -> Result<CellValue<'a>> {
        let bytes = capture.entry_bytes(self.chapter(), row);
        match self {
            SectionColumn::Int64(_) => {
                let Ok(raw) = <[u8; 8]>::try_from(bytes) else {
                    bail!("int entry {} has {} bytes, expected 8", row, bytes.len());
                };
                Ok(CellValue::Int(i64::from_le_bytes(raw)))
            }
            SectionColumn::Float64(_) => {
                let Ok(raw) = <[u8; 8]>::try_from(bytes) else {
                    bail!("float entry {} has {} bytes, expected 8", row, bytes.len());
                };
                Ok(CellValue::Float(f64::from_le_bytes(raw)))
            }
            SectionColumn::Utf8(_) => {
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| eyre::eyre!("invalid UTF-8 in string entry {}: {}", row, e))?;
                Ok(CellValue::Str(Cow::Borrowed(s)))
            }
            SectionColumn::Enum32(_) => {
                let Ok(raw) = <[u8; 4]>::try_from(bytes) else {
                    bail!("enum entry {} has {} bytes, expected 4", row, bytes.len());
                };
                Ok(CellValue::Enum(u32::from_le_bytes(raw)))
            }
        }
    }
}

/// A table backed by capture sections.
#[derive(Debug)]
pub struct SectionTable {
    name: String,
    columns: Vec<ColumnMeta>,
    readers: Vec<SectionColumn>,
    capture: Arc<CaptureFile>,
    primary_key: SmallVec<[usize; 2]>,
    row_count: Option<usize>,
}

impl SectionTable {
    /// Binds a table spec to a capture. Fails if a chapter is missing or
    /// its geometry cannot hold the declared type.
    pub fn bind(capture: Arc<CaptureFile>, spec: &TableSpec) -> Result<Self> {
        ensure!(
            !spec.columns.is_empty(),
            "table '{}' declares no columns",
            spec.name
        );

        let mut columns = Vec::with_capacity(spec.columns.len());
        let mut readers = Vec::with_capacity(spec.columns.len());
        for col in &spec.columns {
            let chapter = capture.chapter(&col.chapter).ok_or_else(|| {
                eyre::eyre!(
                    "table '{}' column '{}' references missing chapter '{}'",
                    spec.name,
                    col.meta.name(),
                    col.chapter
                )
            })?;
            readers.push(SectionColumn::build(
                col.meta.name(),
                col.meta.data_type(),
                chapter.clone(),
            )?);
            columns.push(col.meta.clone());
        }

        let mut primary_key = SmallVec::new();
        for name in &spec.primary_key {
            let index = columns
                .iter()
                .position(|c| c.name() == name)
                .ok_or_else(|| {
                    eyre::eyre!("unknown key column '{}' in table '{}'", name, spec.name)
                })?;
            primary_key.push(index);
        }

        Ok(Self {
            name: spec.name.clone(),
            columns,
            readers,
            capture,
            primary_key,
            row_count: None,
        })
    }
}

impl Table for SectionTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn row_count(&self) -> Option<usize> {
        self.row_count
    }

    fn ensure_computed(&mut self) -> Result<bool> {
        if self.row_count.is_some() {
            return Ok(false);
        }
        let count = self.readers[0].chapter().entry_count();
        for (meta, reader) in self.columns.iter().zip(&self.readers) {
            ensure!(
                reader.chapter().entry_count() == count,
                "column '{}' of table '{}' has {} entries, expected {}",
                meta.name(),
                self.name,
                reader.chapter().entry_count(),
                count
            );
        }
        self.row_count = Some(count);
        Ok(true)
    }

    fn value_at(&self, row: usize, col: usize) -> Result<CellValue<'_>> {
        let count = self
            .row_count
            .expect("value_at on uncomputed section table");
        assert!(row < count, "row {} out of range", row);
        self.readers[col].read(&self.capture, row)
    }

    fn link_at(&self, row: usize, col: usize) -> Option<CellLink> {
        let target = self.columns[col].link_to()?;
        match self.value_at(row, col) {
            Ok(CellValue::Int(n)) if n >= 0 => Some(CellLink {
                table: target.to_string(),
                row: n as usize,
                source_slot: None,
            }),
            _ => None,
        }
    }

    fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }
}
