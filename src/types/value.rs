//! # Runtime Cell Values
//!
//! This module provides `CellValue<'a>`, the runtime representation for
//! table cells. Values use `Cow` for strings to enable zero-copy reads
//! from the mmap'd capture while supporting owned data when a table
//! materializes rows itself.
//!
//! ## Value Variants
//!
//! | Variant | Rust Type | Description |
//! |---------|-----------|-------------|
//! | Null | - | Absent/missing cell |
//! | Int | i64 | 64-bit signed integer |
//! | Float | f64 | 64-bit floating point |
//! | Str | Cow<str> | UTF-8 string |
//! | Enum | u32 | Enum ordinal; names live in column metadata |
//!
//! ## Comparison Semantics
//!
//! [`compare_cells`] is a total order:
//!
//! - Null sorts before every non-null value
//! - Int vs Float promotes the Int for comparison
//! - Mismatched non-numeric types order by a fixed type rank so a sort
//!   over inconsistent data stays deterministic instead of panicking
//!
//! The null-first convention is load-bearing: the diff merge-join assumes
//! one consistent ordering across every column used as a key.

use std::borrow::Cow;
use std::cmp::Ordering;

/// Runtime value of a single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue<'a> {
    Null,
    Int(i64),
    Float(f64),
    Str(Cow<'a, str>),
    Enum(u32),
}

impl<'a> CellValue<'a> {
    /// Returns true if this cell is absent.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the cell, if it has one. Enum ordinals count as
    /// numbers so the numeric matcher can run on enum columns.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::Enum(e) => Some(*e as f64),
            CellValue::Null | CellValue::Str(_) => None,
        }
    }

    /// String view of the cell, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a borrowed cell into one owning its data.
    pub fn into_owned(self) -> CellValue<'static> {
        match self {
            CellValue::Null => CellValue::Null,
            CellValue::Int(i) => CellValue::Int(i),
            CellValue::Float(f) => CellValue::Float(f),
            CellValue::Str(s) => CellValue::Str(Cow::Owned(s.into_owned())),
            CellValue::Enum(e) => CellValue::Enum(e),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Int(_) | CellValue::Float(_) => 1,
            CellValue::Str(_) => 2,
            CellValue::Enum(_) => 3,
        }
    }
}

impl std::fmt::Display for CellValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Str(s) => write!(f, "{}", s),
            CellValue::Enum(e) => write!(f, "{}", e),
        }
    }
}

/// Total-order comparison over cells with the null-first convention.
pub fn compare_cells(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Null, CellValue::Null) => Ordering::Equal,
        (CellValue::Null, _) => Ordering::Less,
        (_, CellValue::Null) => Ordering::Greater,
        (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
        (CellValue::Float(a), CellValue::Float(b)) => {
            a.partial_cmp(b).unwrap_or(Ordering::Equal)
        }
        (CellValue::Int(a), CellValue::Float(b)) => {
            (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
        }
        (CellValue::Float(a), CellValue::Int(b)) => {
            a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
        }
        (CellValue::Str(a), CellValue::Str(b)) => a.cmp(b),
        (CellValue::Enum(a), CellValue::Enum(b)) => a.cmp(b),
        (a, b) => a.type_rank().cmp(&b.type_rank()),
    }
}
