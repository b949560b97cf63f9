//! # Type System
//!
//! Scalar cell types, runtime cell values, and ordering strategies shared
//! by every table implementation.
//!
//! - [`value`]: `CellValue<'a>`, the Cow-based runtime cell representation
//! - [`order`]: `Comparer`, the ascending/descending ordering strategies
//!
//! A column pairs a [`DataType`] with a [`CompareMethod`]. The data type
//! says how cell bytes decode; the compare method says how matching and
//! sorting treat the decoded value. The two usually follow each other
//! (strings compare as strings, numbers as numbers, enums as their
//! underlying ordinal) but are declared separately so a column can opt
//! into a different matching strategy than its storage type implies.

pub mod order;
pub mod value;

pub use order::{Comparer, OrderingKind, SortOrder};
pub use value::{compare_cells, CellValue};

/// Semantic scalar type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    Str,
    /// Enumeration stored as a u32 ordinal with a declared name table.
    Enum,
}

impl DataType {
    /// The comparison method matching/sorting uses for this type unless a
    /// column overrides it.
    pub fn default_compare_method(self) -> CompareMethod {
        match self {
            DataType::Int | DataType::Float => CompareMethod::Number,
            DataType::Str => CompareMethod::Str,
            DataType::Enum => CompareMethod::EnumAsNumber,
        }
    }
}

/// Strategy tag a column declares for matching and sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMethod {
    /// Compare as strings; match by contains/equals.
    Str,
    /// Compare numerically; match by parsed comparison or range.
    Number,
    /// Resolve enum names to ordinals, then compare numerically.
    EnumAsNumber,
}

/// How a cell renders in `display_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayStyle {
    /// Render the value as-is.
    #[default]
    Plain,
    /// Render an integer as a human-readable byte size ("1.5 KB").
    Bytes,
}
