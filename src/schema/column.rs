//! # Column Metadata
//!
//! `ColumnMeta` pairs a column name with its scalar type, the comparison
//! method matching/sorting dispatches on, a display style, an optional
//! enum name table, and an optional cross-reference link target.
//!
//! The metadata is deliberately separate from any storage concern: the
//! same `ColumnMeta` describes a file-backed section column, an in-memory
//! column, and the forwarded columns of a filtered or diffed view.

use std::sync::Arc;

use crate::types::{CellValue, CompareMethod, DataType, DisplayStyle};

/// Definition of one table column.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    name: String,
    data_type: DataType,
    compare_method: CompareMethod,
    display: DisplayStyle,
    enum_names: Option<Arc<[String]>>,
    link_to: Option<String>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            compare_method: data_type.default_compare_method(),
            display: DisplayStyle::Plain,
            enum_names: None,
            link_to: None,
        }
    }

    /// Creates an enum column with its ordinal-to-name table.
    pub fn enumeration(name: impl Into<String>, names: impl Into<Arc<[String]>>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Enum,
            compare_method: CompareMethod::EnumAsNumber,
            display: DisplayStyle::Plain,
            enum_names: Some(names.into()),
            link_to: None,
        }
    }

    /// Overrides the comparison method matching/sorting uses.
    pub fn with_compare_method(mut self, method: CompareMethod) -> Self {
        self.compare_method = method;
        self
    }

    pub fn with_display(mut self, display: DisplayStyle) -> Self {
        self.display = display;
        self
    }

    /// Declares that cells of this column are row indexes into `table`.
    pub fn with_link_to(mut self, table: impl Into<String>) -> Self {
        self.link_to = Some(table.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn compare_method(&self) -> CompareMethod {
        self.compare_method
    }

    pub fn display(&self) -> DisplayStyle {
        self.display
    }

    pub fn link_to(&self) -> Option<&str> {
        self.link_to.as_deref()
    }

    pub fn enum_names(&self) -> Option<&[String]> {
        self.enum_names.as_deref()
    }

    /// Name of an enum ordinal, if this column declares one.
    pub fn enum_name(&self, ordinal: u32) -> Option<&str> {
        self.enum_names
            .as_deref()
            .and_then(|names| names.get(ordinal as usize))
            .map(String::as_str)
    }

    /// Resolves a human-readable enum name to its ordinal.
    pub fn resolve_enum_name(&self, name: &str) -> Option<u32> {
        self.enum_names
            .as_deref()
            .and_then(|names| names.iter().position(|n| n == name))
            .map(|i| i as u32)
    }

    /// Renders a cell under this column's display style.
    pub fn display_cell(&self, value: &CellValue) -> String {
        match (self.display, value) {
            (DisplayStyle::Bytes, CellValue::Int(n)) => format_bytes(*n),
            (_, CellValue::Enum(ordinal)) => self
                .enum_name(*ordinal)
                .map(str::to_string)
                .unwrap_or_else(|| ordinal.to_string()),
            (_, other) => other.to_string(),
        }
    }
}

/// Formats a byte count the way memory tooling displays sizes.
fn format_bytes(n: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if n < 0 {
        return format!("-{}", format_bytes(-n));
    }
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
