//! # Ordering Strategies
//!
//! `Comparer` packages the ascending/descending ordering used everywhere
//! rows are sorted: column sort views, the diff key sort, and the merge
//! join all go through it so the null convention cannot drift between
//! call sites.
//!
//! ## Null Convention
//!
//! Null sorts before every non-null value in ascending order, and
//! therefore after every non-null value in descending order. Descending
//! is implemented as the exact reversal of ascending, which keeps the
//! `ascending(a, b) == descending(a, b).reverse()` identity by
//! construction.
//!
//! ## Value vs Reference Ordering
//!
//! The ordering strategy is picked once per column at setup time from its
//! comparison method: numeric and enum columns use value ordering (compare
//! through the numeric view), string columns use reference ordering
//! (compare string content, where a null cell is the analogue of an absent
//! reference). Both honor the same null convention.

use std::cmp::Ordering;

use super::value::{compare_cells, CellValue};
use super::CompareMethod;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Which comparison strategy a comparer dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingKind {
    /// Plain value comparison: numbers and enum ordinals.
    Value,
    /// Nullable content comparison: strings, where null stands in for an
    /// absent reference.
    Reference,
}

/// Per-column ordering function with a fixed direction.
#[derive(Debug, Clone, Copy)]
pub struct Comparer {
    kind: OrderingKind,
    order: SortOrder,
}

impl Comparer {
    pub fn new(kind: OrderingKind, order: SortOrder) -> Self {
        Self { kind, order }
    }

    /// Selects the strategy for a column's comparison method.
    pub fn for_method(method: CompareMethod, order: SortOrder) -> Self {
        let kind = match method {
            CompareMethod::Str => OrderingKind::Reference,
            CompareMethod::Number | CompareMethod::EnumAsNumber => OrderingKind::Value,
        };
        Self { kind, order }
    }

    pub fn kind(&self) -> OrderingKind {
        self.kind
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Compares two cells under this strategy and direction.
    pub fn compare(&self, a: &CellValue, b: &CellValue) -> Ordering {
        let ascending = match (a, b) {
            // Shared null convention, both strategies.
            (CellValue::Null, CellValue::Null) => Ordering::Equal,
            (CellValue::Null, _) => Ordering::Less,
            (_, CellValue::Null) => Ordering::Greater,
            _ => match self.kind {
                OrderingKind::Value => match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                    _ => compare_cells(a, b),
                },
                OrderingKind::Reference => match (a.as_str(), b.as_str()) {
                    (Some(x), Some(y)) => x.cmp(y),
                    _ => compare_cells(a, b),
                },
            },
        };
        match self.order {
            SortOrder::Ascending => ascending,
            SortOrder::Descending => ascending.reverse(),
        }
    }
}
