//! # Match Filters
//!
//! A `MatchTable` is a row-index subset of a source table, selected by a
//! per-column match predicate over a row range. The predicate strategy
//! dispatches on the column's comparison method:
//!
//! - **string**: substring containment, or equality when `exact` is set
//! - **number**: the pattern parses to a comparison (`>= 10`, `!= 3`) or
//!   an inclusive range (`3..7`); a bare number means equality
//! - **enum-as-number**: the pattern resolves through the column's enum
//!   name table to an ordinal, then matches numerically; an unresolvable
//!   name falls back to matching the zero ("none") ordinal
//!
//! Unparsable numeric patterns match nothing. Filters are interactively
//! edited, so a bad pattern must never fail the build — both fallbacks
//! degrade to a defined result instead of an error.
//!
//! ## Consistency Under Source Renumbering
//!
//! When the source table renumbers its rows, the filter's stored indexes
//! and scan range are stale. [`MatchTable::apply_source_remap`] runs the
//! five-step protocol: remap stored indexes (dropping removed rows),
//! rebuild the range (a whole-table range regenerates at the new count;
//! a span remaps its endpoints, scanning inward past removed rows, and
//! falls back to the whole table if nothing survives), re-run the match,
//! and hand back the filter's own old-position to new-position remap so
//! further-derived views can repeat the protocol.

use eyre::{ensure, Result};
use hashbrown::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::schema::{CellLink, ColumnMeta, RowIndexRemap, Table};
use crate::types::{CellValue, CompareMethod};

/// The rows a filter scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRange {
    /// The whole source table, whatever its current row count.
    All,
    /// A contiguous span, both endpoints inclusive.
    Span { first: usize, last: usize },
    /// An explicit ascending index set.
    Set(Vec<usize>),
}

impl RowRange {
    fn rows(&self, count: usize) -> Vec<usize> {
        match self {
            RowRange::All => (0..count).collect(),
            RowRange::Span { first, last } => (*first..=*last).collect(),
            RowRange::Set(indices) => indices.clone(),
        }
    }

    fn validate(&self, count: usize) -> Result<()> {
        match self {
            RowRange::All => Ok(()),
            RowRange::Span { first, last } => {
                ensure!(
                    first <= last && *last < count,
                    "span [{}, {}] out of range for {} rows",
                    first,
                    last,
                    count
                );
                Ok(())
            }
            RowRange::Set(indices) => {
                ensure!(
                    indices.iter().all(|&i| i < count),
                    "index set references rows past {} rows",
                    count
                );
                Ok(())
            }
        }
    }

    /// Rebuilds the range after a source renumbering. A span remaps its
    /// endpoints, scanning inward from each until a surviving row is
    /// found; if the whole span is gone it falls back to the whole table.
    fn remapped(&self, remap: &RowIndexRemap) -> RowRange {
        match self {
            RowRange::All => RowRange::All,
            RowRange::Span { first, last } => {
                let new_first = (*first..=*last).find_map(|r| remap.remap(r));
                let new_last = (*first..=*last).rev().find_map(|r| remap.remap(r));
                match (new_first, new_last) {
                    (Some(first), Some(last)) => RowRange::Span { first, last },
                    _ => RowRange::All,
                }
            }
            RowRange::Set(indices) => RowRange::Set(remap.remap_indices(indices)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum NumericPredicate {
    Eq(f64),
    Ne(f64),
    Lt(f64),
    Le(f64),
    Gt(f64),
    Ge(f64),
    Range(f64, f64),
}

impl NumericPredicate {
    fn parse(pattern: &str) -> Option<Self> {
        let p = pattern.trim();
        if let Some((lo, hi)) = p.split_once("..") {
            let lo: f64 = lo.trim().parse().ok()?;
            let hi: f64 = hi.trim().parse().ok()?;
            return Some(NumericPredicate::Range(lo, hi));
        }
        let (ctor, rest): (fn(f64) -> Self, &str) = if let Some(rest) = p.strip_prefix(">=") {
            (NumericPredicate::Ge, rest)
        } else if let Some(rest) = p.strip_prefix("<=") {
            (NumericPredicate::Le, rest)
        } else if let Some(rest) = p.strip_prefix("!=") {
            (NumericPredicate::Ne, rest)
        } else if let Some(rest) = p.strip_prefix('>') {
            (NumericPredicate::Gt, rest)
        } else if let Some(rest) = p.strip_prefix('<') {
            (NumericPredicate::Lt, rest)
        } else if let Some(rest) = p.strip_prefix('=') {
            (NumericPredicate::Eq, rest)
        } else {
            (NumericPredicate::Eq, p)
        };
        rest.trim().parse().ok().map(ctor)
    }

    fn matches(&self, value: f64) -> bool {
        match *self {
            NumericPredicate::Eq(v) => value == v,
            NumericPredicate::Ne(v) => value != v,
            NumericPredicate::Lt(v) => value < v,
            NumericPredicate::Le(v) => value <= v,
            NumericPredicate::Gt(v) => value > v,
            NumericPredicate::Ge(v) => value >= v,
            NumericPredicate::Range(lo, hi) => value >= lo && value <= hi,
        }
    }
}

/// A compiled per-column match predicate.
#[derive(Debug, Clone)]
enum Matcher {
    Str { needle: String, exact: bool },
    Number(NumericPredicate),
    Nothing,
}

impl Matcher {
    /// Compiles a pattern against a column's comparison method. Never
    /// fails: undecodable patterns degrade to their defined fallback.
    fn build(meta: &ColumnMeta, pattern: &str, exact: bool) -> Self {
        match meta.compare_method() {
            CompareMethod::Str => Matcher::Str {
                needle: pattern.to_string(),
                exact,
            },
            CompareMethod::Number => match NumericPredicate::parse(pattern) {
                Some(predicate) => Matcher::Number(predicate),
                None => {
                    debug!(column = meta.name(), pattern, "unparsable numeric pattern matches nothing");
                    Matcher::Nothing
                }
            },
            CompareMethod::EnumAsNumber => {
                let ordinal = meta.resolve_enum_name(pattern).unwrap_or_else(|| {
                    debug!(
                        column = meta.name(),
                        pattern, "unresolvable enum name falls back to ordinal 0"
                    );
                    0
                });
                Matcher::Number(NumericPredicate::Eq(ordinal as f64))
            }
        }
    }

    fn matches(&self, value: &CellValue) -> bool {
        match self {
            Matcher::Str { needle, exact } => match value.as_str() {
                Some(s) if *exact => s == needle,
                Some(s) => s.contains(needle.as_str()),
                None => false,
            },
            Matcher::Number(predicate) => match value.as_f64() {
                Some(v) => predicate.matches(v),
                None => false,
            },
            Matcher::Nothing => false,
        }
    }
}

fn run_match(
    source: &dyn Table,
    column: usize,
    matcher: &Matcher,
    range: &RowRange,
) -> Result<Vec<usize>> {
    let count = source
        .row_count()
        .ok_or_else(|| eyre::eyre!("cannot filter '{}': row count not computed", source.name()))?;

    let mut indices = Vec::new();
    for row in range.rows(count) {
        if matcher.matches(&source.value_at(row, column)?) {
            indices.push(row);
        }
    }
    Ok(indices)
}

/// A filtered view over one source table.
pub struct MatchTable {
    name: String,
    source: Arc<dyn Table>,
    column: usize,
    matcher: Matcher,
    range: RowRange,
    indices: Option<Vec<usize>>,
}

impl MatchTable {
    /// Builds a filter over `source`. The source must have computed its
    /// row count; the filter itself computes on `ensure_computed`.
    pub fn build(
        source: Arc<dyn Table>,
        column: usize,
        pattern: &str,
        exact: bool,
        range: RowRange,
    ) -> Result<Self> {
        let count = source.row_count().ok_or_else(|| {
            eyre::eyre!("cannot filter '{}': row count not computed", source.name())
        })?;
        ensure!(
            column < source.column_count(),
            "column index {} out of range for table '{}'",
            column,
            source.name()
        );
        range.validate(count)?;

        let matcher = Matcher::build(&source.columns()[column], pattern, exact);
        Ok(Self {
            name: format!("{}#match", source.name()),
            source,
            column,
            matcher,
            range,
            indices: None,
        })
    }

    /// The source row a filtered row forwards to.
    pub fn source_row(&self, row: usize) -> usize {
        self.indices.as_ref().expect("filter not computed")[row]
    }

    /// The filtered row indexes, in source order.
    pub fn indices(&self) -> Option<&[usize]> {
        self.indices.as_deref()
    }

    /// Runs the five-step renumbering protocol against a renumbered
    /// source, returning this filter's own old-to-new position remap.
    pub fn apply_source_remap(
        &mut self,
        new_source: Arc<dyn Table>,
        remap: &RowIndexRemap,
    ) -> Result<RowIndexRemap> {
        ensure!(
            new_source.row_count() == Some(remap.new_row_count()),
            "renumbered source '{}' disagrees with remap row count",
            new_source.name()
        );

        // Step 2: carry the old filtered rows through the remap.
        let old_indices = self.indices.take().unwrap_or_default();
        let survivors: Vec<Option<usize>> =
            old_indices.iter().map(|&row| remap.remap(row)).collect();

        // Step 3: rebuild the scan range in the new numbering.
        self.range = self.range.remapped(remap);

        // Step 4: re-run the match against the new numbering.
        self.source = new_source;
        let new_indices = run_match(&*self.source, self.column, &self.matcher, &self.range)?;

        // Step 5: describe our own renumbering for further-derived views.
        let position_of: HashMap<usize, usize> = new_indices
            .iter()
            .enumerate()
            .map(|(pos, &row)| (row, pos))
            .collect();
        let map = survivors
            .into_iter()
            .map(|survivor| survivor.and_then(|row| position_of.get(&row).copied()))
            .collect();

        let own_remap = RowIndexRemap::new(map, new_indices.len());
        self.indices = Some(new_indices);
        Ok(own_remap)
    }
}

impl Table for MatchTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[ColumnMeta] {
        self.source.columns()
    }

    fn row_count(&self) -> Option<usize> {
        self.indices.as_ref().map(Vec::len)
    }

    fn ensure_computed(&mut self) -> Result<bool> {
        if self.indices.is_some() {
            return Ok(false);
        }
        let indices = run_match(&*self.source, self.column, &self.matcher, &self.range)?;
        self.indices = Some(indices);
        Ok(true)
    }

    fn value_at(&self, row: usize, col: usize) -> Result<CellValue<'_>> {
        self.source.value_at(self.source_row(row), col)
    }

    fn link_at(&self, row: usize, col: usize) -> Option<CellLink> {
        self.source.link_at(self.source_row(row), col)
    }

    fn primary_key(&self) -> &[usize] {
        self.source.primary_key()
    }
}
