//! # Row Index Remapping
//!
//! When a source table's row numbering changes (rows removed or reordered
//! upstream), every derived view holds row indexes that are suddenly
//! stale. `RowIndexRemap` is the value handed from the renumbered table
//! to its dependents: a pure old-to-new mapping where `None` means the
//! row no longer exists.
//!
//! The remap is immutable. Views never patch their index arrays in place;
//! they build new ones through [`RowIndexRemap::remap_indices`] and, when
//! they renumber themselves as a consequence, hand their own remap to the
//! next view down. That keeps the two-phase renumbering protocol
//! deterministic and free of aliasing between views sharing a source.

/// Mapping from old row indexes to new ones after a renumbering.
#[derive(Debug, Clone)]
pub struct RowIndexRemap {
    map: Vec<Option<usize>>,
    new_row_count: usize,
}

impl RowIndexRemap {
    /// Builds a remap from an explicit old-to-new table.
    pub fn new(map: Vec<Option<usize>>, new_row_count: usize) -> Self {
        debug_assert!(
            map.iter()
                .flatten()
                .all(|&new_row| new_row < new_row_count),
            "remap target out of range"
        );
        Self { map, new_row_count }
    }

    /// The identity remap over `count` rows.
    pub fn identity(count: usize) -> Self {
        Self {
            map: (0..count).map(Some).collect(),
            new_row_count: count,
        }
    }

    /// Remap for removing `removed` rows (unordered, deduplicated by the
    /// caller) from a table of `old_count` rows; surviving rows keep
    /// their relative order and close the gaps.
    pub fn from_removed_rows(old_count: usize, removed: &[usize]) -> Self {
        let mut gone = vec![false; old_count];
        for &row in removed {
            assert!(row < old_count, "removed row {} out of range", row);
            gone[row] = true;
        }

        let mut map = Vec::with_capacity(old_count);
        let mut next = 0usize;
        for dead in gone {
            if dead {
                map.push(None);
            } else {
                map.push(Some(next));
                next += 1;
            }
        }
        Self {
            map,
            new_row_count: next,
        }
    }

    pub fn old_row_count(&self) -> usize {
        self.map.len()
    }

    pub fn new_row_count(&self) -> usize {
        self.new_row_count
    }

    /// New index of `old_row`, or `None` if the row was removed.
    pub fn remap(&self, old_row: usize) -> Option<usize> {
        self.map.get(old_row).copied().flatten()
    }

    /// Maps a sequence of row indexes, dropping the ones that no longer
    /// exist and preserving order.
    pub fn remap_indices(&self, indices: &[usize]) -> Vec<usize> {
        indices.iter().filter_map(|&i| self.remap(i)).collect()
    }
}
