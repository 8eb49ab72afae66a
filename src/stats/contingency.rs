//! 2x2 contingency tables of annotated targets in the subset and the background
//!
//! |                  | with annotation | without annotation |
//! |:---------------- | ---------------:| ------------------:|
//! | **subset**       | `a`             | `b`                |
//! | **background only** | `c`          | `d`                |
//!
//! The background-only row contains all targets of the population that are
//! not part of the subset.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::annotations::{AnnotationCount, AnnotationKey};
use crate::{EngineError, EngineResult};

/// A 2x2 table of non-negative counts
///
/// Cells are stored as `u32` so that margins and the grand total can never
/// overflow their `u64` representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContingencyTable {
    a: u32,
    b: u32,
    c: u32,
    d: u32,
}

impl ContingencyTable {
    /// Constructs a new `ContingencyTable` from its four cells
    pub fn new(a: u32, b: u32, c: u32, d: u32) -> Self {
        Self { a, b, c, d }
    }

    /// Top-left cell, the observed value of the test
    pub fn a(&self) -> u32 {
        self.a
    }

    /// Top-right cell
    pub fn b(&self) -> u32 {
        self.b
    }

    /// Bottom-left cell
    pub fn c(&self) -> u32 {
        self.c
    }

    /// Bottom-right cell
    pub fn d(&self) -> u32 {
        self.d
    }

    /// Sum of the first row, `a + b`
    pub fn row1(&self) -> u64 {
        u64::from(self.a) + u64::from(self.b)
    }

    /// Sum of the second row, `c + d`
    pub fn row2(&self) -> u64 {
        u64::from(self.c) + u64::from(self.d)
    }

    /// Sum of the first column, `a + c`
    pub fn col1(&self) -> u64 {
        u64::from(self.a) + u64::from(self.c)
    }

    /// Sum of the second column, `b + d`
    pub fn col2(&self) -> u64 {
        u64::from(self.b) + u64::from(self.d)
    }

    /// Sum of all cells
    pub fn total(&self) -> u64 {
        self.row1() + self.row2()
    }

    /// Returns the table with swapped rows, `(c, d, a, b)`
    #[must_use]
    pub fn swap_rows(&self) -> Self {
        Self::new(self.c, self.d, self.a, self.b)
    }
}

impl TryFrom<[i64; 4]> for ContingencyTable {
    type Error = EngineError;

    /// Builds a table from signed counts `[a, b, c, d]`
    ///
    /// # Errors
    ///
    /// - [`EngineError::NegativeCount`] if any count is negative
    /// - [`EngineError::Validation`] if any count does not fit into `u32`
    fn try_from(cells: [i64; 4]) -> EngineResult<Self> {
        if cells.iter().any(|cell| *cell < 0) {
            return Err(EngineError::NegativeCount);
        }
        let mut unsigned = [0u32; 4];
        for (target, cell) in unsigned.iter_mut().zip(cells) {
            *target = u32::try_from(cell).map_err(|_| {
                EngineError::Validation(format!("contingency table count {cell} is too large"))
            })?;
        }
        let [a, b, c, d] = unsigned;
        Ok(Self::new(a, b, c, d))
    }
}

/// A [`ContingencyTable`] for one annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationTable {
    key: AnnotationKey,
    table: ContingencyTable,
}

impl AnnotationTable {
    /// Constructs a new `AnnotationTable`
    pub fn new(key: AnnotationKey, table: ContingencyTable) -> Self {
        Self { key, table }
    }

    /// The annotation
    pub fn key(&self) -> &AnnotationKey {
        &self.key
    }

    /// The contingency table of the annotation
    pub fn table(&self) -> &ContingencyTable {
        &self.table
    }

    /// Number of subset targets with the annotation
    pub fn subset_count(&self) -> u64 {
        u64::from(self.table.a())
    }

    /// Number of population targets with the annotation
    pub fn background_count(&self) -> u64 {
        self.table.col1()
    }
}

/// Builds one [`AnnotationTable`] for every subset annotation
///
/// `full_rows` are the annotation counts of the whole population, `subset_rows`
/// the counts restricted to the subset. Annotations are silently dropped if
/// - they are missing in `full_rows`
/// - no subset target carries them
/// - the counts are inconsistent, i.e. any cell of the table would be negative
///
/// No table is built unless the subset is non-empty and strictly smaller than
/// the population. The tables are returned in the order of `subset_rows`.
///
/// # Examples
///
/// ```
/// use npenrich::annotations::{AnnotationCount, AnnotationKey};
/// use npenrich::stats::contingency::build_tables;
///
/// let key = AnnotationKey::new("mibig", "class", "NRP");
/// let full = vec![AnnotationCount::new(key.clone(), 5, 3, 2)];
/// let subset = vec![AnnotationCount::new(key.clone(), 2, 1, 1)];
///
/// let tables = build_tables(4, 20, &full, &subset);
/// let table = tables[0].table();
/// assert_eq!((table.a(), table.b(), table.c(), table.d()), (2, 2, 3, 13));
/// ```
pub fn build_tables(
    subset_total: u64,
    background_total: u64,
    full_rows: &[AnnotationCount],
    subset_rows: &[AnnotationCount],
) -> Vec<AnnotationTable> {
    if subset_total == 0 || full_rows.is_empty() || subset_rows.is_empty() {
        return Vec::new();
    }
    if background_total <= subset_total {
        if background_total < subset_total {
            warn!(
                "Subset ({}) is larger than the background population ({})",
                subset_total, background_total
            );
        }
        return Vec::new();
    }

    let lookup: HashMap<&AnnotationKey, &AnnotationCount> =
        full_rows.iter().map(|row| (row.key(), row)).collect();

    let mut res = Vec::new();
    for row in subset_rows {
        let Some(full) = lookup.get(row.key()) else {
            debug!("Skipping {}: not present in background", row.key());
            continue;
        };
        let (Some(subset_with), Some(background_with)) = (row.n_targets(), full.n_targets()) else {
            debug!("Skipping {}: target count overflow", row.key());
            continue;
        };
        if subset_with == 0 || background_with == 0 || background_with < subset_with {
            debug!(
                "Skipping {}: {} in subset, {} in background",
                row.key(),
                subset_with,
                background_with
            );
            continue;
        }
        match table_cells(subset_total, background_total, subset_with, background_with) {
            Some(table) => {
                debug!(
                    "Annotation:{}\tPopulation: {}, Subset: {}, Background with: {}, Observed: {}",
                    row.key(),
                    background_total,
                    subset_total,
                    background_with,
                    subset_with
                );
                res.push(AnnotationTable::new(row.key().clone(), table));
            }
            None => debug!("Skipping {}: inconsistent table counts", row.key()),
        }
    }
    res
}

/// Derives the four cells, returns `None` if any would be negative or exceed `u32`
fn table_cells(
    subset_total: u64,
    background_total: u64,
    subset_with: u64,
    background_with: u64,
) -> Option<ContingencyTable> {
    let a = subset_with;
    let b = subset_total.checked_sub(a)?;
    let background_only_total = background_total.checked_sub(subset_total)?;
    let c = background_with.checked_sub(a)?;
    let d = background_only_total.checked_sub(c)?;
    Some(ContingencyTable::new(
        u32::try_from(a).ok()?,
        u32::try_from(b).ok()?,
        u32::try_from(c).ok()?,
        u32::try_from(d).ok()?,
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    fn count(value: &str, n_compounds: u64, n_genbank_regions: u64) -> AnnotationCount {
        AnnotationCount::new(
            AnnotationKey::new("scheme", "key", value),
            n_compounds + n_genbank_regions,
            n_compounds,
            n_genbank_regions,
        )
    }

    #[test]
    fn margins() {
        let table = ContingencyTable::new(1, 2, 3, 4);
        assert_eq!(table.row1(), 3);
        assert_eq!(table.row2(), 7);
        assert_eq!(table.col1(), 4);
        assert_eq!(table.col2(), 6);
        assert_eq!(table.total(), 10);
        assert_eq!(table.swap_rows(), ContingencyTable::new(3, 4, 1, 2));

        let table = ContingencyTable::new(u32::MAX, u32::MAX, u32::MAX, u32::MAX);
        assert_eq!(table.total(), 4 * u64::from(u32::MAX));
    }

    #[test]
    fn signed_construction() {
        assert_eq!(
            ContingencyTable::try_from([1, 2, 3, 4]).unwrap(),
            ContingencyTable::new(1, 2, 3, 4)
        );
        assert!(matches!(
            ContingencyTable::try_from([1, -2, 3, 4]),
            Err(EngineError::NegativeCount)
        ));
        assert!(matches!(
            ContingencyTable::try_from([1, 2, 3, i64::from(u32::MAX) + 1]),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn cells_from_counts() {
        let full = vec![count("x", 3, 2)];
        let subset = vec![count("x", 1, 1)];
        let tables = build_tables(4, 20, &full, &subset);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].table(), &ContingencyTable::new(2, 2, 3, 13));
        assert_eq!(tables[0].subset_count(), 2);
        assert_eq!(tables[0].background_count(), 5);
        assert_eq!(tables[0].key().value(), "x");
    }

    #[test]
    fn skip_missing_and_empty() {
        let full = vec![count("x", 3, 0), count("z", 0, 0)];
        let subset = vec![count("y", 1, 0), count("x", 0, 0), count("z", 0, 0)];
        assert!(build_tables(4, 20, &full, &subset).is_empty());
    }

    #[test]
    fn skip_inconsistent_counts() {
        // more subset targets with the annotation than in the background
        let full = vec![count("x", 1, 0)];
        let subset = vec![count("x", 2, 0)];
        assert!(build_tables(4, 20, &full, &subset).is_empty());

        // more annotated subset targets than subset targets
        let full = vec![count("x", 6, 0)];
        let subset = vec![count("x", 5, 0)];
        assert!(build_tables(4, 20, &full, &subset).is_empty());

        // more annotated background targets than background-only targets
        let full = vec![count("x", 19, 0)];
        let subset = vec![count("x", 1, 0)];
        assert!(build_tables(4, 20, &full, &subset).is_empty());
    }

    #[test]
    fn requires_smaller_subset() {
        let full = vec![count("x", 2, 0)];
        let subset = vec![count("x", 2, 0)];
        assert!(build_tables(4, 4, &full, &subset).is_empty());
        assert!(build_tables(5, 4, &full, &subset).is_empty());
        assert!(build_tables(0, 4, &full, &subset).is_empty());
        assert!(build_tables(4, 20, &[], &subset).is_empty());
        assert!(build_tables(4, 20, &full, &[]).is_empty());
    }

    #[test]
    fn keeps_subset_order() {
        let full = vec![count("a", 3, 0), count("b", 3, 0), count("c", 3, 0)];
        let subset = vec![count("c", 1, 0), count("a", 1, 0), count("b", 2, 0)];
        let tables = build_tables(4, 20, &full, &subset);
        let values: Vec<&str> = tables
            .iter()
            .map(|table| table.key().value())
            .collect();
        assert_eq!(values, vec!["c", "a", "b"]);
    }
}
