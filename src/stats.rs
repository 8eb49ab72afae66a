//! Statistical analyses of annotation enrichment
//!
//! This module contains the building blocks to calculate which annotations
//! are over-represented in a subset of targets compared to the full population:
//!
//! - [`contingency::build_tables`] creates one 2x2 table per annotation
//! - [`fisher::two_sided`] calculates the exact p-value of each table
//! - [`correction::benjamini_hochberg`] adjusts the p-values for multiple testing
//! - [`rank_enrichments`] combines everything into a sorted list of [`Enrichment`]s
//!
//! [`annotation_enrichment`] runs all steps in sequence.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::annotations::{AnnotationCount, AnnotationKey};

pub mod contingency;
pub mod correction;
pub mod fisher;

use contingency::AnnotationTable;

/// The p-values and fold enrichment of an enriched annotation
///
/// [`Enrichment`] is returned from [`annotation_enrichment`] and [`rank_enrichments`].
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    key: AnnotationKey,
    pvalue: f64,
    adjusted_pvalue: f64,
    subset_count: u64,
    background_count: u64,
    enrichment: f64,
}

impl Enrichment {
    /// Constructs an `Enrichment` for the annotation of `table`
    pub fn new(table: &AnnotationTable, pvalue: f64, adjusted_pvalue: f64) -> Self {
        let t = table.table();
        let enrichment = (f64_from_u64(u64::from(t.a())) / f64_from_u64(t.row1()))
            / (f64_from_u64(t.col1()) / f64_from_u64(t.total()));
        Self {
            key: table.key().clone(),
            pvalue,
            adjusted_pvalue,
            subset_count: table.subset_count(),
            background_count: table.background_count(),
            enrichment,
        }
    }

    /// Returns the annotation
    pub fn key(&self) -> &AnnotationKey {
        &self.key
    }

    /// Returns the identifier of the annotation, `scheme::key::value`
    pub fn id(&self) -> String {
        self.key.to_string()
    }

    /// Returns the raw p-value of the two-sided exact test
    ///
    /// The p-value indicates the probability that the enrichment
    /// occured by chance
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// Returns the p-value adjusted for multiple testing
    pub fn adjusted_pvalue(&self) -> f64 {
        self.adjusted_pvalue
    }

    /// Returns the number of subset targets carrying the annotation
    pub fn count(&self) -> u64 {
        self.subset_count
    }

    /// Returns the number of population targets carrying the annotation
    pub fn background_count(&self) -> u64 {
        self.background_count
    }

    /// Returns the fold enrichment over the background population
    pub fn enrichment(&self) -> f64 {
        self.enrichment
    }
}

impl Serialize for Enrichment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Enrichment", 9)?;
        state.serialize_field("id", &self.id())?;
        state.serialize_field("schema", self.key.scheme())?;
        state.serialize_field("key", self.key.key())?;
        state.serialize_field("value", self.key.value())?;
        state.serialize_field("p_value", &self.pvalue)?;
        state.serialize_field("adjusted_p_value", &self.adjusted_pvalue)?;
        state.serialize_field("subset_count", &self.subset_count)?;
        state.serialize_field("background_count", &self.background_count)?;
        state.serialize_field("enrichment", &self.enrichment)?;
        state.end()
    }
}

/// Adjusts the p-values and returns the sorted [`Enrichment`]s
///
/// `pvalues` holds the raw p-value of each table, in the same order.
/// The result is sorted ascending by adjusted p-value, then by raw p-value.
/// Annotations with identical p-values keep the order of `tables`.
///
/// # Panics
///
/// If `tables` and `pvalues` have different lengths
pub fn rank_enrichments(tables: Vec<AnnotationTable>, pvalues: &[f64]) -> Vec<Enrichment> {
    assert_eq!(
        tables.len(),
        pvalues.len(),
        "each table needs exactly one p-value"
    );
    let adjusted = correction::benjamini_hochberg(pvalues);
    let mut res: Vec<Enrichment> = tables
        .iter()
        .zip(pvalues.iter().zip(adjusted))
        .map(|(table, (pvalue, adjusted_pvalue))| Enrichment::new(table, *pvalue, adjusted_pvalue))
        .collect();
    res.sort_by(|a, b| {
        a.adjusted_pvalue
            .total_cmp(&b.adjusted_pvalue)
            .then_with(|| a.pvalue.total_cmp(&b.pvalue))
    });
    res
}

/// Calculates the enrichment of all subset annotations compared to the background
///
/// - `subset_total`: number of targets in the subset
/// - `background_total`: number of targets in the full population
/// - `full_rows`: annotation counts of the full population
/// - `subset_rows`: annotation counts of the subset
///
/// # Examples
///
/// ```
/// use npenrich::annotations::{AnnotationCount, AnnotationKey};
/// use npenrich::stats::annotation_enrichment;
///
/// let nrp = AnnotationKey::new("mibig", "class", "NRP");
/// let pk = AnnotationKey::new("mibig", "class", "PK");
/// let full = vec![
///     AnnotationCount::new(nrp.clone(), 4, 4, 0),
///     AnnotationCount::new(pk.clone(), 5, 5, 0),
/// ];
/// let subset = vec![
///     AnnotationCount::new(nrp.clone(), 4, 4, 0),
///     AnnotationCount::new(pk.clone(), 1, 1, 0),
/// ];
///
/// let enrichments = annotation_enrichment(4, 10, &full, &subset);
/// assert_eq!(enrichments[0].key(), &nrp);
/// assert!(enrichments[0].pvalue() < enrichments[1].pvalue());
/// ```
pub fn annotation_enrichment(
    subset_total: u64,
    background_total: u64,
    full_rows: &[AnnotationCount],
    subset_rows: &[AnnotationCount],
) -> Vec<Enrichment> {
    let tables = contingency::build_tables(subset_total, background_total, full_rows, subset_rows);
    let pvalues: Vec<f64> = tables
        .iter()
        .map(|table| fisher::two_sided(table.table()))
        .collect();
    rank_enrichments(tables, &pvalues)
}

/// Counts are converted to `f64` for ratios only, precision loss
/// for counts beyond 2^53 is acceptable there.
#[allow(clippy::cast_precision_loss)]
fn f64_from_u64(n: u64) -> f64 {
    n as f64
}

#[allow(clippy::cast_precision_loss)]
fn f64_from_usize(n: usize) -> f64 {
    n as f64
}

#[cfg(test)]
mod test {
    use super::*;
    use contingency::ContingencyTable;

    fn annotation(value: &str, table: ContingencyTable) -> AnnotationTable {
        AnnotationTable::new(AnnotationKey::new("mibig", "class", value), table)
    }

    #[test]
    fn fold_enrichment() {
        // 2 of 4 subset targets vs. 5 of 20 population targets
        let table = annotation("NRP", ContingencyTable::new(2, 2, 3, 13));
        let enrichment = Enrichment::new(&table, 0.1, 0.2);
        assert!((enrichment.enrichment() - 2.0).abs() < f64::EPSILON);
        assert_eq!(enrichment.count(), 2);
        assert_eq!(enrichment.background_count(), 5);
        assert_eq!(enrichment.id(), "mibig::class::NRP");
    }

    #[test]
    fn rank_by_adjusted_then_raw() {
        let tables = vec![
            annotation("a", ContingencyTable::new(1, 3, 4, 2)),
            annotation("b", ContingencyTable::new(4, 0, 0, 6)),
            annotation("c", ContingencyTable::new(2, 2, 3, 13)),
        ];
        // a and c share the same adjusted p-value
        let ranked = rank_enrichments(tables, &[0.04, 0.001, 0.03]);
        let values: Vec<&str> = ranked.iter().map(|e| e.key().value()).collect();
        assert_eq!(values, vec!["b", "c", "a"]);
        assert!((ranked[1].adjusted_pvalue() - 0.04).abs() < 1e-12);
        assert!((ranked[2].adjusted_pvalue() - 0.04).abs() < 1e-12);
        assert!(ranked.windows(2).all(|w| w[0].adjusted_pvalue() <= w[1].adjusted_pvalue()));
    }

    #[test]
    fn ties_keep_table_order() {
        let tables = vec![
            annotation("z", ContingencyTable::new(2, 0, 0, 2)),
            annotation("y", ContingencyTable::new(2, 0, 0, 2)),
        ];
        let ranked = rank_enrichments(tables, &[0.5, 0.5]);
        assert_eq!(ranked[0].key().value(), "z");
        assert_eq!(ranked[1].key().value(), "y");
    }

    #[test]
    fn empty_ranking() {
        assert!(rank_enrichments(Vec::new(), &[]).is_empty());
    }

    #[test]
    fn single_candidate_is_not_adjusted() {
        let full = vec![AnnotationCount::new(AnnotationKey::new("s", "k", "v"), 2, 2, 0)];
        let subset = full.clone();
        let enrichments = annotation_enrichment(2, 4, &full, &subset);
        assert_eq!(enrichments.len(), 1);
        assert!((enrichments[0].pvalue() - 1.0 / 3.0).abs() < 1e-12);
        assert!((enrichments[0].adjusted_pvalue() - enrichments[0].pvalue()).abs() < f64::EPSILON);
    }

    #[test]
    fn enrichment_wire_format() {
        let table = annotation("NRP", ContingencyTable::new(2, 2, 3, 13));
        let json = serde_json::to_value(Enrichment::new(&table, 0.1, 0.2)).unwrap();
        assert_eq!(json["id"], "mibig::class::NRP");
        assert_eq!(json["schema"], "mibig");
        assert_eq!(json["key"], "class");
        assert_eq!(json["value"], "NRP");
        assert_eq!(json["p_value"], 0.1);
        assert_eq!(json["adjusted_p_value"], 0.2);
        assert_eq!(json["subset_count"], 2);
        assert_eq!(json["background_count"], 5);
    }
}
