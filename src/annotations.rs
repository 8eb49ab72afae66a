//! Targets and their categorical annotations
//!
//! The population consists of two kinds of targets, [`Compound`](`Target::Compound`)s
//! and [`GeneCluster`](`Target::GeneCluster`)s, each identified by a numerical id.
//!
//! The underlying principle for all annotations is the same:
//! - Each annotation is identified by its `(scheme, key, value)` triple, the [`AnnotationKey`].
//! - The data source counts how many targets carry each annotation, once for the full
//!   population and once for a subset of targets, as [`AnnotationCount`]s.

mod target;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
pub use target::{CompoundId, GenbankRegionId, Target, TargetId};

/// The identity of a categorical annotation
///
/// # Examples
///
/// ```
/// use npenrich::annotations::AnnotationKey;
///
/// let key = AnnotationKey::new("biosynthesis", "class", "polyketide");
/// assert_eq!(key.to_string(), "biosynthesis::class::polyketide");
/// ```
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationKey {
    scheme: String,
    key: String,
    value: String,
}

impl AnnotationKey {
    /// Constructs a new `AnnotationKey`
    pub fn new(scheme: &str, key: &str, value: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// The annotation scheme, e.g. a classification system
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The annotation key within the scheme
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The annotation value
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Display for AnnotationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}::{}", self.scheme, self.key, self.value)
    }
}

/// The number of targets that carry one annotation
///
/// `count` is the raw number of annotation records, while `n_compounds` and
/// `n_genbank_regions` count the distinct annotated targets of each kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationCount {
    #[serde(flatten)]
    key: AnnotationKey,
    count: u64,
    n_compounds: u64,
    n_genbank_regions: u64,
}

impl AnnotationCount {
    /// Constructs a new `AnnotationCount`
    pub fn new(key: AnnotationKey, count: u64, n_compounds: u64, n_genbank_regions: u64) -> Self {
        Self {
            key,
            count,
            n_compounds,
            n_genbank_regions,
        }
    }

    /// The identity of the counted annotation
    pub fn key(&self) -> &AnnotationKey {
        &self.key
    }

    /// Number of annotation records
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of distinct compounds carrying the annotation
    pub fn n_compounds(&self) -> u64 {
        self.n_compounds
    }

    /// Number of distinct genbank regions carrying the annotation
    pub fn n_genbank_regions(&self) -> u64 {
        self.n_genbank_regions
    }

    /// Number of distinct targets of either kind carrying the annotation
    ///
    /// Returns `None` if the sum overflows
    pub fn n_targets(&self) -> Option<u64> {
        self.n_compounds.checked_add(self.n_genbank_regions)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn annotation_key_identity() {
        let a = AnnotationKey::new("mibig", "class", "NRP");
        let b = AnnotationKey::new("mibig", "class", "NRP");
        let c = AnnotationKey::new("mibig", "class", "nrp");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.scheme(), "mibig");
        assert_eq!(a.key(), "class");
        assert_eq!(a.value(), "NRP");
    }

    #[test]
    fn target_count() {
        let count = AnnotationCount::new(AnnotationKey::new("a", "b", "c"), 9, 3, 4);
        assert_eq!(count.n_targets(), Some(7));

        let count = AnnotationCount::new(AnnotationKey::new("a", "b", "c"), 9, u64::MAX, 1);
        assert!(count.n_targets().is_none());
    }

    #[test]
    fn count_wire_format() {
        let count = AnnotationCount::new(AnnotationKey::new("a", "b", "c"), 9, 3, 4);
        let json = serde_json::to_value(&count).unwrap();
        assert_eq!(json["scheme"], "a");
        assert_eq!(json["n_genbank_regions"], 4);

        let back: AnnotationCount = serde_json::from_value(json).unwrap();
        assert_eq!(back, count);
    }
}
