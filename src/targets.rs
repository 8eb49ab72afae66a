//! Resolution of similarity hits into compound and gene-cluster targets
//!
//! A similarity hit refers to a fingerprint, not to a target. The data source
//! maps each hit to the compound or genbank region the fingerprint was
//! computed from. Only unambiguous mappings become a [`Target`].

use std::collections::HashSet;

use tracing::debug;

use crate::annotations::{CompoundId, GenbankRegionId, Target};
use crate::source::{DataSource, HitId, IdMapping};
use crate::EngineResult;

/// The disjoint sets of compound and genbank region ids selected by a search
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TargetSet {
    compounds: HashSet<CompoundId>,
    genbank_regions: HashSet<GenbankRegionId>,
}

impl TargetSet {
    /// Constructs a new, empty `TargetSet`
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a `TargetSet` from id-mapping rows
    ///
    /// Rows that map to both a compound and a genbank region, or to neither,
    /// are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use npenrich::source::IdMapping;
    /// use npenrich::targets::TargetSet;
    ///
    /// let rows = vec![
    ///     IdMapping::compound(1),
    ///     IdMapping::genbank_region(1),
    ///     IdMapping::new(Some(2u64.into()), Some(3u64.into())),
    ///     IdMapping::new(None, None),
    /// ];
    /// let targets = TargetSet::from_mappings(rows);
    /// assert_eq!(targets.len(), 2);
    /// ```
    pub fn from_mappings<I: IntoIterator<Item = IdMapping>>(rows: I) -> Self {
        let mut set = Self::new();
        for row in rows {
            match Target::from_ids(row.compound_id(), row.genbank_region_id()) {
                Some(target) => {
                    set.insert(target);
                }
                None => debug!("Skipping ambiguous id mapping {:?}", row),
            }
        }
        set
    }

    /// Adds a [`Target`] to the set
    ///
    /// Returns whether the target was newly inserted
    pub fn insert(&mut self, target: Target) -> bool {
        match target {
            Target::Compound(id) => self.compounds.insert(id),
            Target::GeneCluster(id) => self.genbank_regions.insert(id),
        }
    }

    /// Returns `true` if the set contains the target
    pub fn contains(&self, target: &Target) -> bool {
        match target {
            Target::Compound(id) => self.compounds.contains(id),
            Target::GeneCluster(id) => self.genbank_regions.contains(id),
        }
    }

    /// The compound ids of the set
    pub fn compounds(&self) -> &HashSet<CompoundId> {
        &self.compounds
    }

    /// The genbank region ids of the set
    pub fn genbank_regions(&self) -> &HashSet<GenbankRegionId> {
        &self.genbank_regions
    }

    /// Total number of targets of both kinds
    pub fn len(&self) -> usize {
        self.compounds.len() + self.genbank_regions.len()
    }

    /// Returns `true` if the set contains no targets
    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty() && self.genbank_regions.is_empty()
    }

    /// Iterates all targets, compounds first
    pub fn iter(&self) -> impl Iterator<Item = Target> + '_ {
        self.compounds
            .iter()
            .map(|id| Target::Compound(*id))
            .chain(self.genbank_regions.iter().map(|id| Target::GeneCluster(*id)))
    }
}

impl FromIterator<Target> for TargetSet {
    fn from_iter<T: IntoIterator<Item = Target>>(iter: T) -> Self {
        let mut set = Self::new();
        for target in iter {
            set.insert(target);
        }
        set
    }
}

/// Resolves similarity hit identifiers into a [`TargetSet`]
///
/// Duplicate identifiers are queried only once.
///
/// # Errors
///
/// Propagates the [`EngineError::Upstream`](`crate::EngineError::Upstream`) error
/// of the id-mapping query
pub fn resolve<S: DataSource + ?Sized, I: IntoIterator<Item = HitId>>(
    source: &S,
    identifiers: I,
) -> EngineResult<TargetSet> {
    let mut seen = HashSet::new();
    let identifiers: Vec<HitId> = identifiers
        .into_iter()
        .filter(|id| seen.insert(*id))
        .collect();
    if identifiers.is_empty() {
        return Ok(TargetSet::new());
    }
    let mappings = source.map_identifiers(&identifiers)?;
    let targets = TargetSet::from_mappings(mappings);
    debug!(
        "Resolved {} hits into {} compounds and {} genbank regions",
        identifiers.len(),
        targets.compounds.len(),
        targets.genbank_regions.len()
    );
    Ok(targets)
}
