use core::fmt::Debug;
use core::hash::Hash;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Compounds and gene clusters are defined by a unique ID that is constrained by this trait
///
/// The ID must be unique only within the target kind, i.e. a compound and a
/// genbank region can have the same ID.
pub trait TargetId:
    Clone + Copy + Debug + Hash + PartialEq + PartialOrd + Eq + Ord + Display + From<u64>
{
    /// Return the integer representation of the target ID
    fn as_u64(&self) -> u64;
}

/// A unique identifier of a natural-product compound
#[derive(Clone, Copy, Default, Debug, Hash, PartialEq, PartialOrd, Eq, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompoundId {
    inner: u64,
}

impl TargetId for CompoundId {
    fn as_u64(&self) -> u64 {
        self.inner
    }
}

impl From<u64> for CompoundId {
    fn from(inner: u64) -> Self {
        CompoundId { inner }
    }
}

impl Display for CompoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "compound:{}", self.inner)
    }
}

/// A unique identifier of a genbank region, i.e. a biosynthetic gene cluster
#[derive(Clone, Copy, Default, Debug, Hash, PartialEq, PartialOrd, Eq, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenbankRegionId {
    inner: u64,
}

impl TargetId for GenbankRegionId {
    fn as_u64(&self) -> u64 {
        self.inner
    }
}

impl From<u64> for GenbankRegionId {
    fn from(inner: u64) -> Self {
        GenbankRegionId { inner }
    }
}

impl Display for GenbankRegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "genbank_region:{}", self.inner)
    }
}

/// A member of the population
///
/// Every target is exactly one of the two kinds.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Target {
    /// A natural-product compound
    Compound(CompoundId),
    /// A biosynthetic gene cluster, stored as genbank region
    GeneCluster(GenbankRegionId),
}

impl Target {
    /// Builds a `Target` from the optional ids of an id-mapping row
    ///
    /// Returns `None` if both or neither of the ids are present
    ///
    /// # Examples
    ///
    /// ```
    /// use npenrich::annotations::{CompoundId, Target};
    ///
    /// assert_eq!(
    ///     Target::from_ids(Some(4u64.into()), None),
    ///     Some(Target::Compound(CompoundId::from(4u64)))
    /// );
    /// assert!(Target::from_ids(Some(4u64.into()), Some(4u64.into())).is_none());
    /// assert!(Target::from_ids(None, None).is_none());
    /// ```
    pub fn from_ids(
        compound_id: Option<CompoundId>,
        genbank_region_id: Option<GenbankRegionId>,
    ) -> Option<Self> {
        match (compound_id, genbank_region_id) {
            (Some(id), None) => Some(Target::Compound(id)),
            (None, Some(id)) => Some(Target::GeneCluster(id)),
            _ => None,
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Compound(id) => Display::fmt(id, f),
            Target::GeneCluster(id) => Display::fmt(id, f),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(CompoundId::from(12u64).to_string(), "compound:12");
        assert_eq!(GenbankRegionId::from(7u64).to_string(), "genbank_region:7");
        assert_eq!(
            Target::GeneCluster(GenbankRegionId::from(7u64)).to_string(),
            "genbank_region:7"
        );
        assert_eq!(Target::Compound(CompoundId::from(12u64)).to_string(), "compound:12");
        assert_eq!(format!("{:>12}", Target::Compound(CompoundId::from(3u64))), "  compound:3");
    }

    #[test]
    fn kinds_share_ids() {
        let compound = Target::Compound(CompoundId::from(1u64));
        let cluster = Target::GeneCluster(GenbankRegionId::from(1u64));
        assert_ne!(compound, cluster);
        assert_eq!(CompoundId::from(1u64).as_u64(), GenbankRegionId::from(1u64).as_u64());
    }
}
