//! The read-only queries the enrichment engine issues against the external data store
//!
//! The engine does not know how fingerprints are indexed or where annotations
//! are stored. Everything it needs is expressed by the [`DataSource`] trait.
//! [`memory::InMemorySource`] is a complete implementation over in-memory records.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::annotations::{AnnotationCount, CompoundId, GenbankRegionId};
use crate::targets::TargetSet;
use crate::{EngineResult, Fingerprint512};

pub mod memory;

/// Read-only access to the fingerprint index and the annotation tables
///
/// All methods report failures and timeouts as
/// [`EngineError::Upstream`](`crate::EngineError::Upstream`), which the engine
/// propagates to the caller without retrying.
///
/// Implementations must be `Sync`, the engine issues some queries concurrently.
pub trait DataSource: Sync {
    /// Returns at most `query.limit()` fingerprints with a similarity score of
    /// at least `query.score_threshold()`, ordered by descending score
    fn similarity_search(&self, query: &SimilarityQuery) -> EngineResult<Vec<SimilarityHit>>;

    /// Returns the compound and genbank region ids each fingerprint was computed from
    fn map_identifiers(&self, identifiers: &[HitId]) -> EngineResult<Vec<IdMapping>>;

    /// Annotation counts of the full population
    fn annotation_counts(&self) -> EngineResult<Vec<AnnotationCount>>;

    /// Annotation counts restricted to the given targets
    fn subset_annotation_counts(&self, targets: &TargetSet) -> EngineResult<Vec<AnnotationCount>>;

    /// Total number of targets of each kind in the population
    fn target_totals(&self) -> EngineResult<TargetTotals>;
}

/// The identifier of an indexed fingerprint
#[derive(Clone, Copy, Default, Debug, Hash, PartialEq, PartialOrd, Eq, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HitId {
    inner: u64,
}

impl HitId {
    /// Return the integer representation of the ID
    pub fn as_u64(&self) -> u64 {
        self.inner
    }
}

impl From<u64> for HitId {
    fn from(inner: u64) -> Self {
        HitId { inner }
    }
}

impl Display for HitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fingerprint:{}", self.inner)
    }
}

/// Parameters of a similarity search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityQuery {
    fingerprint: Fingerprint512,
    score_threshold: f64,
    limit: usize,
}

impl SimilarityQuery {
    /// Constructs a new `SimilarityQuery`
    pub fn new(fingerprint: Fingerprint512, score_threshold: f64, limit: usize) -> Self {
        Self {
            fingerprint,
            score_threshold,
            limit,
        }
    }

    /// The query fingerprint
    pub fn fingerprint(&self) -> &Fingerprint512 {
        &self.fingerprint
    }

    /// Minimum similarity score (inclusive)
    pub fn score_threshold(&self) -> f64 {
        self.score_threshold
    }

    /// Maximum number of returned hits
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// The kind of item a fingerprint was computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    /// The fingerprint belongs to a compound
    Compound,
    /// The fingerprint belongs to a biosynthetic gene cluster
    GeneCluster,
    /// The fingerprint is linked to both or neither
    Unknown,
}

/// A single row of a similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityHit {
    identifier: HitId,
    #[serde(rename = "type")]
    kind: HitKind,
    source: Option<String>,
    ext_id: Option<String>,
    name: Option<String>,
    score: f64,
}

impl SimilarityHit {
    /// Constructs a new hit without source metadata
    pub fn new(identifier: HitId, kind: HitKind, score: f64) -> Self {
        Self {
            identifier,
            kind,
            source: None,
            ext_id: None,
            name: None,
            score,
        }
    }

    /// Adds the external record (source database, external id and name)
    #[must_use]
    pub fn with_record(mut self, source: &str, ext_id: &str, name: &str) -> Self {
        self.source = Some(source.to_string());
        self.ext_id = Some(ext_id.to_string());
        self.name = Some(name.to_string());
        self
    }

    /// The fingerprint identifier
    pub fn identifier(&self) -> HitId {
        self.identifier
    }

    /// The kind of the fingerprinted item
    pub fn kind(&self) -> HitKind {
        self.kind
    }

    /// The source database of the external record
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The ID within the source database
    pub fn ext_id(&self) -> Option<&str> {
        self.ext_id.as_deref()
    }

    /// The name of the item
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The similarity score to the query fingerprint
    pub fn score(&self) -> f64 {
        self.score
    }
}

/// A row of the id-mapping query
///
/// Both fields are optional, the [`TargetSet`] only accepts rows with exactly one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    compound_id: Option<CompoundId>,
    genbank_region_id: Option<GenbankRegionId>,
}

impl IdMapping {
    /// Constructs a new `IdMapping`
    pub fn new(
        compound_id: Option<CompoundId>,
        genbank_region_id: Option<GenbankRegionId>,
    ) -> Self {
        Self {
            compound_id,
            genbank_region_id,
        }
    }

    /// A row that maps to a compound only
    pub fn compound(id: u64) -> Self {
        Self::new(Some(id.into()), None)
    }

    /// A row that maps to a genbank region only
    pub fn genbank_region(id: u64) -> Self {
        Self::new(None, Some(id.into()))
    }

    /// The mapped compound, if any
    pub fn compound_id(&self) -> Option<CompoundId> {
        self.compound_id
    }

    /// The mapped genbank region, if any
    pub fn genbank_region_id(&self) -> Option<GenbankRegionId> {
        self.genbank_region_id
    }
}

/// The size of the background population
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTotals {
    n_compounds: u64,
    n_genbank_regions: u64,
}

impl TargetTotals {
    /// Constructs new `TargetTotals`
    pub fn new(n_compounds: u64, n_genbank_regions: u64) -> Self {
        Self {
            n_compounds,
            n_genbank_regions,
        }
    }

    /// Number of compounds in the population
    pub fn n_compounds(&self) -> u64 {
        self.n_compounds
    }

    /// Number of genbank regions in the population
    pub fn n_genbank_regions(&self) -> u64 {
        self.n_genbank_regions
    }

    /// Number of targets of both kinds
    ///
    /// Returns `None` if the sum overflows
    pub fn total(&self) -> Option<u64> {
        self.n_compounds.checked_add(self.n_genbank_regions)
    }
}
