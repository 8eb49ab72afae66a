//! A [`DataSource`] that keeps fingerprints and annotations in memory
//!
//! Useful for tests, benchmarks and offline analyses of small populations.
//! Similarity scores are the cosine similarity of the binary fingerprints.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::annotations::{AnnotationCount, AnnotationKey, CompoundId, GenbankRegionId, Target};
use crate::source::{
    DataSource, HitId, HitKind, IdMapping, SimilarityHit, SimilarityQuery, TargetTotals,
};
use crate::targets::TargetSet;
use crate::{EngineResult, Fingerprint512};

/// Rows, compounds and genbank regions of one annotation
type KeyCount = (u64, HashSet<CompoundId>, HashSet<GenbankRegionId>);

/// A fingerprint together with the item it was computed from
#[derive(Debug, Clone)]
pub struct Record {
    identifier: HitId,
    mapping: IdMapping,
    fingerprint: Fingerprint512,
    annotations: Vec<AnnotationKey>,
    name: Option<String>,
}

impl Record {
    /// Constructs a new `Record` with an arbitrary id mapping
    pub fn new(identifier: u64, mapping: IdMapping, fingerprint: Fingerprint512) -> Self {
        Self {
            identifier: identifier.into(),
            mapping,
            fingerprint,
            annotations: Vec::new(),
            name: None,
        }
    }

    /// A fingerprint of the compound `compound_id`
    pub fn compound(identifier: u64, compound_id: u64, fingerprint: Fingerprint512) -> Self {
        Self::new(identifier, IdMapping::compound(compound_id), fingerprint)
    }

    /// A fingerprint of the genbank region `genbank_region_id`
    pub fn genbank_region(
        identifier: u64,
        genbank_region_id: u64,
        fingerprint: Fingerprint512,
    ) -> Self {
        Self::new(
            identifier,
            IdMapping::genbank_region(genbank_region_id),
            fingerprint,
        )
    }

    /// A fingerprint that is not linked to any target
    pub fn unmapped(identifier: u64, fingerprint: Fingerprint512) -> Self {
        Self::new(identifier, IdMapping::default(), fingerprint)
    }

    /// Annotates the target of the record
    ///
    /// Annotations of records without a unique target are ignored
    #[must_use]
    pub fn with_annotation(mut self, key: AnnotationKey) -> Self {
        self.annotations.push(key);
        self
    }

    /// Sets the display name of the record
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    fn target(&self) -> Option<Target> {
        Target::from_ids(self.mapping.compound_id(), self.mapping.genbank_region_id())
    }

    fn kind(&self) -> HitKind {
        match self.target() {
            Some(Target::Compound(_)) => HitKind::Compound,
            Some(Target::GeneCluster(_)) => HitKind::GeneCluster,
            None => HitKind::Unknown,
        }
    }
}

/// In-memory fingerprint index and annotation table
#[derive(Debug, Default)]
pub struct InMemorySource {
    records: Vec<Record>,
    index: HashMap<HitId, usize>,
    population: HashSet<Target>,
    annotations: Vec<(Target, AnnotationKey)>,
}

impl InMemorySource {
    /// Constructs a new, empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fingerprint record
    ///
    /// The target of the record becomes part of the population and receives
    /// the annotations of the record. A record with an already known
    /// identifier replaces the fingerprint and mapping of the previous one.
    pub fn add(&mut self, record: Record) {
        if let Some(target) = record.target() {
            self.population.insert(target);
            for key in &record.annotations {
                self.annotations.push((target, key.clone()));
            }
        }
        match self.index.get(&record.identifier) {
            Some(idx) => self.records[*idx] = record,
            None => {
                self.index.insert(record.identifier, self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Adds a target without any fingerprint to the population
    pub fn add_target(&mut self, target: Target) {
        self.population.insert(target);
    }

    /// Annotates a target directly
    pub fn annotate(&mut self, target: Target, key: AnnotationKey) {
        self.population.insert(target);
        self.annotations.push((target, key));
    }

    /// Number of fingerprint records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the source has no fingerprint records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn count<'a, I>(rows: I) -> Vec<AnnotationCount>
    where
        I: Iterator<Item = &'a (Target, AnnotationKey)>,
    {
        let mut counts: BTreeMap<&AnnotationKey, KeyCount> = BTreeMap::new();
        for (target, key) in rows {
            let entry = counts.entry(key).or_default();
            entry.0 += 1;
            match target {
                Target::Compound(id) => {
                    entry.1.insert(*id);
                }
                Target::GeneCluster(id) => {
                    entry.2.insert(*id);
                }
            }
        }
        let mut res: Vec<AnnotationCount> = counts
            .into_iter()
            .map(|(key, (count, compounds, regions))| {
                AnnotationCount::new(
                    key.clone(),
                    count,
                    compounds.len() as u64,
                    regions.len() as u64,
                )
            })
            .collect();
        // most frequent annotations first, stable for equal counts
        res.sort_by(|a, b| b.count().cmp(&a.count()));
        res
    }
}

impl DataSource for InMemorySource {
    fn similarity_search(&self, query: &SimilarityQuery) -> EngineResult<Vec<SimilarityHit>> {
        let mut hits: Vec<SimilarityHit> = self
            .records
            .iter()
            .filter_map(|record| {
                let score = record.fingerprint.cosine_similarity(query.fingerprint())?;
                if score < query.score_threshold() {
                    return None;
                }
                let hit = SimilarityHit::new(record.identifier, record.kind(), score);
                Some(match &record.name {
                    Some(name) => hit.with_record("memory", &record.identifier.to_string(), name),
                    None => hit,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score()
                .total_cmp(&a.score())
                .then_with(|| a.identifier().cmp(&b.identifier()))
        });
        hits.truncate(query.limit());
        Ok(hits)
    }

    fn map_identifiers(&self, identifiers: &[HitId]) -> EngineResult<Vec<IdMapping>> {
        Ok(identifiers
            .iter()
            .filter_map(|id| self.index.get(id))
            .map(|idx| self.records[*idx].mapping)
            .collect())
    }

    fn annotation_counts(&self) -> EngineResult<Vec<AnnotationCount>> {
        Ok(Self::count(self.annotations.iter()))
    }

    fn subset_annotation_counts(&self, targets: &TargetSet) -> EngineResult<Vec<AnnotationCount>> {
        Ok(Self::count(
            self.annotations
                .iter()
                .filter(|(target, _)| targets.contains(target)),
        ))
    }

    fn target_totals(&self) -> EngineResult<TargetTotals> {
        let n_compounds = self
            .population
            .iter()
            .filter(|target| matches!(target, Target::Compound(_)))
            .count();
        let n_genbank_regions = self.population.len() - n_compounds;
        Ok(TargetTotals::new(
            n_compounds as u64,
            n_genbank_regions as u64,
        ))
    }
}
