use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::source::{DataSource, SimilarityHit, SimilarityQuery};
use crate::stats::{self, contingency, fisher, Enrichment};
use crate::targets;
use crate::{EngineError, EngineResult, Fingerprint512, DEFAULT_CANDIDATE_CAP};

/// Configuration of an [`EnrichmentEngine`]
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use npenrich::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_candidate_cap(500)
///     .unwrap()
///     .with_deadline(Duration::from_secs(10));
/// assert_eq!(config.candidate_cap(), 500);
///
/// assert!(EngineConfig::default().with_candidate_cap(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    candidate_cap: usize,
    deadline: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            candidate_cap: DEFAULT_CANDIDATE_CAP,
            deadline: None,
        }
    }
}

impl EngineConfig {
    /// Sets the number of similarity hits at which a request is rejected
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] if `cap` is `0`
    pub fn with_candidate_cap(mut self, cap: usize) -> EngineResult<Self> {
        if cap == 0 {
            return Err(EngineError::Validation(
                "candidate cap must be at least 1".to_string(),
            ));
        }
        self.candidate_cap = cap;
        Ok(self)
    }

    /// Sets the maximum time a single request may take
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The number of similarity hits at which a request is rejected
    pub fn candidate_cap(&self) -> usize {
        self.candidate_cap
    }

    /// The maximum time a single request may take
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

/// User-provided settings of the similarity search
///
/// Only `scoreThreshold` is used by the engine. All other settings are
/// kept as they are and echoed back in the [`EnrichmentResponse`].
///
/// # Examples
///
/// ```
/// use npenrich::QuerySettings;
///
/// let settings: QuerySettings =
///     serde_json::from_str(r#"{"scoreThreshold": 0.7, "source": "mibig"}"#).unwrap();
/// assert_eq!(settings.score_threshold(), 0.7);
/// assert_eq!(settings.extra()["source"], "mibig");
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuerySettings {
    score_threshold: f64,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl QuerySettings {
    /// Constructs new `QuerySettings`
    pub fn new(score_threshold: f64) -> Self {
        Self {
            score_threshold,
            extra: Map::new(),
        }
    }

    /// Minimum similarity score of the subset targets
    pub fn score_threshold(&self) -> f64 {
        self.score_threshold
    }

    /// Settings the engine does not interpret
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// An enrichment request: a query fingerprint and the search settings
///
/// # Examples
///
/// ```
/// use npenrich::EnrichmentRequest;
///
/// let json = format!(
///     r#"{{"fingerprint512": "{}", "querySettings": {{"scoreThreshold": 0.7}}}}"#,
///     "0f".repeat(64)
/// );
/// let request: EnrichmentRequest = serde_json::from_str(&json).unwrap();
/// assert_eq!(request.query_settings().score_threshold(), 0.7);
/// assert!(request.fingerprint().is_ok());
///
/// let request: EnrichmentRequest = serde_json::from_str("{}").unwrap();
/// assert!(request.fingerprint().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichmentRequest {
    fingerprint512: Option<String>,
    query_settings: QuerySettings,
}

impl EnrichmentRequest {
    /// Constructs a new request for the hex-encoded 512-bit fingerprint
    pub fn new<T: Into<String>>(fingerprint512: T) -> Self {
        Self {
            fingerprint512: Some(fingerprint512.into()),
            query_settings: QuerySettings::default(),
        }
    }

    /// Sets the minimum similarity score
    #[must_use]
    pub fn with_score_threshold(mut self, score_threshold: f64) -> Self {
        self.query_settings.score_threshold = score_threshold;
        self
    }

    /// The search settings, echoed back in the response
    pub fn query_settings(&self) -> &QuerySettings {
        &self.query_settings
    }

    /// Parses the query fingerprint
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] if the fingerprint is missing or malformed
    pub fn fingerprint(&self) -> EngineResult<Fingerprint512> {
        match self.fingerprint512.as_deref() {
            None | Some("") => Err(EngineError::Validation(
                "missing fingerprint512".to_string(),
            )),
            Some(hex) => Fingerprint512::from_hex(hex),
        }
    }

    fn validate(&self) -> EngineResult<Fingerprint512> {
        let fingerprint = self.fingerprint()?;
        if !self.query_settings.score_threshold.is_finite() {
            return Err(EngineError::Validation(format!(
                "invalid scoreThreshold {}",
                self.query_settings.score_threshold
            )));
        }
        Ok(fingerprint)
    }
}

/// The ranked enrichments of a request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResponse {
    query_settings: QuerySettings,
    items: Vec<Enrichment>,
    #[serde(rename = "elapsed_ms")]
    elapsed_ms: u64,
}

impl EnrichmentResponse {
    fn new(query_settings: QuerySettings, items: Vec<Enrichment>, start: Instant) -> Self {
        Self {
            query_settings,
            items,
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// The settings of the request
    pub fn query_settings(&self) -> &QuerySettings {
        &self.query_settings
    }

    /// The enriched annotations, sorted by adjusted p-value
    pub fn items(&self) -> &[Enrichment] {
        &self.items
    }

    /// Consumes the response and returns the enriched annotations
    pub fn into_items(self) -> Vec<Enrichment> {
        self.items
    }

    /// Time spent on the request in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs enrichment requests against a [`DataSource`]
///
/// ```mermaid
/// graph LR
///     R[request] --> S[similarity search]
///     S -->|hits < cap| T[resolve targets]
///     S -->|hits < cap| F[full annotation counts]
///     T --> U[subset counts + totals]
///     U --> C[contingency tables]
///     F --> C
///     C --> X[exact tests]
///     X --> B[Benjamini-Hochberg]
///     B --> O[ranked enrichments]
/// ```
///
/// The engine holds no mutable state, a single instance can serve
/// concurrent requests.
pub struct EnrichmentEngine<S> {
    source: S,
    config: EngineConfig,
}

impl<S: DataSource> EnrichmentEngine<S> {
    /// Constructs a new engine with the default [`EngineConfig`]
    pub fn new(source: S) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    /// Constructs a new engine
    pub fn with_config(source: S, config: EngineConfig) -> Self {
        Self { source, config }
    }

    /// The underlying data source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Finds the annotations that are enriched among the targets similar to
    /// the query fingerprint
    ///
    /// A request without any resolvable target succeeds with an empty list.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] if the fingerprint is missing or malformed
    /// - [`EngineError::CandidateOverflow`] if the similarity search returns
    ///   at least [`EngineConfig::candidate_cap`] hits. No further queries are issued.
    /// - [`EngineError::Upstream`] if any query of the data source fails
    /// - [`EngineError::DeadlineExceeded`] if the request takes longer than
    ///   [`EngineConfig::deadline`]
    pub fn run_enrichment(&self, request: &EnrichmentRequest) -> EngineResult<EnrichmentResponse> {
        let start = Instant::now();
        let fingerprint = request.validate()?;
        let settings = request.query_settings().clone();

        let cap = self.config.candidate_cap;
        info!(
            "Starting enrichment with score threshold {}, cap {}",
            settings.score_threshold(),
            cap
        );
        let query = SimilarityQuery::new(fingerprint, settings.score_threshold(), cap);
        let hits = self.source.similarity_search(&query)?;
        if hits.len() >= cap {
            warn!("Similarity search returned {} hits, cap is {}", hits.len(), cap);
            return Err(EngineError::CandidateOverflow { cap });
        }

        let (targets, full_rows) = rayon::join(
            || targets::resolve(&self.source, hits.iter().map(SimilarityHit::identifier)),
            || self.source.annotation_counts(),
        );
        let targets = targets?;
        let full_rows = full_rows?;
        if targets.is_empty() {
            info!("No targets for {} similarity hits", hits.len());
            return Ok(EnrichmentResponse::new(settings, Vec::new(), start));
        }

        let subset_rows = self.source.subset_annotation_counts(&targets)?;
        let background_total = self
            .source
            .target_totals()?
            .total()
            .ok_or_else(|| EngineError::upstream("target_totals", "target count overflow"))?;
        let subset_total = targets.len() as u64;

        let tables =
            contingency::build_tables(subset_total, background_total, &full_rows, &subset_rows);
        debug!(
            "{} of {} subset annotations are candidates",
            tables.len(),
            subset_rows.len()
        );

        let pvalues = tables
            .par_iter()
            .map(|table| {
                self.check_deadline(start)?;
                Ok(fisher::two_sided(table.table()))
            })
            .collect::<EngineResult<Vec<f64>>>()?;
        let items = stats::rank_enrichments(tables, &pvalues);

        let response = EnrichmentResponse::new(settings, items, start);
        info!(
            "Enrichment of {} targets ({} in population): {} annotations in {} ms",
            subset_total,
            background_total,
            response.items().len(),
            response.elapsed_ms()
        );
        Ok(response)
    }

    fn check_deadline(&self, start: Instant) -> EngineResult<()> {
        match self.config.deadline {
            Some(deadline) if start.elapsed() >= deadline => Err(EngineError::DeadlineExceeded {
                elapsed_ms: start.elapsed().as_millis(),
            }),
            _ => Ok(()),
        }
    }
}
