//! `npenrich` finds annotations that are over-represented among the
//! natural-product compounds and biosynthetic gene clusters returned by a
//! fingerprint similarity search.
//!
//! The crate contains the statistics engine only. Fingerprint generation,
//! the similarity search itself and the storage of annotations live in an
//! external data store that is accessed through the [`DataSource`] trait.
//!
//! For every annotation `(scheme, key, value)` that occurs in the matched
//! subset, a 2x2 contingency table is built against the background population
//! and tested with a two-sided [Fisher's exact test](`stats::fisher`).
//! The raw p-values of one request are then corrected with the
//! [Benjamini-Hochberg procedure](`stats::correction`).
//!
//! # Examples
//!
//! ```
//! use npenrich::annotations::AnnotationKey;
//! use npenrich::source::memory::{InMemorySource, Record};
//! use npenrich::{EnrichmentEngine, EnrichmentRequest, Fingerprint512};
//!
//! let query = Fingerprint512::from_bits(&[1, 2, 3]);
//! let polyketide = AnnotationKey::new("biosynthesis", "class", "polyketide");
//!
//! let mut source = InMemorySource::new();
//! source.add(Record::compound(1, 1, query).with_annotation(polyketide.clone()));
//! source.add(Record::compound(2, 2, query).with_annotation(polyketide.clone()));
//! source.add(Record::compound(3, 3, Fingerprint512::from_bits(&[400])));
//! source.add(Record::compound(4, 4, Fingerprint512::from_bits(&[401])));
//!
//! let engine = EnrichmentEngine::new(source);
//! let request = EnrichmentRequest::new(query.to_hex()).with_score_threshold(0.9);
//! let response = engine.run_enrichment(&request).unwrap();
//!
//! let top = &response.items()[0];
//! assert_eq!(top.key(), &polyketide);
//! assert!((top.pvalue() - 1.0 / 3.0).abs() < 1e-9);
//! ```
#![warn(missing_docs)]

use thiserror::Error;

pub mod annotations;
mod engine;
mod fingerprint;
pub mod source;
pub mod stats;
pub mod targets;

pub use engine::{
    EngineConfig, EnrichmentEngine, EnrichmentRequest, EnrichmentResponse, QuerySettings,
};
pub use fingerprint::Fingerprint512;
pub use source::DataSource;

/// Default number of similarity hits that aborts an enrichment request
pub const DEFAULT_CANDIDATE_CAP: usize = 1000;

/// Error type for all enrichment operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// The request is missing data or contains malformed data
    #[error("invalid request: {0}")]
    Validation(String),
    /// The similarity search returned too many targets
    #[error("too many items in in-group (>={cap}), please increase the score threshold and try again")]
    CandidateOverflow {
        /// The configured candidate cap
        cap: usize,
    },
    /// A contingency table was constructed from negative counts
    #[error("contingency table counts must be non-negative")]
    NegativeCount,
    /// The external data source failed
    #[error("upstream query `{query}` failed")]
    Upstream {
        /// Name of the failing query
        query: &'static str,
        /// Underlying cause
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The request ran longer than the configured deadline
    #[error("deadline exceeded after {elapsed_ms} ms")]
    DeadlineExceeded {
        /// Time spent on the request before it was aborted
        elapsed_ms: u128,
    },
}

impl EngineError {
    /// Wraps any error of the external data store as [`EngineError::Upstream`]
    pub fn upstream<E>(query: &'static str, err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        EngineError::Upstream {
            query,
            source: err.into(),
        }
    }
}

/// Shortcut for `Result<T, EngineError>`
pub type EngineResult<T> = Result<T, EngineError>;
