//! Sift public interface
//!
//! Records handed back to callers, the crate error type, and the async service
//! trait the UI / search-provider layers program against.

use crate::bias::BiasDescriptor;
use crate::candidate::{Candidate, Catalog};
use std::sync::Arc;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// One ranked hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub candidate: Arc<Candidate>,
    /// Position of the candidate in the snapshot taken for this query
    pub original_index: usize,
    /// `None` for wildcard queries, which are never scored
    pub score: Option<f64>,
}

/// A completed query: what was actually searched for and what matched.
#[derive(Debug, Clone, Default)]
pub struct FinishedQuery {
    /// The joined query after bias rewriting ("" for wildcard queries)
    pub interpreted_query: String,
    pub results: Vec<SearchResult>,
    pub n_results: usize,
}

impl FinishedQuery {
    pub(crate) fn new(interpreted_query: String, results: Vec<SearchResult>) -> Self {
        let n_results = results.len();
        Self {
            interpreted_query,
            results,
            n_results,
        }
    }

    /// Ids of the results in ranked order.
    pub fn ids(&self) -> Vec<String> {
        self.results.iter().map(|r| r.candidate.id()).collect()
    }
}

/// Error type for sift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Shard {shard} failed: {reason}")]
    ShardFailed { shard: usize, reason: String },
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
    #[error("Config error: {0}")]
    Config(String),
}

pub type SiftResult<T> = Result<T, SiftError>;

impl From<rayon::ThreadPoolBuildError> for SiftError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        SiftError::WorkerPool(e.to_string())
    }
}

impl From<serde_json::Error> for SiftError {
    fn from(e: serde_json::Error) -> Self {
        SiftError::Config(e.to_string())
    }
}

impl From<std::io::Error> for SiftError {
    fn from(e: std::io::Error) -> Self {
        SiftError::Config(e.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// The interface exposed to the UI and search-provider layers.
#[async_trait::async_trait]
pub trait SearchEngineApi: Send + Sync {
    /// Rank the current catalog against pre-tokenized query terms.
    /// A query whose terms are all empty returns the whole catalog unscored.
    async fn query(&self, terms: Vec<String>) -> SiftResult<FinishedQuery>;

    /// Replace the catalog being searched. `None` detaches it.
    fn set_model(&self, catalog: Option<Arc<dyn Catalog>>);

    /// Replace every bias rule.
    fn set_biases(&self, biases: Vec<BiasDescriptor>);

    /// Apply a list-model style diff to the bias rules.
    fn splice_biases(&self, position: usize, removed: usize, added: Vec<BiasDescriptor>);
}
