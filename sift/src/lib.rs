//! Sift - in-memory fuzzy search and relevance ranking for software catalogs
//!
//! Every query re-scans the whole catalog: terms are rewritten and tagged by
//! configurable bias rules, the candidate set is snapshotted and split into
//! contiguous shards scored in parallel, and the shard outputs are merged into one
//! ranked answer.

pub mod bias;
pub mod candidate;
pub mod config;
mod engine;
pub mod interface;
pub mod matcher;
pub mod results;
pub mod scoring;
pub mod shard;

pub use bias::{BiasDescriptor, BiasMode, BoostFunction};
pub use candidate::{Candidate, CandidateFields, Catalog, CatalogList};
pub use config::{EngineConfig, SearchConfig};
pub use engine::SearchEngine;
pub use interface::*;
pub use scoring::test_strings;
