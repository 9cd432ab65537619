//! Catalog entries and the catalog view the engine searches.
//!
//! A `Candidate` is owned by whoever maintains the catalog. Its fields sit behind
//! a per-entry `RwLock` so the catalog can mutate an entry while a query is
//! scoring it; the engine only ever holds one read guard at a time.

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Searchable text of one catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateFields {
    pub id: String,
    pub title: Option<String>,
    pub developer: Option<String>,
    pub description: Option<String>,
    /// Precomputed alternate search text (keywords, translated names, ...)
    pub search_tokens: Option<String>,
    #[serde(default = "default_searchable")]
    pub searchable: bool,
}

fn default_searchable() -> bool {
    true
}

impl CandidateFields {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            searchable: true,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_developer(mut self, developer: impl Into<String>) -> Self {
        self.developer = Some(developer.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_search_tokens(mut self, tokens: impl Into<String>) -> Self {
        self.search_tokens = Some(tokens.into());
        self
    }

    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }
}

/// One catalog entry with its own reader-writer lock.
#[derive(Debug, Default)]
pub struct Candidate {
    fields: RwLock<CandidateFields>,
}

impl Candidate {
    pub fn new(fields: CandidateFields) -> Self {
        Self {
            fields: RwLock::new(fields),
        }
    }

    /// Short-lived read access. Do not hold the guard across an await point.
    pub fn read(&self) -> RwLockReadGuard<'_, CandidateFields> {
        self.fields.read()
    }

    /// Mutate the entry under the write lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut CandidateFields) -> R) -> R {
        f(&mut self.fields.write())
    }

    pub fn id(&self) -> String {
        self.fields.read().id.clone()
    }
}

impl From<CandidateFields> for Candidate {
    fn from(fields: CandidateFields) -> Self {
        Self::new(fields)
    }
}

/// Ordered collection of candidates as exposed by the catalog owner.
pub trait Catalog: Send + Sync {
    fn count(&self) -> usize;

    fn get(&self, index: usize) -> Option<Arc<Candidate>>;

    /// Point-in-time copy of the candidate references, in catalog order.
    ///
    /// The default walks `count`/`get`, which may observe a concurrent resize;
    /// entries that vanish mid-walk are dropped from the copy.
    fn snapshot(&self) -> Vec<Arc<Candidate>> {
        (0..self.count()).filter_map(|i| self.get(i)).collect()
    }
}

/// Simple in-memory catalog backed by a locked `Vec`.
#[derive(Debug, Default)]
pub struct CatalogList {
    items: RwLock<Vec<Arc<Candidate>>>,
}

impl CatalogList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: impl IntoIterator<Item = CandidateFields>) -> Self {
        Self {
            items: RwLock::new(fields.into_iter().map(|f| Arc::new(Candidate::new(f))).collect()),
        }
    }

    pub fn push(&self, candidate: Arc<Candidate>) {
        self.items.write().push(candidate);
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, candidate: Arc<Candidate>) {
        let mut items = self.items.write();
        let index = index.min(items.len());
        items.insert(index, candidate);
    }

    pub fn remove(&self, index: usize) -> Option<Arc<Candidate>> {
        let mut items = self.items.write();
        (index < items.len()).then(|| items.remove(index))
    }

    pub fn replace_all(&self, candidates: Vec<Arc<Candidate>>) {
        *self.items.write() = candidates;
    }
}

impl Catalog for CatalogList {
    fn count(&self) -> usize {
        self.items.read().len()
    }

    fn get(&self, index: usize) -> Option<Arc<Candidate>> {
        self.items.read().get(index).cloned()
    }

    fn snapshot(&self) -> Vec<Arc<Candidate>> {
        self.items.read().clone()
    }
}
