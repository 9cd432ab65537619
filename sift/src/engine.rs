//! SearchEngine - main entry point for catalog queries
//!
//! Concurrency Model:
//! - The engine owns its worker pool (rayon), sized from `EngineConfig`
//! - A query snapshots the catalog's candidate references, interprets the terms
//!   against the current bias rules, then fans the snapshot out to the pool in
//!   contiguous shards
//! - The calling future suspends once, awaiting every shard; results are merged
//!   only after all shards have reported
//! - Catalog and bias rules are swapped copy-on-write, so `set_model` /
//!   `set_biases` never wait on a running query

use crate::bias::{BiasDescriptor, BiasSet};
use crate::candidate::Catalog;
use crate::config::{EngineConfig, SearchConfig};
use crate::interface::{FinishedQuery, SearchEngineApi, SiftError, SiftResult};
use crate::matcher;
use crate::results;
use crate::scoring::PreparedQuery;
use crate::shard::{plan_shards, Score, ShardJob, ShardRange};
use parking_lot::RwLock;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Build a worker pool with the configured size, names and priority.
fn build_pool(config: &EngineConfig) -> SiftResult<rayon::ThreadPool> {
    let prefix = config.thread_name_prefix.clone();
    let mut builder = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count())
        .thread_name(move |i| format!("{prefix}-{i}"));

    if config.low_priority_workers {
        builder = builder.start_handler(|_| {
            // Let UI and async runtime threads preempt scoring work.
            use thread_priority::*;
            let _ = set_current_thread_priority(ThreadPriority::Min);
        });
    }

    Ok(builder.build()?)
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "shard panicked".to_string()
    }
}

/// Thread-safe fuzzy search engine over an external catalog.
pub struct SearchEngine {
    config: EngineConfig,
    pool: Arc<rayon::ThreadPool>,
    catalog: RwLock<Option<Arc<dyn Catalog>>>,
    biases: RwLock<Arc<BiasSet>>,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("config", &self.config)
            .field("workers", &self.workers())
            .field("has_model", &self.catalog.read().is_some())
            .field("biases", &self.biases.read().len())
            .finish()
    }
}

impl SearchEngine {
    /// Create an engine with its own worker pool.
    pub fn new(config: EngineConfig) -> SiftResult<Self> {
        let pool = build_pool(&config)?;
        Ok(Self::with_pool(config, Arc::new(pool)))
    }

    /// Create an engine on an existing pool (shared between engines, or sized for tests).
    pub fn with_pool(config: EngineConfig, pool: Arc<rayon::ThreadPool>) -> Self {
        let biases = Arc::new(BiasSet::new(config.bias_mode));
        Self {
            config,
            pool,
            catalog: RwLock::new(None),
            biases: RwLock::new(biases),
        }
    }

    /// Create an engine and compile both bias layers from `config`.
    pub fn from_config(config: &SearchConfig) -> SiftResult<Self> {
        let engine = Self::new(config.engine.clone())?;
        engine.set_biases(config.bias_descriptors());
        Ok(engine)
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn model(&self) -> Option<Arc<dyn Catalog>> {
        self.catalog.read().clone()
    }

    /// The compiled rule list currently in effect.
    pub fn biases(&self) -> Arc<BiasSet> {
        self.biases.read().clone()
    }

    /// Run `work` on the pool and resolve with its output. A panic inside `work`
    /// resolves to `ShardFailed`.
    fn dispatch<F>(&self, shard: usize, work: F) -> impl Future<Output = SiftResult<Vec<Score>>>
    where
        F: FnOnce() -> Vec<Score> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work)).map_err(panic_reason);
            let _ = tx.send(outcome);
        });

        async move {
            match rx.await {
                Ok(Ok(scores)) => Ok(scores),
                Ok(Err(reason)) => Err(SiftError::ShardFailed { shard, reason }),
                Err(_) => Err(SiftError::ShardFailed {
                    shard,
                    reason: "worker dropped the shard".to_string(),
                }),
            }
        }
    }

    /// Score every shard of `plan` with `work` and merge the hits. Any failed
    /// shard fails the whole call; no partial scores are returned.
    async fn score_shards<W>(&self, plan: Vec<ShardRange>, work: W) -> SiftResult<Vec<Score>>
    where
        W: Fn(ShardRange) -> Vec<Score> + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let pending: Vec<_> = plan
            .into_iter()
            .enumerate()
            .map(|(i, shard)| {
                let work = Arc::clone(&work);
                self.dispatch(i, move || work(shard))
            })
            .collect();

        // Wait for every shard, even when one has already failed.
        let shard_scores = futures::future::join_all(pending)
            .await
            .into_iter()
            .collect::<SiftResult<Vec<_>>>()?;

        Ok(results::merge_scores(shard_scores))
    }

    async fn run_query(&self, terms: &[String]) -> SiftResult<FinishedQuery> {
        if terms.is_empty() {
            return Err(SiftError::InvalidInput("query needs at least one term".to_string()));
        }

        let snapshot = self.model().map(|catalog| catalog.snapshot()).unwrap_or_default();
        if snapshot.is_empty() || terms.iter().all(|t| t.is_empty()) {
            tracing::debug!(candidates = snapshot.len(), "wildcard query");
            return Ok(results::wildcard(snapshot));
        }

        #[cfg(feature = "perf-log")]
        let t0 = std::time::Instant::now();

        let biases = self.biases();
        let interpreted = matcher::interpret(terms, &biases);
        let plan = plan_shards(snapshot.len(), self.workers(), self.config.shard_min_size);
        tracing::debug!(
            query = %interpreted.query,
            candidates = snapshot.len(),
            shards = plan.len(),
            active_biases = interpreted.active.len(),
            "dispatching query"
        );

        let job = Arc::new(ShardJob {
            query: PreparedQuery::new(&interpreted.query),
            snapshot,
            active: interpreted.active,
        });

        let scorer = Arc::clone(&job);
        let scores = self.score_shards(plan, move |shard| scorer.run(shard)).await?;
        let finished = results::finish(interpreted.query, &scores, &job.snapshot);

        #[cfg(feature = "perf-log")]
        tracing::info!(
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            candidates = job.snapshot.len(),
            results = finished.n_results,
            "[perf] query"
        );

        tracing::debug!(results = finished.n_results, "query finished");
        Ok(finished)
    }
}

#[async_trait::async_trait]
impl SearchEngineApi for SearchEngine {
    async fn query(&self, terms: Vec<String>) -> SiftResult<FinishedQuery> {
        self.run_query(&terms).await
    }

    fn set_model(&self, catalog: Option<Arc<dyn Catalog>>) {
        *self.catalog.write() = catalog;
    }

    fn set_biases(&self, biases: Vec<BiasDescriptor>) {
        let set = BiasSet::compile(&biases, self.config.bias_mode);
        tracing::debug!(rules = set.len(), active = set.active().count(), "biases replaced");
        *self.biases.write() = Arc::new(set);
    }

    fn splice_biases(&self, position: usize, removed: usize, added: Vec<BiasDescriptor>) {
        let mut biases = self.biases.write();
        let mut set = BiasSet::clone(&biases);
        set.splice(position, removed, &added);
        tracing::debug!(position, removed, added = added.len(), rules = set.len(), "biases changed");
        *biases = Arc::new(set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{CandidateFields, CatalogList};

    fn engine(workers: usize) -> SearchEngine {
        SearchEngine::new(EngineConfig {
            workers: Some(workers),
            low_priority_workers: false,
            ..Default::default()
        })
        .unwrap()
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_pool_size_follows_config() {
        assert_eq!(engine(3).workers(), 3);
    }

    #[test]
    fn test_empty_terms_rejected() {
        let rt = runtime();
        let engine = engine(1);
        let err = rt.block_on(engine.query(Vec::new())).unwrap_err();
        assert!(matches!(err, SiftError::InvalidInput(_)));
    }

    #[test]
    fn test_no_model_is_empty_wildcard() {
        let rt = runtime();
        let engine = engine(1);
        let finished = rt.block_on(engine.query(terms(&["foo"]))).unwrap();
        assert_eq!(finished.n_results, 0);
        assert_eq!(finished.interpreted_query, "");
    }

    #[test]
    fn test_panicking_shard_fails_query() {
        let rt = runtime();
        let engine = engine(2);
        let ok = engine.dispatch(0, || vec![Score { index: 0, value: 2.0 }]);
        let failed = engine.dispatch(1, || panic!("boom"));
        assert_eq!(rt.block_on(ok).unwrap(), vec![Score { index: 0, value: 2.0 }]);
        match rt.block_on(failed) {
            Err(SiftError::ShardFailed { shard, reason }) => {
                assert_eq!(shard, 1);
                assert_eq!(reason, "boom");
            }
            other => panic!("expected shard failure, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_shard_fails_whole_query() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let rt = runtime();
        let engine = engine(3);
        let plan = plan_shards(3 * 600, engine.workers(), 512);
        assert_eq!(plan.len(), 3);

        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);
        let failing_offset = plan[1].offset;
        let outcome = rt.block_on(engine.score_shards(plan, move |shard| {
            if shard.offset == failing_offset {
                panic!("bad candidate");
            }
            counter.fetch_add(1, Ordering::SeqCst);
            vec![Score { index: shard.offset, value: 2.0 }]
        }));

        match outcome {
            Err(SiftError::ShardFailed { shard, reason }) => {
                assert_eq!(shard, 1);
                assert_eq!(reason, "bad candidate");
            }
            other => panic!("expected shard failure, got {other:?}"),
        }
        // The healthy shards still ran to completion before the error surfaced.
        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_all_shards_merge_in_order() {
        let rt = runtime();
        let engine = engine(3);
        let plan = plan_shards(3 * 600, engine.workers(), 512);
        let scores = rt
            .block_on(engine.score_shards(plan, |shard| {
                vec![Score { index: shard.offset, value: shard.offset as f64 }]
            }))
            .unwrap();
        let indices: Vec<usize> = scores.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1200, 600, 0]);
    }

    #[test]
    fn test_set_model_replaces_catalog() {
        let rt = runtime();
        let engine = engine(1);
        engine.set_model(Some(Arc::new(CatalogList::from_fields(vec![CandidateFields::new("a").with_title("Alpha")]))));
        assert_eq!(rt.block_on(engine.query(terms(&["alpha"]))).unwrap().n_results, 1);

        engine.set_model(Some(Arc::new(CatalogList::from_fields(vec![CandidateFields::new("b").with_title("Beta")]))));
        assert_eq!(rt.block_on(engine.query(terms(&["alpha"]))).unwrap().n_results, 0);

        engine.set_model(None);
        assert!(engine.model().is_none());
    }

    #[test]
    fn test_splice_biases_is_copy_on_write() {
        let engine = engine(1);
        engine.set_biases(vec![BiasDescriptor::new("a").with_rewrite("b")]);
        let before = engine.biases();
        engine.splice_biases(1, 0, vec![BiasDescriptor::new("c").with_rewrite("d")]);
        assert_eq!(before.len(), 1);
        assert_eq!(engine.biases().len(), 2);
    }
}
