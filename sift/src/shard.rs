//! Snapshot partitioning and per-shard scoring.

use crate::bias::BiasRule;
use crate::candidate::Candidate;
use crate::scoring::{score_candidate, PreparedQuery};
use std::ops::Range;
use std::sync::Arc;

/// Default number of candidates below which work is not split further.
pub const DEFAULT_SHARD_MIN_SIZE: usize = 512;

/// One `(snapshot index, score)` pair that passed the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub index: usize,
    pub value: f64,
}

/// Contiguous slice of the snapshot handled by one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRange {
    pub offset: usize,
    pub len: usize,
}

impl ShardRange {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// `max(1, min(n / shard_min_size, workers))`
pub fn shard_count(n: usize, workers: usize, shard_min_size: usize) -> usize {
    (n / shard_min_size.max(1)).min(workers).max(1)
}

/// Split `[0, n)` into `shard_count` contiguous ranges of `n / k` items; the
/// remainder goes to the last range.
pub fn plan_shards(n: usize, workers: usize, shard_min_size: usize) -> Vec<ShardRange> {
    let k = shard_count(n, workers, shard_min_size);
    let per_shard = n / k;
    (0..k)
        .map(|i| ShardRange {
            offset: i * per_shard,
            len: if i == k - 1 { per_shard + n % k } else { per_shard },
        })
        .collect()
}

/// Everything a shard needs, shared read-only by all shards of one query.
#[derive(Debug)]
pub struct ShardJob {
    pub query: PreparedQuery,
    pub snapshot: Vec<Arc<Candidate>>,
    pub active: Vec<Arc<BiasRule>>,
}

impl ShardJob {
    /// Score every candidate in `shard`. Each candidate's read lock is held only
    /// while that candidate is scored.
    pub fn run(&self, shard: ShardRange) -> Vec<Score> {
        let mut scores = Vec::new();
        for index in shard.range() {
            let Some(candidate) = self.snapshot.get(index) else {
                break;
            };
            let fields = candidate.read();
            if let Some(value) = score_candidate(&self.query, &fields, &self.active) {
                scores.push(Score { index, value });
            }
        }
        tracing::trace!(offset = shard.offset, len = shard.len, hits = scores.len(), "shard finished");
        scores
    }
}
