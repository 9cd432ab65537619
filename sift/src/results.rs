//! Merge per-shard scores into one ranked answer.

use crate::candidate::Candidate;
use crate::interface::{FinishedQuery, SearchResult};
use crate::shard::Score;
use std::cmp::Ordering;
use std::sync::Arc;

/// Descending score; equal scores fall back to ascending snapshot index so the
/// order does not depend on which shard finished first.
pub fn cmp_scores(a: &Score, b: &Score) -> Ordering {
    b.value.total_cmp(&a.value).then_with(|| a.index.cmp(&b.index))
}

/// Concatenate shard outputs and sort them.
pub fn merge_scores(shards: impl IntoIterator<Item = Vec<Score>>) -> Vec<Score> {
    let mut scores: Vec<Score> = shards.into_iter().flatten().collect();
    scores.sort_unstable_by(cmp_scores);
    scores
}

/// Map ranked scores back onto the snapshot.
pub fn finish(interpreted_query: String, scores: &[Score], snapshot: &[Arc<Candidate>]) -> FinishedQuery {
    let results = scores
        .iter()
        .filter_map(|score| {
            snapshot.get(score.index).map(|candidate| SearchResult {
                candidate: Arc::clone(candidate),
                original_index: score.index,
                score: Some(score.value),
            })
        })
        .collect();
    FinishedQuery::new(interpreted_query, results)
}

/// Unscored pass-through of the whole catalog in its original order.
pub fn wildcard(snapshot: Vec<Arc<Candidate>>) -> FinishedQuery {
    let results = snapshot
        .into_iter()
        .enumerate()
        .map(|(original_index, candidate)| SearchResult {
            candidate,
            original_index,
            score: None,
        })
        .collect();
    FinishedQuery::new(String::new(), results)
}
