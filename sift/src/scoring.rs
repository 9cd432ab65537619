//! Token-level fuzzy scoring of one candidate against an interpreted query.
//!
//! Every query token must occur (case-insensitively, as a contiguous run) in at
//! least one token of a field for that field to score at all. Each field token a
//! query token occurs in earns `q² / len`, so a query token that covers most of a
//! short field token is worth more than one buried in a long word.

use crate::bias::BiasRule;
use crate::candidate::CandidateFields;
use std::sync::Arc;

/// Candidates must score strictly above this to be returned.
pub const RELEVANCE_THRESHOLD: f64 = 1.0;

/// Score given to a verbatim id match or a case-insensitive title match.
pub const EXACT_MATCH_SCORE: f64 = i32::MAX as f64;

/// Weight and minimum admitted token length (in chars) for one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldWeight {
    pub weight: f64,
    pub min_token_len: usize,
}

pub const TITLE: FieldWeight = FieldWeight { weight: 2.0, min_token_len: 2 };
pub const DEVELOPER: FieldWeight = FieldWeight { weight: 1.0, min_token_len: 2 };
pub const DESCRIPTION: FieldWeight = FieldWeight { weight: 1.0, min_token_len: 3 };
pub const SEARCH_TOKENS: FieldWeight = FieldWeight { weight: 1.5, min_token_len: 0 };

/// Single-char lowercase mapping. Characters whose lowercase form expands to
/// several chars (e.g. 'İ') are kept as-is so token lengths stay stable.
#[inline]
pub(crate) fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Split on Unicode whitespace and case-fold each token into a char vector.
pub(crate) fn fold_tokens(text: &str) -> Vec<Vec<char>> {
    text.split_whitespace()
        .map(|token| token.chars().map(fold_char).collect())
        .collect()
}

/// A query prepared once and shared by every shard.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    raw: String,
    lowered: String,
    tokens: Vec<Vec<char>>,
}

impl PreparedQuery {
    pub fn new(query: &str) -> Self {
        Self {
            raw: query.to_string(),
            lowered: query.to_lowercase(),
            tokens: fold_tokens(query),
        }
    }
}

/// Score `against` for the query tokens, skipping field tokens shorter than
/// `min_token_len` chars. Returns 0.0 as soon as one query token has no match.
pub(crate) fn score_tokens(query_tokens: &[Vec<char>], against: &str, min_token_len: usize) -> f64 {
    let field_tokens: Vec<Vec<char>> = fold_tokens(against)
        .into_iter()
        .filter(|token| token.len() >= min_token_len)
        .collect();

    let mut score = 0.0;
    for query_token in query_tokens {
        let q = query_token.len();
        let mut has_match = false;

        for field_token in &field_tokens {
            if q > field_token.len() {
                continue;
            }
            if field_token.windows(q).any(|window| window == query_token.as_slice()) {
                score += (q * q) as f64 / field_token.len() as f64;
                has_match = true;
            }
        }

        if !has_match {
            return 0.0;
        }
    }
    score
}

/// Fuzzy-match a whole query string against a field string.
pub fn test_strings(query: &str, against: &str, min_token_len: usize) -> f64 {
    score_tokens(&fold_tokens(query), against, min_token_len)
}

fn field_score(query: &PreparedQuery, field: Option<&str>, weight: FieldWeight) -> f64 {
    field.map_or(0.0, |text| score_tokens(&query.tokens, text, weight.min_token_len) * weight.weight)
}

/// Relevance of one candidate before biasing. `None` when it is not searchable.
pub fn base_score(query: &PreparedQuery, fields: &CandidateFields) -> Option<f64> {
    if !fields.searchable {
        return None;
    }

    let title_is_exact = fields
        .title
        .as_deref()
        .is_some_and(|title| title.to_lowercase() == query.lowered);
    if fields.id == query.raw || title_is_exact {
        return Some(EXACT_MATCH_SCORE);
    }

    let score = field_score(query, fields.title.as_deref(), TITLE)
        + field_score(query, fields.developer.as_deref(), DEVELOPER)
        + field_score(query, fields.description.as_deref(), DESCRIPTION)
        + field_score(query, fields.search_tokens.as_deref(), SEARCH_TOKENS);
    Some(score)
}

/// Apply every active boost whose id set contains `id`, in rule order.
pub fn apply_biases(mut score: f64, id: &str, active: &[Arc<BiasRule>]) -> f64 {
    for boost in active.iter().filter_map(|rule| rule.boost()) {
        if boost.contains(id) {
            score = boost.function().apply(score);
        }
    }
    score
}

/// Final score for one candidate, or `None` if it is filtered out.
pub fn score_candidate(query: &PreparedQuery, fields: &CandidateFields, active: &[Arc<BiasRule>]) -> Option<f64> {
    let score = apply_biases(base_score(query, fields)?, &fields.id, active);
    (score > RELEVANCE_THRESHOLD).then_some(score)
}
