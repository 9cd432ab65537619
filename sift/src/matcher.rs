//! Query interpretation: apply bias rules to the caller's terms.

use crate::bias::{BiasMode, BiasRule, BiasSet};
use std::sync::Arc;

/// The query after rewriting, plus every rule that fired on it.
#[derive(Debug, Clone, Default)]
pub struct InterpretedQuery {
    pub query: String,
    /// Rules that matched, in rule-list order, without duplicates
    pub active: Vec<Arc<BiasRule>>,
}

/// Interpret `terms` with the rule set's own mode.
pub fn interpret(terms: &[String], biases: &BiasSet) -> InterpretedQuery {
    match biases.mode() {
        BiasMode::Catalog => interpret_whole_query(terms, biases),
        BiasMode::System => interpret_per_term(terms, biases),
    }
}

/// Join the terms and run every rule over the joined string. Each rewrite feeds
/// the next rule.
pub fn interpret_whole_query(terms: &[String], biases: &BiasSet) -> InterpretedQuery {
    let mut query = terms.join(" ");
    let mut active = Vec::new();

    for (_, rule) in biases.active() {
        if !rule.regex().is_match(&query) {
            continue;
        }
        if let Some(template) = rule.rewrite() {
            query = rule.regex().replace_all(&query, template).into_owned();
        }
        active.push(Arc::clone(rule));
    }

    InterpretedQuery { query, active }
}

/// Run every rule over each term separately, then join the terms.
pub fn interpret_per_term(terms: &[String], biases: &BiasSet) -> InterpretedQuery {
    let mut fired = vec![false; biases.len()];
    let mut rewritten = Vec::with_capacity(terms.len());

    for term in terms {
        let mut term = term.clone();
        for (position, rule) in biases.active() {
            if !rule.regex().is_match(&term) {
                continue;
            }
            if let Some(template) = rule.rewrite() {
                term = rule.regex().replace_all(&term, template).into_owned();
            }
            fired[position] = true;
        }
        rewritten.push(term);
    }

    let active = biases
        .active()
        .filter(|(position, _)| fired[*position])
        .map(|(_, rule)| Arc::clone(rule))
        .collect();

    InterpretedQuery {
        query: rewritten.join(" "),
        active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bias::BiasDescriptor;

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_no_biases_joins_terms() {
        let set = BiasSet::new(BiasMode::Catalog);
        let interpreted = interpret(&terms(&["video", "editor"]), &set);
        assert_eq!(interpreted.query, "video editor");
        assert!(interpreted.active.is_empty());
    }

    #[test]
    fn test_whole_query_rewrite_replaces_match() {
        let set = BiasSet::compile(&[BiasDescriptor::new("photoshop").with_rewrite("image editor")], BiasMode::Catalog);
        let interpreted = interpret(&terms(&["free", "photoshop"]), &set);
        assert_eq!(interpreted.query, "free image editor");
        assert_eq!(interpreted.active.len(), 1);
    }

    #[test]
    fn test_whole_query_rules_chain() {
        let set = BiasSet::compile(
            &[
                BiasDescriptor::new("^word$").with_rewrite("office"),
                BiasDescriptor::new("office").with_rewrite("office suite"),
            ],
            BiasMode::Catalog,
        );
        let interpreted = interpret(&terms(&["word"]), &set);
        assert_eq!(interpreted.query, "office suite");
        assert_eq!(interpreted.active.len(), 2);
    }

    #[test]
    fn test_whole_query_matches_across_terms() {
        let set = BiasSet::compile(
            &[BiasDescriptor::new("web browser")
                .with_boost_ids(["org.mozilla.firefox"])
                .with_linear_boost(2.0, 0.0)],
            BiasMode::Catalog,
        );
        let interpreted = interpret(&terms(&["web", "browser"]), &set);
        // Boost-only rules activate without rewriting
        assert_eq!(interpreted.query, "web browser");
        assert_eq!(interpreted.active.len(), 1);
    }

    #[test]
    fn test_capture_expansion() {
        let set = BiasSet::compile(&[BiasDescriptor::new(r"(\w+)fox").with_rewrite("$1 browser")], BiasMode::Catalog);
        let interpreted = interpret(&terms(&["firefox"]), &set);
        assert_eq!(interpreted.query, "fire browser");
    }

    #[test]
    fn test_inert_rules_never_fire() {
        let set = BiasSet::compile(&[BiasDescriptor::new("foo")], BiasMode::Catalog);
        let interpreted = interpret(&terms(&["foo"]), &set);
        assert_eq!(interpreted.query, "foo");
        assert!(interpreted.active.is_empty());
    }

    #[test]
    fn test_per_term_rewrites_whole_terms_only() {
        let set = BiasSet::compile(&[BiasDescriptor::new("fix").with_rewrite("repair")], BiasMode::System);
        let interpreted = interpret(&terms(&["fix", "prefix"]), &set);
        assert_eq!(interpreted.query, "repair prefix");
        assert_eq!(interpreted.active.len(), 1);
    }

    #[test]
    fn test_per_term_deduplicates_active_rules() {
        let set = BiasSet::compile(
            &[
                BiasDescriptor::new("a|b").with_boost_ids(["x"]).with_linear_boost(2.0, 0.0),
                BiasDescriptor::new("zzz").with_rewrite("q"),
                BiasDescriptor::new("b").with_rewrite("bee"),
            ],
            BiasMode::System,
        );
        let interpreted = interpret(&terms(&["a", "b", "b"]), &set);
        assert_eq!(interpreted.query, "a bee bee");
        assert_eq!(interpreted.active.len(), 2);
        assert!(interpreted.active[0].boost().is_some());
        assert_eq!(interpreted.active[1].rewrite(), Some("bee"));
    }
}
