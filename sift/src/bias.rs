//! Bias rules: pattern-triggered query rewrites and score boosts.
//!
//! Raw descriptors come from configuration and are compiled once when the rule
//! list changes. A descriptor that fails validation compiles to
//! `CompiledBias::Inert` so positions in the list stay stable and one bad rule
//! never takes the rest down with it.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// How bias patterns are matched against queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasMode {
    /// Unanchored patterns tested against the whole joined query.
    #[default]
    Catalog,
    /// Whole-string patterns tested against each query term on its own.
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearBoost {
    pub slope: f64,
    #[serde(default)]
    pub intercept: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialBoost {
    pub factor: f64,
    #[serde(default)]
    pub intercept: f64,
}

/// A bias rule as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasDescriptor {
    #[serde(alias = "regex")]
    pub pattern: Option<String>,
    /// Replacement for the matched text; supports `$1` / `${name}` expansion.
    /// GLib-style `\1` / `\g<name>` references are not expanded and stay literal,
    /// and a literal `$` must be written `$$`.
    #[serde(alias = "convert_to")]
    pub rewrite: Option<String>,
    #[serde(alias = "boost_appids")]
    pub boost_ids: Option<Vec<String>>,
    pub linear_boost: Option<LinearBoost>,
    pub exponential_boost: Option<ExponentialBoost>,
}

impl BiasDescriptor {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Default::default()
        }
    }

    pub fn with_rewrite(mut self, rewrite: impl Into<String>) -> Self {
        self.rewrite = Some(rewrite.into());
        self
    }

    pub fn with_boost_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.boost_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_linear_boost(mut self, slope: f64, intercept: f64) -> Self {
        self.linear_boost = Some(LinearBoost { slope, intercept });
        self
    }

    pub fn with_exponential_boost(mut self, factor: f64, intercept: f64) -> Self {
        self.exponential_boost = Some(ExponentialBoost { factor, intercept });
        self
    }
}

/// Why a descriptor was neutralized
#[derive(Debug, Error)]
pub enum BiasError {
    #[error("bias has no pattern")]
    MissingPattern,
    #[error("bias \"{0}\" has neither a rewrite nor a boost set with a boost function")]
    Incomplete(String),
    #[error("bias \"{0}\" can only have one boost function")]
    ConflictingBoost(String),
    #[error("bias pattern \"{pattern}\" is invalid: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Score transform applied to boosted candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoostFunction {
    Linear { slope: f64, intercept: f64 },
    Exponential { factor: f64, intercept: f64 },
}

impl BoostFunction {
    pub fn apply(self, score: f64) -> f64 {
        match self {
            BoostFunction::Linear { slope, intercept } => slope * score + intercept,
            BoostFunction::Exponential { factor, intercept } => factor.powf(score) + intercept,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Boost {
    ids: HashSet<String>,
    function: BoostFunction,
}

impl Boost {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn function(&self) -> BoostFunction {
        self.function
    }
}

/// A validated, compiled bias rule.
#[derive(Debug)]
pub struct BiasRule {
    regex: Regex,
    rewrite: Option<String>,
    boost: Option<Boost>,
}

impl BiasRule {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn rewrite(&self) -> Option<&str> {
        self.rewrite.as_deref()
    }

    pub fn boost(&self) -> Option<&Boost> {
        self.boost.as_ref()
    }
}

/// Slot in the compiled rule list.
#[derive(Debug, Clone)]
pub enum CompiledBias {
    Inert,
    Active(Arc<BiasRule>),
}

impl CompiledBias {
    pub fn rule(&self) -> Option<&Arc<BiasRule>> {
        match self {
            CompiledBias::Inert => None,
            CompiledBias::Active(rule) => Some(rule),
        }
    }

    pub fn is_inert(&self) -> bool {
        matches!(self, CompiledBias::Inert)
    }
}

/// Validate and compile one descriptor.
pub fn compile_bias(descriptor: &BiasDescriptor, mode: BiasMode) -> Result<BiasRule, BiasError> {
    let pattern = descriptor.pattern.as_deref().ok_or(BiasError::MissingPattern)?;

    let ids: HashSet<String> = descriptor
        .boost_ids
        .iter()
        .flatten()
        .cloned()
        .collect();
    let function = match (descriptor.linear_boost, descriptor.exponential_boost) {
        (Some(_), Some(_)) => return Err(BiasError::ConflictingBoost(pattern.to_string())),
        (Some(LinearBoost { slope, intercept }), None) => Some(BoostFunction::Linear { slope, intercept }),
        (None, Some(ExponentialBoost { factor, intercept })) => {
            Some(BoostFunction::Exponential { factor, intercept })
        }
        (None, None) => None,
    };

    let boost = match function {
        Some(function) if !ids.is_empty() => Some(Boost { ids, function }),
        Some(_) => {
            tracing::warn!(pattern, "bias has a boost function but no boost ids; ignoring the boost");
            None
        }
        None if !ids.is_empty() => {
            tracing::warn!(pattern, "bias has boost ids but no boost function; ignoring the boost");
            None
        }
        None => None,
    };

    if descriptor.rewrite.is_none() && boost.is_none() {
        return Err(BiasError::Incomplete(pattern.to_string()));
    }

    let source = match mode {
        BiasMode::Catalog => pattern.to_string(),
        BiasMode::System => format!("^(?:{pattern})$"),
    };
    let regex = Regex::new(&source).map_err(|source| BiasError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    Ok(BiasRule {
        regex,
        rewrite: descriptor.rewrite.clone(),
        boost,
    })
}

/// Compile a descriptor, logging and neutralizing it on failure.
pub fn compile_or_neutralize(descriptor: &BiasDescriptor, mode: BiasMode) -> CompiledBias {
    match compile_bias(descriptor, mode) {
        Ok(rule) => CompiledBias::Active(Arc::new(rule)),
        Err(e) => {
            tracing::error!("{e}; skipping");
            CompiledBias::Inert
        }
    }
}

/// Ordered list of compiled biases, one slot per descriptor.
#[derive(Debug, Clone, Default)]
pub struct BiasSet {
    mode: BiasMode,
    slots: Vec<CompiledBias>,
}

impl BiasSet {
    pub fn new(mode: BiasMode) -> Self {
        Self {
            mode,
            slots: Vec::new(),
        }
    }

    pub fn compile(descriptors: &[BiasDescriptor], mode: BiasMode) -> Self {
        Self {
            mode,
            slots: descriptors.iter().map(|d| compile_or_neutralize(d, mode)).collect(),
        }
    }

    /// Remove `removed` slots at `position` and compile `added` in their place.
    /// Out-of-range positions and counts are clamped.
    pub fn splice(&mut self, position: usize, removed: usize, added: &[BiasDescriptor]) {
        let position = position.min(self.slots.len());
        let end = position.saturating_add(removed).min(self.slots.len());
        let mode = self.mode;
        self.slots
            .splice(position..end, added.iter().map(|d| compile_or_neutralize(d, mode)));
    }

    pub fn mode(&self) -> BiasMode {
        self.mode
    }

    pub fn slots(&self) -> &[CompiledBias] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Active rules in list order, with their slot positions.
    pub fn active(&self) -> impl Iterator<Item = (usize, &Arc<BiasRule>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.rule().map(|rule| (i, rule)))
    }
}
