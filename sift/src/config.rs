//! Engine and bias configuration, loaded from JSON.

use crate::bias::{BiasDescriptor, BiasMode};
use crate::interface::SiftResult;
use crate::shard::DEFAULT_SHARD_MIN_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads; `None` uses the available parallelism
    pub workers: Option<usize>,
    pub shard_min_size: usize,
    pub bias_mode: BiasMode,
    /// Run workers at minimum thread priority so UI threads can preempt them
    pub low_priority_workers: bool,
    pub thread_name_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: None,
            shard_min_size: DEFAULT_SHARD_MIN_SIZE,
            bias_mode: BiasMode::Catalog,
            low_priority_workers: true,
            thread_name_prefix: "sift-worker".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn worker_count(&self) -> usize {
        self.workers.filter(|&n| n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

/// Full search configuration: engine settings plus both bias layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub engine: EngineConfig,
    /// User-configured rules; these take precedence over the builtin ones
    pub biases: Vec<BiasDescriptor>,
    pub builtin_biases: Vec<BiasDescriptor>,
}

impl SearchConfig {
    pub fn from_json_str(json: &str) -> SiftResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SiftResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// User rules first, then builtin rules.
    pub fn bias_descriptors(&self) -> Vec<BiasDescriptor> {
        self.biases.iter().chain(&self.builtin_biases).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::from_json_str("{}").unwrap();
        assert_eq!(config.engine.shard_min_size, 512);
        assert_eq!(config.engine.bias_mode, BiasMode::Catalog);
        assert!(config.engine.worker_count() >= 1);
        assert!(config.bias_descriptors().is_empty());
    }

    #[test]
    fn test_zero_workers_falls_back() {
        let config = EngineConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert!(config.worker_count() >= 1);
        let config = EngineConfig {
            workers: Some(3),
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 3);
    }

    #[test]
    fn test_user_biases_come_first() {
        let config = SearchConfig::from_json_str(
            r#"{
                "engine": {"bias_mode": "system", "workers": 2},
                "biases": [{"pattern": "user", "rewrite": "u"}],
                "builtin_biases": [{"pattern": "builtin", "rewrite": "b"}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.engine.bias_mode, BiasMode::System);
        let patterns: Vec<Option<String>> = config.bias_descriptors().into_iter().map(|d| d.pattern).collect();
        assert_eq!(patterns, vec![Some("user".to_string()), Some("builtin".to_string())]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"engine": {{"shard_min_size": 64}}}}"#).unwrap();
        let config = SearchConfig::load(file.path()).unwrap();
        assert_eq!(config.engine.shard_min_size, 64);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = SearchConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, crate::interface::SiftError::Config(_)));
    }
}
