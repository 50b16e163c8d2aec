//! Configuration for the incident process chain engine.
//!
//! Loaded from (in priority order):
//! 1. Environment variables (`CHAIN__` prefix, `__` nesting separator)
//! 2. Config file (`chain.toml`)
//! 3. Defaults (this module's [`Default`] impl)

use serde::Deserialize;

/// Recognized top-level configuration. Unknown keys in the source file or
/// environment are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Name of the alert search index (`alarm-index`).
    #[serde(default = "default_alarm_index")]
    pub alarm_index: String,

    /// Name of the raw-log search index (`log-index`).
    #[serde(default = "default_log_index")]
    pub log_index: String,

    /// Upward/downward traversal and depth-safety bound (`max-traversal-depth`).
    #[serde(default = "default_max_traversal_depth")]
    pub max_traversal_depth: usize,

    /// Output node cap before pruning kicks in (`max-node-count`).
    #[serde(default = "default_max_node_count")]
    pub max_node_count: usize,

    /// Sub-requests multiplexed into one batch call (`batch-query-size`).
    #[serde(default = "default_batch_query_size")]
    pub batch_query_size: usize,

    /// Default result-set size per query (`max-query-size`).
    #[serde(default = "default_max_query_size")]
    pub max_query_size: usize,
}

fn default_alarm_index() -> String {
    "edr-alarms".to_string()
}

fn default_log_index() -> String {
    "edr-logs".to_string()
}

fn default_max_traversal_depth() -> usize {
    50
}

fn default_max_node_count() -> usize {
    400
}

fn default_batch_query_size() -> usize {
    100
}

fn default_max_query_size() -> usize {
    10_000
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            alarm_index: default_alarm_index(),
            log_index: default_log_index(),
            max_traversal_depth: default_max_traversal_depth(),
            max_node_count: default_max_node_count(),
            batch_query_size: default_batch_query_size(),
            max_query_size: default_max_query_size(),
        }
    }
}

impl ChainConfig {
    /// Load configuration from `{file_prefix}.toml` plus `CHAIN__`-prefixed
    /// environment variables, falling back to defaults for anything unset.
    pub fn load(file_prefix: &str) -> crate::error::Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("CHAIN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::ChainError::Config(e.to_string()))?;

        // Layer parsed values over defaults rather than failing outright when
        // the file/env set nothing — `config` has no notion of our defaults.
        let mut parsed: Self = cfg
            .try_deserialize()
            .unwrap_or_else(|_| Self::default());
        if parsed.max_node_count == 0 {
            parsed.max_node_count = default_max_node_count();
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = ChainConfig::default();
        assert_eq!(cfg.max_traversal_depth, 50);
        assert_eq!(cfg.max_node_count, 400);
        assert_eq!(cfg.batch_query_size, 100);
        assert_eq!(cfg.max_query_size, 10_000);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let cfg = ChainConfig::load("nonexistent-chain-config-prefix").unwrap();
        assert_eq!(cfg.max_node_count, 400);
    }
}
