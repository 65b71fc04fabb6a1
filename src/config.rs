//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - arraylang.toml (default configuration)
//! - arraylang.local.toml (git-ignored local overrides)
//! - Environment variables (ARRAYLANG_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # arraylang.toml
//! [prover]
//! max_subgraph_size = 2
//! simplify_iterations = 10
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! ARRAYLANG_PROVER__SIMPLIFY_ITERATIONS=20
//! ARRAYLANG_LOGGING__LEVEL=trace
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub prover: ProverConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Prover tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverConfig {
    /// Largest dependency subgraph the joint proof will attempt
    #[serde(default = "default_max_subgraph_size")]
    pub max_subgraph_size: usize,

    /// Fixpoint cap for the simplifier
    #[serde(default = "default_simplify_iterations")]
    pub simplify_iterations: usize,

    /// Verbosity of prover debug traces
    #[serde(default = "default_trace_verbosity")]
    pub trace_verbosity: u8,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_max_subgraph_size() -> usize {
    2
}
fn default_simplify_iterations() -> usize {
    10
}
fn default_trace_verbosity() -> u8 {
    5
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. arraylang.toml (base configuration)
    /// 2. arraylang.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (ARRAYLANG_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("arraylang.toml"))
            .merge(Toml::file("arraylang.local.toml"))
            .merge(Env::prefixed("ARRAYLANG_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("ARRAYLANG_").split("__"))
            .extract()
    }
}

impl Default for ProverConfig {
    fn default() -> Self {
        ProverConfig {
            max_subgraph_size: default_max_subgraph_size(),
            simplify_iterations: default_simplify_iterations(),
            trace_verbosity: default_trace_verbosity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.prover.max_subgraph_size, 2);
        assert_eq!(config.prover.simplify_iterations, 10);
        assert_eq!(config.prover.trace_verbosity, 5);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Verify it contains expected sections
        assert!(toml_str.contains("[prover]"));
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("max_subgraph_size"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.prover.max_subgraph_size, config.prover.max_subgraph_size);
        assert_eq!(parsed.logging.level, config.logging.level);
    }
}
