//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (BYTELOG_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [engine]
//! max_passes = 10000
//! register_count = 16
//!
//! [wat]
//! memory_headroom_pages = 1
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! BYTELOG_ENGINE__MAX_PASSES=5000
//! BYTELOG_LOGGING__LEVEL=debug
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level configuration for a `bytelog` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub wat: WatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fixpoint evaluator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Safety cap on SOLVE passes before the engine reports non-convergence.
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,

    /// Width of the per-rule register file. Rules needing more registers
    /// than this fail with `RegisterFileExhausted`.
    #[serde(default = "default_register_count")]
    pub register_count: usize,
}

/// WAT code generation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatConfig {
    /// Extra 64KiB pages reserved beyond the computed fact-storage size.
    #[serde(default = "default_memory_headroom_pages")]
    pub memory_headroom_pages: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_max_passes() -> u32 {
    10_000
}
fn default_register_count() -> usize {
    16
}
fn default_memory_headroom_pages() -> u32 {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Loads configuration from default locations, merging in order:
    /// 1. `config.toml` (base configuration)
    /// 2. `config.local.toml` (local overrides, git-ignored)
    /// 3. Environment variables (`BYTELOG_*` prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("BYTELOG_").split("__"))
            .extract()
    }

    /// Loads configuration from a specific file path, still allowing
    /// environment overrides.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("BYTELOG_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            engine: EngineConfig::default(),
            wat: WatConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_passes: default_max_passes(),
            register_count: default_register_count(),
        }
    }
}

impl Default for WatConfig {
    fn default() -> Self {
        WatConfig {
            memory_headroom_pages: default_memory_headroom_pages(),
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
    fn default_config_matches_documented_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.max_passes, 10_000);
        assert_eq!(config.engine.register_count, 16);
        assert_eq!(config.wat.memory_headroom_pages, 1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn config_serializes_expected_sections() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[wat]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn from_file_overlays_on_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[engine]\nmax_passes = 5\n").unwrap();
        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.engine.max_passes, 5);
        assert_eq!(config.engine.register_count, 16);
    }
}
