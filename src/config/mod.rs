// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::cache::{CacheConfig, KeyPolicy};
use crate::error::{EventForgeError, Result};
use crate::policy::{profile_for, CostMode};
use crate::utils::retry::RetryPolicy;
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest, prefix `EVENTFORGE__`)
    /// 2. Config file (`~/.eventforge/config.toml`)
    /// 3. Defaults (lowest)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(&Self::default_config_path()))
    }

    /// Same as [`AppConfig::load`] but reads the given file instead of the
    /// default location. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            // Load from config file if it exists
            .add_source(File::from(path).required(false))
            // Override with environment variables, e.g. EVENTFORGE__CACHE__CAPACITY
            .add_source(
                Environment::with_prefix("EVENTFORGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| EventForgeError::Config(e.to_string()))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| EventForgeError::Config(e.to_string()))?;

        // Fail at startup rather than on the first request
        config.default_mode()?;
        Ok(config)
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".eventforge")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }

    /// The configured default cost mode.
    pub fn default_mode(&self) -> Result<CostMode> {
        profile_for(&self.generation.default_mode).map(|profile| profile.mode)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            capacity: self.cache.capacity,
            ttl: Duration::from_secs(self.cache.ttl_seconds),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            // NaN or infinite ratios from env overrides disable jitter
            jitter_ratio: if self.retry.jitter_ratio.is_finite() {
                self.retry.jitter_ratio.max(0.0)
            } else {
                0.0
            },
        }
    }

    pub fn key_policy(&self) -> KeyPolicy {
        KeyPolicy {
            include_cost_mode: self.generation.mode_in_cache_key,
        }
    }
}
