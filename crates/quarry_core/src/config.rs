//! Manager configuration.
//!
//! Values resolve in layers, later layers winning:
//!
//! 1. built-in defaults
//! 2. a property map (`index.base.path`, `index.max.indices`, ...)
//! 3. environment variables (`QUARRY_` plus the upper-snake key, e.g.
//!    `QUARRY_INDEX_BASE_PATH`)
//! 4. builder setters applied by the caller

use crate::error::ValidationError;
use crate::index::IndexOptions;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Property key for the storage root.
pub const BASE_PATH_KEY: &str = "index.base.path";
/// Property key for the maximum number of indices.
pub const MAX_INDICES_KEY: &str = "index.max.indices";
/// Property key for the largest number of hits one search may return.
pub const MAX_RESULT_WINDOW_KEY: &str = "search.max.result.window";
/// Property key enabling the slow operation log.
pub const SLOW_LOG_ENABLED_KEY: &str = "slowlog.enabled";
/// Property key for the slow log threshold, in milliseconds.
pub const SLOW_LOG_THRESHOLD_KEY: &str = "slowlog.threshold.ms";
/// Property key enabling discovery when the manager opens.
pub const DISCOVER_KEY: &str = "index.discover";

const ENV_PREFIX: &str = "QUARRY_";

/// Configuration for an [`IndexManager`](crate::IndexManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarryConfig {
    /// Directory holding one subdirectory per index.
    pub base_path: PathBuf,

    /// Upper bound on registered indices.
    pub max_indices: usize,

    /// Largest number of hits a single search may collect.
    pub max_result_window: usize,

    /// Whether slow indexing and search calls are logged.
    pub slow_log_enabled: bool,

    /// Duration at which a call counts as slow.
    pub slow_log_threshold: Duration,

    /// Whether existing index directories are opened with the manager.
    pub discover_on_open: bool,
}

impl Default for QuarryConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("data/indices"),
            max_indices: 1000,
            max_result_window: 10_000,
            slow_log_enabled: true,
            slow_log_threshold: Duration::from_millis(5000),
            discover_on_open: true,
        }
    }
}

impl QuarryConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `properties`, then with `QUARRY_*` variables.
    ///
    /// # Errors
    ///
    /// Fails if a present value does not parse.
    pub fn resolve(properties: &HashMap<String, String>) -> Result<Self, ValidationError> {
        Self::from_sources(properties, |key| std::env::var(key).ok())
    }

    /// Defaults overlaid with `properties` only.
    ///
    /// # Errors
    ///
    /// Fails if a present value does not parse.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, ValidationError> {
        Self::from_sources(properties, |_| None)
    }

    /// Defaults overlaid with `QUARRY_*` variables only.
    ///
    /// # Errors
    ///
    /// Fails if a present value does not parse.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::resolve(&HashMap::new())
    }

    fn from_sources(
        properties: &HashMap<String, String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ValidationError> {
        let lookup = |key: &str| env(&env_key(key)).or_else(|| properties.get(key).cloned());
        let mut config = Self::default();

        if let Some(path) = lookup(BASE_PATH_KEY) {
            config.base_path = PathBuf::from(path);
        }
        if let Some(value) = lookup(MAX_INDICES_KEY) {
            config.max_indices = parse(MAX_INDICES_KEY, &value)?;
        }
        if let Some(value) = lookup(MAX_RESULT_WINDOW_KEY) {
            config.max_result_window = parse(MAX_RESULT_WINDOW_KEY, &value)?;
        }
        if let Some(value) = lookup(SLOW_LOG_ENABLED_KEY) {
            config.slow_log_enabled = parse(SLOW_LOG_ENABLED_KEY, &value)?;
        }
        if let Some(value) = lookup(SLOW_LOG_THRESHOLD_KEY) {
            config.slow_log_threshold =
                Duration::from_millis(parse(SLOW_LOG_THRESHOLD_KEY, &value)?);
        }
        if let Some(value) = lookup(DISCOVER_KEY) {
            config.discover_on_open = parse(DISCOVER_KEY, &value)?;
        }
        Ok(config)
    }

    /// Sets the storage root.
    #[must_use]
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = path.into();
        self
    }

    /// Sets the maximum number of indices.
    #[must_use]
    pub const fn max_indices(mut self, max: usize) -> Self {
        self.max_indices = max;
        self
    }

    /// Sets the maximum result window.
    #[must_use]
    pub const fn max_result_window(mut self, max: usize) -> Self {
        self.max_result_window = max;
        self
    }

    /// Enables or disables the slow log.
    #[must_use]
    pub const fn slow_log_enabled(mut self, enabled: bool) -> Self {
        self.slow_log_enabled = enabled;
        self
    }

    /// Sets the slow log threshold.
    #[must_use]
    pub const fn slow_log_threshold(mut self, threshold: Duration) -> Self {
        self.slow_log_threshold = threshold;
        self
    }

    /// Enables or disables discovery on open.
    #[must_use]
    pub const fn discover_on_open(mut self, discover: bool) -> Self {
        self.discover_on_open = discover;
        self
    }

    pub(crate) fn index_options(&self) -> IndexOptions {
        IndexOptions {
            max_result_window: self.max_result_window,
            slow_log_threshold: self.slow_log_enabled.then_some(self.slow_log_threshold),
        }
    }
}

/// `index.base.path` -> `QUARRY_INDEX_BASE_PATH`.
fn env_key(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.replace('.', "_").to_ascii_uppercase())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ValidationError> {
    value
        .trim()
        .parse()
        .map_err(|_| ValidationError::invalid_argument(format!("{key}: cannot parse '{value}'")))
}
