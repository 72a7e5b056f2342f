//! Per-index tuning.

use quarry_engine::{MergePolicyConfig, WriterConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const MB: f64 = 1024.0 * 1024.0;
/// Average document footprint used to turn a segment size cap into a
/// document count cap.
const ESTIMATED_DOC_BYTES: f64 = 1024.0;

/// Segment merge strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicyType {
    /// Merge segments of similar size, a few tiers at a time.
    Tiered,
    /// Merge by logarithmic size levels.
    LogByteSize,
    /// Never merge in the background.
    NoMerge,
}

/// Immutable tuning for one index.
///
/// Build with [`IndexSettings::builder`] or start from a preset.
///
/// ```rust
/// use quarry_core::IndexSettings;
/// use std::time::Duration;
///
/// let settings = IndexSettings::builder()
///     .ram_buffer_size_mb(64.0)
///     .refresh_interval(Duration::from_millis(500))
///     .auto_commit(false)
///     .build();
///
/// assert_eq!(settings.refresh_interval(), Duration::from_millis(500));
/// assert!(!settings.auto_commit());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    ram_buffer_size_mb: f64,
    max_buffered_docs: Option<usize>,
    use_compound_file: bool,
    merge_policy: MergePolicyType,
    merge_factor: usize,
    max_merged_segment_mb: f64,
    segments_per_tier: f64,
    max_merge_at_once: f64,
    refresh_interval: Duration,
    auto_refresh: bool,
    commit_interval: Duration,
    auto_commit: bool,
    max_thread_states: usize,
    custom: BTreeMap<String, serde_json::Value>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            ram_buffer_size_mb: 16.0,
            max_buffered_docs: None,
            use_compound_file: true,
            merge_policy: MergePolicyType::Tiered,
            merge_factor: 10,
            max_merged_segment_mb: 5120.0,
            segments_per_tier: 10.0,
            max_merge_at_once: 10.0,
            refresh_interval: Duration::from_secs(1),
            auto_refresh: true,
            commit_interval: Duration::from_secs(30),
            auto_commit: true,
            max_thread_states: 8,
            custom: BTreeMap::new(),
        }
    }
}

impl IndexSettings {
    /// Starts a builder from the defaults.
    #[must_use]
    pub fn builder() -> IndexSettingsBuilder {
        IndexSettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Large buffers, slow refresh, more threads.
    #[must_use]
    pub fn high_performance() -> Self {
        Self::builder()
            .ram_buffer_size_mb(256.0)
            .refresh_interval(Duration::from_secs(5))
            .max_thread_states(16)
            .merge_policy(MergePolicyType::Tiered)
            .max_merged_segment_mb(10240.0)
            .build()
    }

    /// Small buffers, fast refresh and commit.
    #[must_use]
    pub fn low_latency() -> Self {
        Self::builder()
            .ram_buffer_size_mb(32.0)
            .refresh_interval(Duration::from_millis(100))
            .auto_refresh(true)
            .auto_commit(true)
            .commit_interval(Duration::from_secs(5))
            .build()
    }

    /// Very large buffers, no background refresh or commit.
    #[must_use]
    pub fn bulk_indexing() -> Self {
        Self::builder()
            .ram_buffer_size_mb(512.0)
            .refresh_interval(Duration::from_secs(30))
            .auto_refresh(false)
            .auto_commit(false)
            .use_compound_file(false)
            .build()
    }

    /// Indexing memory budget in megabytes.
    pub fn ram_buffer_size_mb(&self) -> f64 {
        self.ram_buffer_size_mb
    }

    /// Document count that triggers a flush, if any.
    pub fn max_buffered_docs(&self) -> Option<usize> {
        self.max_buffered_docs
    }

    /// Whether compound segment files are requested.
    pub fn use_compound_file(&self) -> bool {
        self.use_compound_file
    }

    /// Merge strategy.
    pub fn merge_policy(&self) -> MergePolicyType {
        self.merge_policy
    }

    /// Merge factor of the log-byte-size policy.
    pub fn merge_factor(&self) -> usize {
        self.merge_factor
    }

    /// Largest segment produced by background merges, in megabytes.
    pub fn max_merged_segment_mb(&self) -> f64 {
        self.max_merged_segment_mb
    }

    /// Segments allowed per tier.
    pub fn segments_per_tier(&self) -> f64 {
        self.segments_per_tier
    }

    /// Segments merged at once.
    pub fn max_merge_at_once(&self) -> f64 {
        self.max_merge_at_once
    }

    /// Period of the background refresh.
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Whether background refresh runs.
    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    /// Period of the background commit.
    pub fn commit_interval(&self) -> Duration {
        self.commit_interval
    }

    /// Whether background commit runs.
    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Upper bound on indexing threads.
    pub fn max_thread_states(&self) -> usize {
        self.max_thread_states
    }

    /// Looks up a free-form setting.
    pub fn custom(&self, key: &str) -> Option<&serde_json::Value> {
        self.custom.get(key)
    }

    /// Every free-form setting.
    pub fn custom_settings(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.custom
    }

    /// Translates the settings into an engine writer configuration.
    pub fn writer_config(&self) -> WriterConfig {
        let max_docs_before_merge =
            (self.max_merged_segment_mb * MB / ESTIMATED_DOC_BYTES).max(1.0) as usize;
        let merge_policy = match self.merge_policy {
            MergePolicyType::Tiered => MergePolicyConfig::Log {
                min_num_segments: self.segments_per_tier.min(self.max_merge_at_once).max(2.0)
                    as usize,
                max_docs_before_merge,
            },
            MergePolicyType::LogByteSize => MergePolicyConfig::Log {
                min_num_segments: self.merge_factor.max(2),
                max_docs_before_merge,
            },
            MergePolicyType::NoMerge => MergePolicyConfig::NoMerge,
        };
        WriterConfig {
            memory_budget_bytes: (self.ram_buffer_size_mb * MB) as usize,
            max_threads: self.max_thread_states.max(1),
            max_buffered_docs: self.max_buffered_docs,
            use_compound_file: self.use_compound_file,
            merge_policy,
        }
    }
}

/// Builder for [`IndexSettings`].
#[derive(Debug, Clone)]
pub struct IndexSettingsBuilder {
    settings: IndexSettings,
}

impl IndexSettingsBuilder {
    /// Sets the indexing memory budget in megabytes.
    #[must_use]
    pub fn ram_buffer_size_mb(mut self, value: f64) -> Self {
        self.settings.ram_buffer_size_mb = value;
        self
    }

    /// Flushes after this many buffered documents. `None` disables it.
    #[must_use]
    pub fn max_buffered_docs(mut self, value: Option<usize>) -> Self {
        self.settings.max_buffered_docs = value;
        self
    }

    /// Requests compound segment files.
    #[must_use]
    pub fn use_compound_file(mut self, value: bool) -> Self {
        self.settings.use_compound_file = value;
        self
    }

    /// Sets the merge strategy.
    #[must_use]
    pub fn merge_policy(mut self, value: MergePolicyType) -> Self {
        self.settings.merge_policy = value;
        self
    }

    /// Sets the merge factor of the log-byte-size policy.
    #[must_use]
    pub fn merge_factor(mut self, value: usize) -> Self {
        self.settings.merge_factor = value;
        self
    }

    /// Caps background-merged segments, in megabytes.
    #[must_use]
    pub fn max_merged_segment_mb(mut self, value: f64) -> Self {
        self.settings.max_merged_segment_mb = value;
        self
    }

    /// Sets segments allowed per tier.
    #[must_use]
    pub fn segments_per_tier(mut self, value: f64) -> Self {
        self.settings.segments_per_tier = value;
        self
    }

    /// Sets segments merged at once.
    #[must_use]
    pub fn max_merge_at_once(mut self, value: f64) -> Self {
        self.settings.max_merge_at_once = value;
        self
    }

    /// Sets the background refresh period.
    #[must_use]
    pub fn refresh_interval(mut self, value: Duration) -> Self {
        self.settings.refresh_interval = value;
        self
    }

    /// Enables or disables background refresh.
    #[must_use]
    pub fn auto_refresh(mut self, value: bool) -> Self {
        self.settings.auto_refresh = value;
        self
    }

    /// Sets the background commit period.
    #[must_use]
    pub fn commit_interval(mut self, value: Duration) -> Self {
        self.settings.commit_interval = value;
        self
    }

    /// Enables or disables background commit.
    #[must_use]
    pub fn auto_commit(mut self, value: bool) -> Self {
        self.settings.auto_commit = value;
        self
    }

    /// Caps indexing threads.
    #[must_use]
    pub fn max_thread_states(mut self, value: usize) -> Self {
        self.settings.max_thread_states = value;
        self
    }

    /// Stores a free-form setting.
    #[must_use]
    pub fn custom(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.settings.custom.insert(key.into(), value.into());
        self
    }

    /// Finishes the settings.
    #[must_use]
    pub fn build(self) -> IndexSettings {
        self.settings
    }
}
