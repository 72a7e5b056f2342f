//! Descriptive record of an index.

use super::settings::IndexSettings;
use super::state::IndexState;
use crate::error::{IndexError, IndexResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Point-in-time copy of an index's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    /// Index name.
    pub index_name: String,
    /// Random identifier assigned at construction.
    pub index_uuid: Uuid,
    /// Creation time in epoch milliseconds.
    pub creation_date: i64,
    /// Incremented on every mutation.
    pub version: u64,
    /// Lifecycle state.
    pub state: IndexState,
    /// Settings in effect.
    pub settings: IndexSettings,
    /// Free-form mappings keyed by type.
    pub mappings: BTreeMap<String, serde_json::Value>,
    /// Aliases with their optional filter.
    pub aliases: BTreeMap<String, Option<String>>,
    /// Last mutation time in epoch milliseconds.
    pub last_modified: i64,
    /// Live documents at the last commit.
    pub document_count: u64,
    /// On-disk size at the last commit.
    pub size_in_bytes: u64,
    /// Storage directory.
    pub primary_location: Option<PathBuf>,
    /// Free-form attributes.
    pub custom: BTreeMap<String, serde_json::Value>,
}

impl MetadataSnapshot {
    /// Open or closed.
    pub fn is_healthy(&self) -> bool {
        matches!(self.state, IndexState::Open | IndexState::Closed)
    }

    /// Serializes the snapshot to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Fails only if a custom value cannot be represented as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Versioned, internally synchronized metadata of one index.
///
/// Every setter refreshes `last_modified` and bumps `version`. Once the
/// state reaches [`IndexState::Deleting`] it can no longer change.
#[derive(Debug)]
pub struct IndexMetadata {
    inner: RwLock<MetadataSnapshot>,
}

impl IndexMetadata {
    /// Creates metadata for a new index in the `Creating` state.
    pub fn new(index_name: impl Into<String>, settings: Arc<IndexSettings>) -> Self {
        let now = now_millis();
        Self {
            inner: RwLock::new(MetadataSnapshot {
                index_name: index_name.into(),
                index_uuid: Uuid::new_v4(),
                creation_date: now,
                version: 1,
                state: IndexState::Creating,
                settings: IndexSettings::clone(&settings),
                mappings: BTreeMap::new(),
                aliases: BTreeMap::new(),
                last_modified: now,
                document_count: 0,
                size_in_bytes: 0,
                primary_location: None,
                custom: BTreeMap::new(),
            }),
        }
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut MetadataSnapshot) -> R) -> R {
        let mut inner = self.inner.write();
        let out = f(&mut inner);
        inner.version += 1;
        inner.last_modified = now_millis();
        out
    }

    /// Index name.
    pub fn index_name(&self) -> String {
        self.inner.read().index_name.clone()
    }

    /// Random identifier assigned at construction.
    pub fn index_uuid(&self) -> Uuid {
        self.inner.read().index_uuid
    }

    /// Current state.
    pub fn state(&self) -> IndexState {
        self.inner.read().state
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    /// Live documents at the last commit.
    pub fn document_count(&self) -> u64 {
        self.inner.read().document_count
    }

    /// On-disk size at the last commit.
    pub fn size_in_bytes(&self) -> u64 {
        self.inner.read().size_in_bytes
    }

    /// Time since creation.
    pub fn age(&self) -> Duration {
        let elapsed = now_millis().saturating_sub(self.inner.read().creation_date);
        Duration::from_millis(u64::try_from(elapsed).unwrap_or(0))
    }

    /// Open or closed.
    pub fn is_healthy(&self) -> bool {
        self.inner.read().is_healthy()
    }

    /// Records a state transition.
    ///
    /// # Errors
    ///
    /// Fails if the index is already being deleted.
    pub fn set_state(&self, state: IndexState) -> IndexResult<()> {
        let mut inner = self.inner.write();
        if inner.state.is_terminal() {
            return Err(IndexError::invalid_state(
                inner.index_name.clone(),
                inner.state,
                "change state of",
            ));
        }
        inner.state = state;
        inner.version += 1;
        inner.last_modified = now_millis();
        Ok(())
    }

    /// Records document count and size after a commit.
    pub fn update_counts(&self, document_count: u64, size_in_bytes: u64) {
        self.mutate(|m| {
            m.document_count = document_count;
            m.size_in_bytes = size_in_bytes;
        });
    }

    /// Adds or replaces a mapping.
    pub fn put_mapping(&self, key: impl Into<String>, mapping: serde_json::Value) {
        self.mutate(|m| m.mappings.insert(key.into(), mapping));
    }

    /// Adds an alias with an optional filter.
    pub fn add_alias(&self, alias: impl Into<String>, filter: Option<String>) {
        self.mutate(|m| m.aliases.insert(alias.into(), filter));
    }

    /// Removes an alias.
    pub fn remove_alias(&self, alias: &str) {
        self.mutate(|m| m.aliases.remove(alias));
    }

    /// Replaces the settings recorded in the metadata.
    pub fn update_settings(&self, settings: &IndexSettings) {
        self.mutate(|m| m.settings = settings.clone());
    }

    /// Adds or replaces a custom attribute.
    pub fn put_custom(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.mutate(|m| m.custom.insert(key.into(), value.into()));
    }

    /// Records the storage directory.
    pub fn set_primary_location(&self, location: &Path) {
        self.mutate(|m| m.primary_location = Some(location.to_path_buf()));
    }

    /// Copies the current metadata.
    pub fn snapshot(&self) -> MetadataSnapshot {
        self.inner.read().clone()
    }
}
