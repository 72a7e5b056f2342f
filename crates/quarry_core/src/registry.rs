//! In-memory directory of live indices and their aliases.

use crate::error::{IndexError, IndexResult};
use crate::index::{Index, IndexOptions, IndexSettings, IndexState};
use crate::naming::{glob_matches, validate_index_name};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Aggregated statistics over every registered index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterStats {
    /// Registered indices.
    pub total_indices: usize,
    /// Indices in the `Open` state.
    pub open_indices: usize,
    /// Indices in the `Closed` state.
    pub closed_indices: usize,
    /// Indices in the `Failed` state.
    pub failed_indices: usize,
    /// Distinct aliases.
    pub total_aliases: usize,
    /// Live documents at each index's last commit.
    pub total_docs: u64,
    /// On-disk size at each index's last commit.
    pub total_size_bytes: u64,
}

impl fmt::Display for ClusterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "indices={} (open={}, closed={}, failed={}) aliases={} docs={} size={} bytes",
            self.total_indices,
            self.open_indices,
            self.closed_indices,
            self.failed_indices,
            self.total_aliases,
            self.total_docs,
            self.total_size_bytes
        )
    }
}

#[derive(Default)]
struct Inner {
    indices: BTreeMap<String, Arc<Index>>,
    aliases: BTreeMap<String, BTreeSet<String>>,
}

/// Thread-safe name and alias lookup for indices under one base path.
pub struct IndexRegistry {
    base_path: PathBuf,
    options: IndexOptions,
    inner: RwLock<Inner>,
}

impl IndexRegistry {
    pub(crate) fn new(base_path: PathBuf, options: IndexOptions) -> Self {
        Self {
            base_path,
            options,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Root directory holding one subdirectory per index.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub(crate) fn options(&self) -> IndexOptions {
        self.options
    }

    /// Directory an index named `name` lives in.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Adds an index.
    ///
    /// # Errors
    ///
    /// Fails if an index with the same name is registered.
    pub fn register(&self, index: Arc<Index>) -> IndexResult<()> {
        let mut inner = self.inner.write();
        if inner.indices.contains_key(index.name()) {
            return Err(IndexError::already_exists(index.name()));
        }
        inner.indices.insert(index.name().to_string(), index);
        Ok(())
    }

    /// Removes an index and every alias mapping to it.
    pub fn unregister(&self, name: &str) -> Option<Arc<Index>> {
        let mut inner = self.inner.write();
        let index = inner.indices.remove(name)?;
        for members in inner.aliases.values_mut() {
            members.remove(name);
        }
        inner.aliases.retain(|_, members| !members.is_empty());
        Some(index)
    }

    /// Looks an index up by name, then by alias.
    ///
    /// # Errors
    ///
    /// `NotFound` if neither matches, `AmbiguousAlias` if the alias names
    /// several indices.
    pub fn get(&self, name: &str) -> IndexResult<Arc<Index>> {
        let inner = self.inner.read();
        if let Some(index) = inner.indices.get(name) {
            return Ok(Arc::clone(index));
        }
        let members = inner
            .aliases
            .get(name)
            .ok_or_else(|| IndexError::not_found(name))?;
        let mut iter = members.iter();
        match (iter.next(), iter.next()) {
            (Some(only), None) => inner
                .indices
                .get(only)
                .cloned()
                .ok_or_else(|| IndexError::not_found(name)),
            (Some(_), Some(_)) => Err(IndexError::AmbiguousAlias {
                alias: name.to_string(),
                indices: members.iter().cloned().collect(),
            }),
            (None, _) => Err(IndexError::not_found(name)),
        }
    }

    /// Returns true if `name` is a registered index or alias.
    pub fn contains(&self, name: &str) -> bool {
        let inner = self.inner.read();
        inner.indices.contains_key(name) || inner.aliases.contains_key(name)
    }

    /// Registered index names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.inner.read().indices.keys().cloned().collect()
    }

    /// Every registered index, sorted by name.
    pub fn all(&self) -> Vec<Arc<Index>> {
        self.inner.read().indices.values().cloned().collect()
    }

    /// Indices whose whole name matches `pattern`, where `*` matches any run.
    pub fn indices_by_pattern(&self, pattern: &str) -> Vec<Arc<Index>> {
        self.inner
            .read()
            .indices
            .iter()
            .filter(|(name, _)| glob_matches(pattern, name))
            .map(|(_, index)| Arc::clone(index))
            .collect()
    }

    /// Number of registered indices.
    pub fn len(&self) -> usize {
        self.inner.read().indices.len()
    }

    /// Returns true if no index is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().indices.is_empty()
    }

    /// Registers and opens every index directory under the base path that is
    /// not registered yet. Returns the discovered names.
    ///
    /// Hidden entries and names that fail validation are skipped. A
    /// directory that fails to open stays registered in the `Failed` state.
    pub fn discover(&self) -> IndexResult<Vec<String>> {
        if !self.base_path.is_dir() {
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') || self.inner.read().indices.contains_key(&name) {
                continue;
            }
            if let Err(e) = validate_index_name(&name) {
                warn!(directory = %name, error = %e, "skipping directory with invalid index name");
                continue;
            }
            candidates.push(name);
        }
        candidates.sort();

        let settings = Arc::new(IndexSettings::default());
        let mut discovered = Vec::with_capacity(candidates.len());
        for name in candidates {
            let index = Arc::new(Index::closed(
                name.clone(),
                self.path_for(&name),
                Arc::clone(&settings),
                self.options,
            ));
            let opened = index.mark_recovering().and_then(|()| index.open());
            if let Err(e) = opened {
                warn!(index = %name, error = %e, "failed to open discovered index");
            }
            if self.register(index).is_ok() {
                info!(index = %name, "discovered index");
                discovered.push(name);
            }
        }
        Ok(discovered)
    }

    /// Points `alias` at `index` in addition to any current targets.
    ///
    /// # Errors
    ///
    /// Fails if `index` is not registered, or if `alias` is invalid or
    /// already an index name.
    pub fn add_alias(&self, alias: &str, index: &str) -> IndexResult<()> {
        validate_index_name(alias)?;
        let mut inner = self.inner.write();
        if inner.indices.contains_key(alias) {
            return Err(IndexError::already_exists(alias));
        }
        let target = inner
            .indices
            .get(index)
            .cloned()
            .ok_or_else(|| IndexError::not_found(index))?;
        inner
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
        target.metadata().add_alias(alias, None);
        Ok(())
    }

    /// Removes `alias` from `index`. Returns false if it was not set.
    ///
    /// # Errors
    ///
    /// Fails if `index` is not registered.
    pub fn remove_alias(&self, alias: &str, index: &str) -> IndexResult<bool> {
        let mut inner = self.inner.write();
        let target = inner
            .indices
            .get(index)
            .cloned()
            .ok_or_else(|| IndexError::not_found(index))?;
        let removed = match inner.aliases.get_mut(alias) {
            Some(members) => {
                let removed = members.remove(index);
                if members.is_empty() {
                    inner.aliases.remove(alias);
                }
                removed
            }
            None => false,
        };
        target.metadata().remove_alias(alias);
        Ok(removed)
    }

    /// Moves `alias` from `from` to `to`.
    ///
    /// The removal and the addition are separate steps: a concurrent lookup
    /// may find the alias unset in between.
    pub fn swap_alias(&self, alias: &str, from: &str, to: &str) -> IndexResult<()> {
        self.swap_alias_observed(alias, from, to, || {})
    }

    /// [`swap_alias`](Self::swap_alias) running `between` after the removal.
    pub(crate) fn swap_alias_observed(
        &self,
        alias: &str,
        from: &str,
        to: &str,
        between: impl FnOnce(),
    ) -> IndexResult<()> {
        for name in [from, to] {
            if !self.inner.read().indices.contains_key(name) {
                return Err(IndexError::not_found(name));
            }
        }
        self.remove_alias(alias, from)?;
        between();
        self.add_alias(alias, to)
    }

    /// Indices `alias` points at, sorted.
    pub fn indices_for_alias(&self, alias: &str) -> Vec<String> {
        self.inner
            .read()
            .aliases
            .get(alias)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every alias with its indices.
    pub fn aliases(&self) -> BTreeMap<String, Vec<String>> {
        self.inner
            .read()
            .aliases
            .iter()
            .map(|(alias, members)| (alias.clone(), members.iter().cloned().collect()))
            .collect()
    }

    /// Closes every index, collecting failures.
    pub fn close_all(&self) -> IndexResult<()> {
        let failures: Vec<IndexError> = self
            .all()
            .iter()
            .filter_map(|index| index.close().err())
            .collect();
        IndexError::collect("failed to close some indices", failures)
    }

    /// Aggregates state counts and committed totals.
    pub fn stats(&self) -> ClusterStats {
        let inner = self.inner.read();
        let mut stats = ClusterStats {
            total_indices: inner.indices.len(),
            total_aliases: inner.aliases.len(),
            ..ClusterStats::default()
        };
        for index in inner.indices.values() {
            match index.state() {
                IndexState::Open => stats.open_indices += 1,
                IndexState::Closed => stats.closed_indices += 1,
                IndexState::Failed => stats.failed_indices += 1,
                _ => {}
            }
            stats.total_docs += index.stats().total_docs();
            stats.total_size_bytes += index.stats().store_size_in_bytes();
        }
        stats
    }
}

impl fmt::Debug for IndexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("IndexRegistry")
            .field("base_path", &self.base_path)
            .field("indices", &inner.indices.len())
            .field("aliases", &inner.aliases.len())
            .finish()
    }
}
