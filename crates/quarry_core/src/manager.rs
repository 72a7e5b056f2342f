//! The entry point for index management.

use crate::config::QuarryConfig;
use crate::data_dir::{remove_on_error, remove_tree, DataDir};
use crate::error::{IndexError, IndexResult};
use crate::index::{Index, IndexSettings, MetadataSnapshot, StatsSnapshot};
use crate::naming::validate_index_name;
use crate::registry::{ClusterStats, IndexRegistry};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Creates, opens, closes and deletes indices under one storage root.
///
/// Structural operations (create, delete, open, close, alias changes) are
/// serialized by a manager-wide lock; lookups and per-index operations
/// share it. Only one manager may own a storage root at a time.
///
/// # Example
///
/// ```rust,no_run
/// use quarry_core::{Document, IndexManager, IndexSettings, QuarryConfig};
///
/// let manager = IndexManager::open(QuarryConfig::new().base_path("data/indices"))?;
/// let index = manager.create_index("articles", IndexSettings::default())?;
/// index.add_document(&Document::new("1").with_text("title", "Hello"))?;
/// manager.refresh_index("articles")?;
/// manager.close()?;
/// # Ok::<(), quarry_core::IndexError>(())
/// ```
pub struct IndexManager {
    config: QuarryConfig,
    registry: IndexRegistry,
    lock: RwLock<()>,
    closed: AtomicBool,
    // Declared last so the root stays locked until every index is dropped.
    data_dir: DataDir,
}

impl IndexManager {
    /// Locks the storage root and, if configured, opens the indices found
    /// in it.
    ///
    /// # Errors
    ///
    /// `ManagerLocked` if another manager owns the root, or an I/O error.
    pub fn open(config: QuarryConfig) -> IndexResult<Self> {
        let data_dir = DataDir::open(&config.base_path)?;
        let registry = IndexRegistry::new(data_dir.path().to_path_buf(), config.index_options());
        if config.discover_on_open {
            let discovered = registry.discover()?;
            info!(
                base_path = %data_dir.path().display(),
                indices = discovered.len(),
                "discovered indices"
            );
        }
        Ok(Self {
            config,
            registry,
            lock: RwLock::new(()),
            closed: AtomicBool::new(false),
            data_dir,
        })
    }

    /// The configuration the manager was opened with.
    pub fn config(&self) -> &QuarryConfig {
        &self.config
    }

    /// Storage root.
    pub fn base_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// The underlying registry.
    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    /// Returns true once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn read(&self) -> IndexResult<RwLockReadGuard<'_, ()>> {
        let guard = self.lock.read();
        self.ensure_open()?;
        Ok(guard)
    }

    fn write(&self) -> IndexResult<RwLockWriteGuard<'_, ()>> {
        let guard = self.lock.write();
        self.ensure_open()?;
        Ok(guard)
    }

    fn ensure_open(&self) -> IndexResult<()> {
        if self.is_closed() {
            Err(IndexError::ManagerClosed)
        } else {
            Ok(())
        }
    }

    // ==================== Index lifecycle ====================

    /// Creates and opens a new index.
    ///
    /// # Errors
    ///
    /// Fails if the name is invalid or taken, if the index limit is
    /// reached, or if storage cannot be acquired.
    pub fn create_index(&self, name: &str, settings: IndexSettings) -> IndexResult<Arc<Index>> {
        validate_index_name(name)?;
        let _guard = self.write()?;

        if self.registry.contains(name) {
            return Err(IndexError::already_exists(name));
        }
        if self.registry.len() >= self.config.max_indices {
            return Err(IndexError::limit_exceeded(format!(
                "maximum of {} indices reached",
                self.config.max_indices
            )));
        }

        let path = self.registry.path_for(name);
        let index = remove_on_error(&path, || {
            let index = Arc::new(Index::create(
                name,
                path.clone(),
                Arc::new(settings),
                self.registry.options(),
            )?);
            self.registry.register(Arc::clone(&index))?;
            Ok(index)
        })?;
        info!(index = %name, "created index");
        Ok(index)
    }

    /// Closes an index, forgets it and removes its directory.
    ///
    /// Directory removal is best-effort; entries that cannot be removed are
    /// logged.
    ///
    /// # Errors
    ///
    /// Fails if the index is missing, or neither open nor deletable.
    pub fn delete_index(&self, name: &str) -> IndexResult<()> {
        let _guard = self.write()?;
        let index = self.registry.get(name)?;

        let state = index.state();
        if state.can_close() {
            index.close().map_err(|e| match e {
                IndexError::Engine(source) => IndexError::deletion_failed(index.name(), source),
                other => other,
            })?;
        } else if !state.is_deletable() {
            return Err(IndexError::invalid_state(index.name(), state, "delete"));
        }

        index.mark_deleting()?;
        self.registry.unregister(index.name());

        let failures = remove_tree(index.path());
        if failures > 0 {
            warn!(index = %index.name(), failures, "index directory only partially deleted");
        }
        info!(index = %index.name(), "deleted index");
        Ok(())
    }

    /// Opens a closed or recovering index.
    pub fn open_index(&self, name: &str) -> IndexResult<()> {
        let _guard = self.write()?;
        self.registry.get(name)?.open()
    }

    /// Closes an open index without deleting it.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the index is open.
    pub fn close_index(&self, name: &str) -> IndexResult<()> {
        let _guard = self.write()?;
        let index = self.registry.get(name)?;
        if !index.state().can_close() {
            return Err(IndexError::invalid_state(index.name(), index.state(), "close"));
        }
        index.close()
    }

    // ==================== Lookup ====================

    /// Looks an index up by name or single-index alias.
    pub fn get_index(&self, name: &str) -> IndexResult<Arc<Index>> {
        let _guard = self.read()?;
        self.registry.get(name)
    }

    /// Returns true if `name` is an index or an alias.
    pub fn index_exists(&self, name: &str) -> IndexResult<bool> {
        let _guard = self.read()?;
        Ok(self.registry.contains(name))
    }

    /// Registered index names, sorted.
    pub fn index_names(&self) -> IndexResult<Vec<String>> {
        let _guard = self.read()?;
        Ok(self.registry.names())
    }

    /// Every registered index.
    pub fn indices(&self) -> IndexResult<Vec<Arc<Index>>> {
        let _guard = self.read()?;
        Ok(self.registry.all())
    }

    /// Indices whose name matches a `*` glob, such as `logs-*`.
    pub fn indices_by_pattern(&self, pattern: &str) -> IndexResult<Vec<Arc<Index>>> {
        let _guard = self.read()?;
        Ok(self.registry.indices_by_pattern(pattern))
    }

    // ==================== Index operations ====================

    /// Makes recent writes to one index visible to searches.
    pub fn refresh_index(&self, name: &str) -> IndexResult<()> {
        let _guard = self.read()?;
        self.registry.get(name)?.refresh()
    }

    /// Refreshes each named index, collecting failures into one error.
    pub fn refresh_indices<S: AsRef<str>>(&self, names: &[S]) -> IndexResult<()> {
        let _guard = self.read()?;
        let failures = names
            .iter()
            .filter_map(|name| {
                self.registry
                    .get(name.as_ref())
                    .and_then(|index| index.refresh())
                    .err()
            })
            .collect();
        IndexError::collect("failed to refresh some indices", failures)
    }

    /// Refreshes every registered index.
    pub fn refresh_all(&self) -> IndexResult<()> {
        let names = self.index_names()?;
        self.refresh_indices(&names)
    }

    /// Durably commits one index.
    pub fn commit_index(&self, name: &str) -> IndexResult<()> {
        let _guard = self.read()?;
        self.registry.get(name)?.commit()
    }

    /// Flushes one index.
    pub fn flush_index(&self, name: &str) -> IndexResult<()> {
        let _guard = self.read()?;
        self.registry.get(name)?.flush()
    }

    /// Merges one index down to at most `max_segments` segments.
    pub fn force_merge_index(&self, name: &str, max_segments: usize) -> IndexResult<()> {
        let _guard = self.read()?;
        self.registry.get(name)?.force_merge(max_segments)
    }

    // ==================== Aliases ====================

    /// Points `alias` at `index`.
    pub fn add_alias(&self, index: &str, alias: &str) -> IndexResult<()> {
        let _guard = self.write()?;
        self.registry.add_alias(alias, index)
    }

    /// Removes `alias` from `index`. Returns false if it was not set.
    pub fn remove_alias(&self, index: &str, alias: &str) -> IndexResult<bool> {
        let _guard = self.write()?;
        self.registry.remove_alias(alias, index)
    }

    /// Moves `alias` from `from` to `to`. Not atomic: see
    /// [`IndexRegistry::swap_alias`].
    pub fn swap_alias(&self, alias: &str, from: &str, to: &str) -> IndexResult<()> {
        let _guard = self.write()?;
        self.registry.swap_alias(alias, from, to)
    }

    /// Every alias with its indices.
    pub fn aliases(&self) -> IndexResult<BTreeMap<String, Vec<String>>> {
        let _guard = self.read()?;
        Ok(self.registry.aliases())
    }

    // ==================== Statistics ====================

    /// Point-in-time statistics of one index.
    pub fn index_stats(&self, name: &str) -> IndexResult<StatsSnapshot> {
        let _guard = self.read()?;
        Ok(self.registry.get(name)?.stats().snapshot())
    }

    /// Point-in-time metadata of one index.
    pub fn index_metadata(&self, name: &str) -> IndexResult<MetadataSnapshot> {
        let _guard = self.read()?;
        Ok(self.registry.get(name)?.metadata().snapshot())
    }

    /// Totals across every registered index.
    pub fn cluster_stats(&self) -> IndexResult<ClusterStats> {
        let _guard = self.read()?;
        Ok(self.registry.stats())
    }

    // ==================== Shutdown ====================

    /// Closes every index. Later calls fail with `ManagerClosed`; closing
    /// twice is a no-op.
    pub fn close(&self) -> IndexResult<()> {
        let _guard = self.lock.write();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let result = self.registry.close_all();
        info!(base_path = %self.base_path().display(), "index manager closed");
        result
    }
}

impl Drop for IndexManager {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close index manager on drop");
        }
    }
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("base_path", &self.base_path())
            .field("indices", &self.registry.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::index::IndexState;
    use tempfile::TempDir;

    fn quiet() -> IndexSettings {
        IndexSettings::builder()
            .auto_refresh(false)
            .auto_commit(false)
            .build()
    }

    fn open(dir: &TempDir) -> IndexManager {
        IndexManager::open(QuarryConfig::new().base_path(dir.path())).unwrap()
    }

    #[test]
    fn create_validates_before_anything_else() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        manager.close().unwrap();
        assert!(matches!(
            manager.create_index("bad name", quiet()),
            Err(IndexError::Validation(_))
        ));
        assert!(matches!(
            manager.create_index("good", quiet()),
            Err(IndexError::ManagerClosed)
        ));
    }

    #[test]
    fn create_rejects_duplicates_and_enforces_limit() {
        let dir = TempDir::new().unwrap();
        let manager =
            IndexManager::open(QuarryConfig::new().base_path(dir.path()).max_indices(2)).unwrap();
        manager.create_index("a", quiet()).unwrap();
        assert!(matches!(
            manager.create_index("a", quiet()),
            Err(IndexError::AlreadyExists { .. })
        ));
        manager.create_index("b", quiet()).unwrap();
        assert!(matches!(
            manager.create_index("c", quiet()),
            Err(IndexError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn second_manager_is_locked_out() {
        let dir = TempDir::new().unwrap();
        let _manager = open(&dir);
        assert!(matches!(
            IndexManager::open(QuarryConfig::new().base_path(dir.path())),
            Err(IndexError::ManagerLocked)
        ));
    }

    #[test]
    fn delete_removes_directory_and_aliases() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        let index = manager.create_index("articles", quiet()).unwrap();
        index.add_document(&Document::new("1").with_text("t", "x")).unwrap();
        manager.add_alias("articles", "current").unwrap();

        manager.delete_index("articles").unwrap();
        assert_eq!(index.state(), IndexState::Deleting);
        assert!(!dir.path().join("articles").exists());
        assert!(!manager.index_exists("articles").unwrap());
        assert!(!manager.index_exists("current").unwrap());
        assert!(matches!(
            manager.delete_index("articles"),
            Err(IndexError::NotFound { .. })
        ));
    }

    #[test]
    fn open_and_close_check_state() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        manager.create_index("a", quiet()).unwrap();

        assert!(matches!(
            manager.open_index("a"),
            Err(IndexError::InvalidState { .. })
        ));
        manager.close_index("a").unwrap();
        assert!(matches!(
            manager.close_index("a"),
            Err(IndexError::InvalidState { .. })
        ));
        manager.open_index("a").unwrap();
        assert_eq!(manager.get_index("a").unwrap().state(), IndexState::Open);
    }

    #[test]
    fn refresh_indices_collects_failures() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        manager.create_index("a", quiet()).unwrap();

        manager.refresh_all().unwrap();
        let err = manager
            .refresh_indices(&["a", "missing", "gone"])
            .unwrap_err();
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn per_index_operations_and_stats() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        let index = manager.create_index("a", quiet()).unwrap();
        index
            .add_documents(&[Document::new("1"), Document::new("2")])
            .unwrap();

        manager.flush_index("a").unwrap();
        manager.commit_index("a").unwrap();
        manager.force_merge_index("a", 1).unwrap();
        manager.refresh_index("a").unwrap();

        assert_eq!(manager.index_stats("a").unwrap().docs.count, 2);
        assert_eq!(manager.index_metadata("a").unwrap().document_count, 2);
        let cluster = manager.cluster_stats().unwrap();
        assert_eq!(cluster.total_indices, 1);
        assert_eq!(cluster.total_docs, 2);
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        let index = manager.create_index("a", quiet()).unwrap();
        manager.close().unwrap();
        manager.close().unwrap();
        assert!(manager.is_closed());
        assert_eq!(index.state(), IndexState::Closed);
        assert!(matches!(
            manager.get_index("a"),
            Err(IndexError::ManagerClosed)
        ));
        assert!(matches!(
            manager.index_names(),
            Err(IndexError::ManagerClosed)
        ));
    }
}
