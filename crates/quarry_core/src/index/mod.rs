//! A single index and its lifecycle.
//!
//! An [`Index`] owns one engine writer, one refresh-aware searcher manager
//! and up to two background tasks (refresh and commit). Its state guards
//! every operation:
//!
//! | Operation                    | Allowed in          |
//! |------------------------------|---------------------|
//! | writes, commit, flush, merge | `Open`              |
//! | `acquire_searcher`           | `Open`              |
//! | `refresh`                    | any (no-op unless `Open`) |
//! | `open`                       | `Closed`, `Recovering` |
//! | `close`                      | any (no-op unless `Open`) |

mod metadata;
mod scheduler;
mod searcher;
mod settings;
mod state;
mod stats;

pub use metadata::{IndexMetadata, MetadataSnapshot};
pub use scheduler::SHUTDOWN_GRACE;
pub use searcher::SearcherGuard;
pub use settings::{IndexSettings, IndexSettingsBuilder, MergePolicyType};
pub use state::{IndexState, UnknownState};
pub use stats::{
    DocsStats, GetStats, IndexStats, IndexingStats, MergeStats, SearchStats, StatsSnapshot,
    TimedStats,
};

use crate::document::{Document, DocumentConverter, ID_FIELD};
use crate::error::{IndexError, IndexResult, ValidationError};
use parking_lot::{Mutex, RwLock};
use quarry_engine::{
    EngineDirectory, EngineResult, EngineWriter, NativeDocument, Query, SearcherManager, Term,
};
use scheduler::{PeriodicTask, Scheduler};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Manager-wide knobs every index needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexOptions {
    pub max_result_window: usize,
    pub slow_log_threshold: Option<Duration>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            max_result_window: 10_000,
            slow_log_threshold: Some(Duration::from_millis(5000)),
        }
    }
}

impl IndexOptions {
    pub(crate) fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_log_threshold.is_some_and(|t| elapsed >= t)
    }
}

/// Engine handles held while the index is open.
struct Engine {
    searchers: SearcherManager,
    writer: EngineWriter,
    directory: EngineDirectory,
}

impl Engine {
    fn acquire(path: &Path, settings: &IndexSettings) -> EngineResult<Self> {
        let directory = EngineDirectory::open(path)?;
        let writer = EngineWriter::open(&directory, &settings.writer_config())?;
        let searchers = SearcherManager::open(&directory)?;
        Ok(Self {
            searchers,
            writer,
            directory,
        })
    }

    /// Releases handles in order: searchers, writer, directory.
    fn release(self) -> EngineResult<()> {
        let Self {
            searchers,
            writer,
            directory,
        } = self;
        drop(searchers);
        let closed = writer.close();
        drop(writer);
        drop(directory);
        closed
    }
}

struct Slot {
    state: IndexState,
    engine: Option<Engine>,
}

/// Shared state of an index, also reachable from its background tasks.
pub(crate) struct IndexCore {
    pub(crate) name: String,
    path: PathBuf,
    settings: Arc<IndexSettings>,
    pub(crate) options: IndexOptions,
    metadata: IndexMetadata,
    pub(crate) stats: IndexStats,
    /// Writes since the last publish.
    dirty: AtomicBool,
    slot: RwLock<Slot>,
}

impl IndexCore {
    fn new(
        name: String,
        path: PathBuf,
        settings: Arc<IndexSettings>,
        options: IndexOptions,
        state: IndexState,
    ) -> Self {
        let metadata = IndexMetadata::new(name.clone(), Arc::clone(&settings));
        metadata.set_primary_location(&path);
        if state != IndexState::Creating {
            let recorded = metadata.set_state(state);
            debug_assert!(recorded.is_ok(), "fresh metadata is never terminal");
        }
        Self {
            name,
            path,
            settings,
            options,
            metadata,
            stats: IndexStats::new(),
            dirty: AtomicBool::new(false),
            slot: RwLock::new(Slot {
                state,
                engine: None,
            }),
        }
    }

    fn state(&self) -> IndexState {
        self.slot.read().state
    }

    fn transition(&self, slot: &mut Slot, to: IndexState) -> IndexResult<()> {
        if slot.state.is_terminal() {
            return Err(IndexError::invalid_state(
                self.name.clone(),
                slot.state,
                "change state of",
            ));
        }
        let from = slot.state;
        slot.state = to;
        self.metadata.set_state(to)?;
        info!(index = %self.name, %from, %to, "index state changed");
        Ok(())
    }

    /// Acquires the engine and moves to `Open`, or to `Failed` on error.
    fn initialize(&self, slot: &mut Slot) -> IndexResult<()> {
        match Engine::acquire(&self.path, &self.settings) {
            Ok(engine) => {
                slot.engine = Some(engine);
                self.transition(slot, IndexState::Open)?;
                if let Some(engine) = slot.engine.as_ref() {
                    self.update_stats(engine);
                }
                Ok(())
            }
            Err(source) => {
                error!(index = %self.name, error = %source, "failed to initialize index");
                self.transition(slot, IndexState::Failed)?;
                Err(IndexError::creation_failed(self.name.clone(), source))
            }
        }
    }

    /// Runs `f` against the engine if the index is writeable.
    fn with_engine<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Engine) -> IndexResult<R>,
    ) -> IndexResult<R> {
        let slot = self.slot.read();
        match slot.engine.as_ref() {
            Some(engine) if slot.state.is_writeable() => f(engine),
            _ => Err(IndexError::invalid_state(
                self.name.clone(),
                slot.state,
                operation,
            )),
        }
    }

    fn write_docs(
        &self,
        operation: &'static str,
        natives: &[NativeDocument],
        key: Option<&Term>,
    ) -> IndexResult<()> {
        self.with_engine(operation, |engine| {
            self.stats.index_started();
            let started = Instant::now();
            let result = natives.iter().try_for_each(|native| {
                let written = match key {
                    Some(term) => engine.writer.update_document(term, native),
                    None => engine.writer.add_document(native),
                };
                written.map(|_| ())
            });
            let elapsed = started.elapsed();
            self.stats
                .record_indexing(natives.len() as u64, elapsed, result.is_ok());
            self.dirty.store(true, Ordering::Release);
            if self.options.is_slow(elapsed) {
                warn!(
                    index = %self.name,
                    docs = natives.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "slow indexing"
                );
            }
            Ok(result?)
        })
    }

    fn delete(
        &self,
        operation: &'static str,
        f: impl FnOnce(&EngineWriter) -> EngineResult<u64>,
    ) -> IndexResult<()> {
        self.with_engine(operation, |engine| {
            let started = Instant::now();
            let result = f(&engine.writer);
            self.stats.record_delete(started.elapsed(), result.is_ok());
            result?;
            self.dirty.store(true, Ordering::Release);
            Ok(())
        })
    }

    /// Makes published writes visible. tantivy only exposes committed
    /// segments, so pending writes are committed first.
    fn refresh(&self) -> IndexResult<()> {
        let slot = self.slot.read();
        let Some(engine) = slot.engine.as_ref().filter(|_| slot.state == IndexState::Open) else {
            return Ok(());
        };
        let started = Instant::now();
        let committed = self.dirty.swap(false, Ordering::AcqRel);
        if committed {
            if let Err(e) = engine.writer.commit() {
                self.dirty.store(true, Ordering::Release);
                return Err(e.into());
            }
        }
        engine.searchers.maybe_refresh()?;
        if committed {
            self.update_stats(engine);
        }
        self.stats.record_refresh(started.elapsed());
        debug!(index = %self.name, "refreshed");
        Ok(())
    }

    fn commit(&self) -> IndexResult<()> {
        self.with_engine("commit", |engine| {
            let started = Instant::now();
            self.dirty.store(false, Ordering::Release);
            if let Err(e) = engine.writer.commit() {
                self.dirty.store(true, Ordering::Release);
                return Err(e.into());
            }
            self.stats.record_commit(started.elapsed());
            self.update_stats(engine);
            Ok(())
        })
    }

    /// Background commit: skips silently unless open.
    fn auto_commit(&self) -> IndexResult<()> {
        if self.state().is_writeable() && self.dirty.load(Ordering::Acquire) {
            self.commit()
        } else {
            Ok(())
        }
    }

    /// Mirrors engine counts into stats and metadata. Failures are logged.
    fn update_stats(&self, engine: &Engine) {
        let counts = engine.writer.doc_stats().and_then(|docs| {
            let size = engine.directory.size_in_bytes()?;
            Ok((docs, size))
        });
        match counts {
            Ok((docs, size)) => {
                self.stats
                    .update_doc_counts(docs.num_docs, docs.deleted_docs, docs.max_doc);
                self.stats.update_store_size(size);
                self.metadata.update_counts(docs.num_docs, size);
            }
            Err(e) => warn!(index = %self.name, error = %e, "failed to update index statistics"),
        }
    }
}

/// One named index.
///
/// Created and owned by the registry; callers get it as `Arc<Index>`.
pub struct Index {
    core: Arc<IndexCore>,
    scheduler: Mutex<Option<Scheduler>>,
}

impl Index {
    /// Creates an index at `path`: `Creating`, then `Open` or `Failed`.
    pub(crate) fn create(
        name: impl Into<String>,
        path: PathBuf,
        settings: Arc<IndexSettings>,
        options: IndexOptions,
    ) -> IndexResult<Self> {
        let index = Self::with_state(name.into(), path, settings, options, IndexState::Creating);
        {
            let mut slot = index.core.slot.write();
            index.core.initialize(&mut slot)?;
        }
        index.start_tasks()?;
        Ok(index)
    }

    /// Registers an existing directory without opening it.
    pub(crate) fn closed(
        name: impl Into<String>,
        path: PathBuf,
        settings: Arc<IndexSettings>,
        options: IndexOptions,
    ) -> Self {
        Self::with_state(name.into(), path, settings, options, IndexState::Closed)
    }

    fn with_state(
        name: String,
        path: PathBuf,
        settings: Arc<IndexSettings>,
        options: IndexOptions,
        state: IndexState,
    ) -> Self {
        Self {
            core: Arc::new(IndexCore::new(name, path, settings, options, state)),
            scheduler: Mutex::new(None),
        }
    }

    fn start_tasks(&self) -> IndexResult<()> {
        let settings = &self.core.settings;
        let mut scheduler = Scheduler::default();

        if settings.auto_refresh() && !settings.refresh_interval().is_zero() {
            let core = Arc::downgrade(&self.core);
            scheduler.push(PeriodicTask::spawn(
                format!("quarry-refresh-{}", self.core.name),
                settings.refresh_interval(),
                move || Weak::upgrade(&core).map_or(Ok(()), |core| core.refresh()),
            )?);
        }
        if settings.auto_commit() && !settings.commit_interval().is_zero() {
            let core = Arc::downgrade(&self.core);
            scheduler.push(PeriodicTask::spawn(
                format!("quarry-commit-{}", self.core.name),
                settings.commit_interval(),
                move || Weak::upgrade(&core).map_or(Ok(()), |core| core.auto_commit()),
            )?);
        }

        debug!(
            index = %self.core.name,
            tasks = ?scheduler.task_names().collect::<Vec<_>>(),
            "started background tasks"
        );
        if let Some(previous) = self.scheduler.lock().replace(scheduler) {
            previous.shutdown(SHUTDOWN_GRACE);
        }
        Ok(())
    }

    fn stop_tasks(&self) {
        let scheduler = self.scheduler.lock().take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown(SHUTDOWN_GRACE);
        }
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Storage directory.
    pub fn path(&self) -> &Path {
        &self.core.path
    }

    /// Current state.
    pub fn state(&self) -> IndexState {
        self.core.state()
    }

    /// Settings the index was created with.
    pub fn settings(&self) -> &Arc<IndexSettings> {
        &self.core.settings
    }

    /// Live metadata.
    pub fn metadata(&self) -> &IndexMetadata {
        &self.core.metadata
    }

    /// Live statistics.
    pub fn stats(&self) -> &IndexStats {
        &self.core.stats
    }

    /// Adds one document.
    ///
    /// # Errors
    ///
    /// Validation errors come first; then the index must be open.
    pub fn add_document(&self, doc: &Document) -> IndexResult<()> {
        self.add_documents(std::slice::from_ref(doc))
    }

    /// Adds a batch of documents. The whole batch is validated before any
    /// document is written.
    pub fn add_documents(&self, docs: &[Document]) -> IndexResult<()> {
        let natives = docs
            .iter()
            .map(DocumentConverter::to_native)
            .collect::<Result<Vec<_>, _>>()?;
        self.core.write_docs("add documents to", &natives, None)
    }

    /// Replaces every document with identifier `id` by `doc`.
    pub fn update_document(&self, id: &str, doc: &Document) -> IndexResult<()> {
        let key = id_term(id)?;
        let native = DocumentConverter::to_native(doc)?;
        self.core
            .write_docs("update documents in", std::slice::from_ref(&native), Some(&key))
    }

    /// Deletes the document with identifier `id`.
    pub fn delete_document(&self, id: &str) -> IndexResult<()> {
        let key = id_term(id)?;
        self.core
            .delete("delete documents from", |writer| writer.delete_term(&key))
    }

    /// Deletes every document matching any of `queries`.
    pub fn delete_documents(&self, queries: &[Query]) -> IndexResult<()> {
        self.core.delete("delete documents from", |writer| {
            let mut opstamp = 0;
            for query in queries {
                opstamp = writer.delete_query(query)?;
            }
            Ok(opstamp)
        })
    }

    /// Deletes every document.
    pub fn delete_all(&self) -> IndexResult<()> {
        self.core
            .delete("delete documents from", EngineWriter::delete_all)
    }

    /// Makes writes so far visible to new searchers. No-op unless open.
    pub fn refresh(&self) -> IndexResult<()> {
        self.core.refresh()
    }

    /// Durably persists pending writes and updates statistics.
    pub fn commit(&self) -> IndexResult<()> {
        self.core.commit()
    }

    /// Publishes buffered writes without waiting for durability.
    pub fn flush(&self) -> IndexResult<()> {
        self.core.with_engine("flush", |engine| {
            let started = Instant::now();
            engine.writer.flush()?;
            self.core.stats.record_flush(started.elapsed());
            Ok(())
        })
    }

    /// Merges segments until at most `max_segments` remain.
    pub fn force_merge(&self, max_segments: usize) -> IndexResult<()> {
        if max_segments == 0 {
            return Err(ValidationError::invalid_argument("max_segments must be at least 1").into());
        }
        self.core.with_engine("force merge", |engine| {
            self.core.stats.merge_started();
            let started = Instant::now();
            let outcome = engine.writer.force_merge(max_segments);
            let merged = outcome.as_ref().map_or(0, |o| o.segments_merged as u64);
            self.core.stats.record_merge(started.elapsed(), merged);
            let outcome = outcome?;
            info!(
                index = %self.core.name,
                before = outcome.segments_before,
                merged = outcome.segments_merged,
                "force merge finished"
            );
            self.core.update_stats(engine);
            Ok(())
        })
    }

    /// Acquires a point-in-time searcher.
    pub fn acquire_searcher(&self) -> IndexResult<SearcherGuard> {
        let slot = self.core.slot.read();
        match slot.engine.as_ref() {
            Some(engine) if slot.state.is_readable() => Ok(SearcherGuard::new(
                engine.searchers.acquire(),
                Arc::clone(&self.core),
            )),
            _ => Err(IndexError::invalid_state(
                self.core.name.clone(),
                slot.state,
                "search",
            )),
        }
    }

    /// Looks a document up by identifier in the current snapshot.
    pub fn get_document(&self, id: &str) -> IndexResult<Option<Document>> {
        id_term(id)?;
        let searcher = self.acquire_searcher()?;
        let started = Instant::now();
        let top = searcher
            .engine_searcher()
            .search(&Query::term(ID_FIELD, id), 1)?;
        let doc = match top.hits.first() {
            Some(hit) => Some(DocumentConverter::from_native(
                &searcher.engine_searcher().doc(hit.address)?,
            )?),
            None => None,
        };
        self.core.stats.record_get(started.elapsed(), doc.is_some());
        Ok(doc)
    }

    /// Live documents visible to new searchers.
    pub fn doc_count(&self) -> IndexResult<u64> {
        Ok(self.acquire_searcher()?.num_docs())
    }

    /// On-disk size. Read from the directory when open, from metadata
    /// otherwise.
    pub fn size_in_bytes(&self) -> IndexResult<u64> {
        let slot = self.core.slot.read();
        match slot.engine.as_ref() {
            Some(engine) => Ok(engine.directory.size_in_bytes()?),
            None => Ok(self.core.metadata.size_in_bytes()),
        }
    }

    /// Opens a closed or recovering index.
    pub fn open(&self) -> IndexResult<()> {
        {
            let mut slot = self.core.slot.write();
            if !slot.state.can_open() {
                return Err(IndexError::invalid_state(
                    self.core.name.clone(),
                    slot.state,
                    "open",
                ));
            }
            self.core.initialize(&mut slot)?;
        }
        self.start_tasks()
    }

    /// Cancels background tasks, commits and releases the engine.
    /// No-op unless open.
    pub fn close(&self) -> IndexResult<()> {
        // Tasks take the slot lock; stop them before taking it here.
        self.stop_tasks();
        let engine = {
            let mut slot = self.core.slot.write();
            if !slot.state.can_close() {
                return Ok(());
            }
            self.core.transition(&mut slot, IndexState::Closed)?;
            // Releasing the writer commits whatever is pending.
            self.core.dirty.store(false, Ordering::Release);
            slot.engine.take()
        };
        match engine {
            Some(engine) => engine.release().map_err(Into::into),
            None => Ok(()),
        }
    }

    pub(crate) fn mark_recovering(&self) -> IndexResult<()> {
        let mut slot = self.core.slot.write();
        if slot.state != IndexState::Closed {
            return Err(IndexError::invalid_state(
                self.core.name.clone(),
                slot.state,
                "recover",
            ));
        }
        self.core.transition(&mut slot, IndexState::Recovering)
    }

    /// Irreversibly marks the index for deletion. No-op if already marked.
    pub(crate) fn mark_deleting(&self) -> IndexResult<()> {
        let mut slot = self.core.slot.write();
        if slot.state.is_terminal() {
            return Ok(());
        }
        self.core.transition(&mut slot, IndexState::Deleting)
    }
}

impl Drop for Index {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(index = %self.core.name, error = %e, "failed to close index on drop");
        }
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.core.name)
            .field("state", &self.state())
            .field("path", &self.core.path)
            .finish_non_exhaustive()
    }
}

fn id_term(id: &str) -> Result<Term, ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::MissingIdentifier);
    }
    Ok(Term::new(ID_FIELD, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quiet() -> Arc<IndexSettings> {
        Arc::new(
            IndexSettings::builder()
                .auto_refresh(false)
                .auto_commit(false)
                .build(),
        )
    }

    fn create(dir: &TempDir, name: &str) -> Index {
        Index::create(name, dir.path().join(name), quiet(), IndexOptions::default()).unwrap()
    }

    fn article(id: &str, category: &str) -> Document {
        Document::new(id)
            .with_text("title", format!("Article {id}"))
            .with_keyword("category", category)
    }

    #[test]
    fn create_opens() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        assert_eq!(index.state(), IndexState::Open);
        assert_eq!(index.metadata().state(), IndexState::Open);
        assert_eq!(index.name(), "articles");
        assert!(index.path().exists());
    }

    #[test]
    fn writes_become_visible_after_refresh() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        index.add_document(&article("1", "tech")).unwrap();
        assert_eq!(index.doc_count().unwrap(), 0);

        index.refresh().unwrap();
        assert_eq!(index.doc_count().unwrap(), 1);
        assert_eq!(index.stats().refresh_total(), 1);
    }

    #[test]
    fn get_document_by_id() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        index.add_document(&article("1", "tech")).unwrap();
        index.refresh().unwrap();

        let doc = index.get_document("1").unwrap().unwrap();
        assert_eq!(doc.get_first("category"), Some(&"tech".into()));
        assert!(index.get_document("missing").unwrap().is_none());

        let get = index.stats().snapshot().get;
        assert_eq!((get.exists, get.missing), (1, 1));
    }

    #[test]
    fn update_replaces() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        index.add_document(&article("1", "tech")).unwrap();
        index.update_document("1", &article("1", "science")).unwrap();
        index.refresh().unwrap();

        let searcher = index.acquire_searcher().unwrap();
        assert_eq!(searcher.num_docs(), 1);
        assert_eq!(
            searcher.count(&Query::term("category", "science")).unwrap(),
            1
        );
    }

    #[test]
    fn deletes() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        index
            .add_documents(&[article("1", "a"), article("2", "b"), article("3", "b")])
            .unwrap();
        index.delete_document("1").unwrap();
        index.refresh().unwrap();
        assert_eq!(index.doc_count().unwrap(), 2);

        index
            .delete_documents(&[Query::term("category", "b")])
            .unwrap();
        index.refresh().unwrap();
        assert_eq!(index.doc_count().unwrap(), 0);

        index.add_document(&article("4", "c")).unwrap();
        index.delete_all().unwrap();
        index.refresh().unwrap();
        assert_eq!(index.doc_count().unwrap(), 0);
    }

    #[test]
    fn delete_all_covers_unpublished_writes() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        index.add_document(&article("1", "a")).unwrap();
        index.commit().unwrap();
        index.add_document(&article("2", "a")).unwrap();

        index.delete_all().unwrap();
        index.refresh().unwrap();
        assert_eq!(index.doc_count().unwrap(), 0);
        assert!(index.get_document("2").unwrap().is_none());

        index.add_document(&article("3", "a")).unwrap();
        index.refresh().unwrap();
        assert_eq!(index.doc_count().unwrap(), 1);
    }

    #[test]
    fn failed_deletes_are_recorded() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        index.delete_document("1").unwrap();
        let result = index.core.delete("delete documents from", |_| {
            Err(quarry_engine::EngineError::WriterClosed)
        });
        assert!(matches!(result, Err(IndexError::Engine(_))));

        let indexing = index.stats().snapshot().indexing;
        assert_eq!(indexing.delete_total, 1);
        assert_eq!(indexing.delete_failed, 1);
    }

    #[test]
    fn operations_require_open_state() {
        let dir = TempDir::new().unwrap();

        let closed = create(&dir, "closed");
        closed.close().unwrap();

        let deleting = create(&dir, "deleting");
        deleting.close().unwrap();
        deleting.mark_deleting().unwrap();

        // Another writer holds the directory, so opening fails.
        let _holder = create(&dir, "failed");
        let failed = Index::closed("failed", dir.path().join("failed"), quiet(), IndexOptions::default());
        assert!(failed.open().is_err());

        let operations: [(&str, fn(&Index) -> IndexResult<()>); 9] = [
            ("add", |i| i.add_document(&article("1", "a"))),
            ("update", |i| i.update_document("1", &article("1", "b"))),
            ("delete_document", |i| i.delete_document("1")),
            ("delete_documents", |i| {
                i.delete_documents(&[Query::term("category", "a")])
            }),
            ("delete_all", Index::delete_all),
            ("commit", Index::commit),
            ("flush", Index::flush),
            ("force_merge", |i| i.force_merge(1)),
            ("acquire_searcher", |i| i.acquire_searcher().map(drop)),
        ];

        for (index, expected) in [
            (&closed, IndexState::Closed),
            (&failed, IndexState::Failed),
            (&deleting, IndexState::Deleting),
        ] {
            assert_eq!(index.state(), expected);
            for (name, operation) in &operations {
                let result = operation(index);
                assert!(
                    matches!(result, Err(IndexError::InvalidState { state, .. }) if state == expected),
                    "{name} on {expected}: {result:?}"
                );
                assert_eq!(index.state(), expected, "{name} changed the state");
            }
        }
    }

    #[test]
    fn invalid_documents_are_rejected_before_state() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        index.close().unwrap();
        assert!(matches!(
            index.add_document(&Document::new("")),
            Err(IndexError::Validation(ValidationError::MissingIdentifier))
        ));
        assert!(matches!(
            index.add_document(&article("1", "x")),
            Err(IndexError::InvalidState {
                state: IndexState::Closed,
                ..
            })
        ));
    }

    #[test]
    fn reserved_fields_cannot_shadow_identifiers() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        let hijack = article("1", "a").with_keyword(ID_FIELD, "2");
        assert!(matches!(
            index.add_document(&hijack),
            Err(IndexError::Validation(ValidationError::ReservedFieldName { .. }))
        ));
        index.add_document(&article("2", "b")).unwrap();
        index.refresh().unwrap();

        let found = index.get_document("2").unwrap().unwrap();
        assert_eq!(found.id(), "2");
        index.delete_document("2").unwrap();
        index.refresh().unwrap();
        assert_eq!(index.doc_count().unwrap(), 0);
    }

    #[test]
    fn batch_is_all_or_nothing_on_validation() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        let result = index.add_documents(&[article("1", "a"), Document::new(" ")]);
        assert!(result.is_err());
        index.refresh().unwrap();
        assert_eq!(index.doc_count().unwrap(), 0);
    }

    #[test]
    fn commit_updates_statistics() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        index
            .add_documents(&[article("1", "a"), article("2", "b")])
            .unwrap();
        index.commit().unwrap();

        assert_eq!(index.stats().total_docs(), 2);
        assert_eq!(index.metadata().document_count(), 2);
        assert!(index.metadata().size_in_bytes() > 0);
        assert_eq!(index.stats().index_total(), 2);
        assert_eq!(index.stats().commit_total(), 1);
    }

    #[test]
    fn close_is_idempotent_and_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        index.add_document(&article("1", "a")).unwrap();

        index.close().unwrap();
        index.close().unwrap();
        assert_eq!(index.state(), IndexState::Closed);
        assert!(index.acquire_searcher().is_err());
        // Refresh is tolerated when closed.
        index.refresh().unwrap();

        index.open().unwrap();
        assert_eq!(index.state(), IndexState::Open);
        assert_eq!(index.doc_count().unwrap(), 1);
        assert!(matches!(
            index.open(),
            Err(IndexError::InvalidState { operation: "open", .. })
        ));
    }

    #[test]
    fn deleting_is_terminal() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        index.close().unwrap();
        index.mark_deleting().unwrap();
        assert_eq!(index.state(), IndexState::Deleting);
        assert!(index.open().is_err());
        assert!(index.mark_recovering().is_err());
        index.close().unwrap();
        assert_eq!(index.state(), IndexState::Deleting);
    }

    #[test]
    fn discovered_index_recovers() {
        let dir = TempDir::new().unwrap();
        {
            let index = create(&dir, "logs");
            index.add_document(&article("1", "a")).unwrap();
            index.close().unwrap();
        }
        let index = Index::closed("logs", dir.path().join("logs"), quiet(), IndexOptions::default());
        assert_eq!(index.state(), IndexState::Closed);
        index.mark_recovering().unwrap();
        assert_eq!(index.state(), IndexState::Recovering);
        index.open().unwrap();
        assert_eq!(index.doc_count().unwrap(), 1);
    }

    #[test]
    fn second_writer_fails_creation() {
        let dir = TempDir::new().unwrap();
        let _first = create(&dir, "shared");
        let second = Index::create("shared", dir.path().join("shared"), quiet(), IndexOptions::default());
        assert!(matches!(second, Err(IndexError::CreationFailed { .. })));
    }

    #[test]
    fn force_merge_validates_argument() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        assert!(matches!(
            index.force_merge(0),
            Err(IndexError::Validation(_))
        ));
        for i in 0..3 {
            index.add_document(&article(&i.to_string(), "a")).unwrap();
            index.commit().unwrap();
        }
        index.force_merge(1).unwrap();
        assert_eq!(index.stats().snapshot().merge.total, 1);
    }

    #[test]
    fn searcher_gauge_tracks_guards() {
        let dir = TempDir::new().unwrap();
        let index = create(&dir, "articles");
        let first = index.acquire_searcher().unwrap();
        let second = index.acquire_searcher().unwrap();
        assert_eq!(index.stats().search_current(), 2);
        drop(first);
        drop(second);
        assert_eq!(index.stats().search_current(), 0);
    }

    #[test]
    fn result_window_is_clamped() {
        let dir = TempDir::new().unwrap();
        let options = IndexOptions {
            max_result_window: 2,
            slow_log_threshold: None,
        };
        let index = Index::create("small", dir.path().join("small"), quiet(), options).unwrap();
        let docs: Vec<_> = (0..5).map(|i| article(&i.to_string(), "a")).collect();
        index.add_documents(&docs).unwrap();
        index.refresh().unwrap();

        let top = index
            .acquire_searcher()
            .unwrap()
            .search(&Query::All, 100)
            .unwrap();
        assert_eq!(top.total_hits, 5);
        assert_eq!(top.hits.len(), 2);
    }

    #[test]
    fn background_refresh_publishes_writes() {
        let dir = TempDir::new().unwrap();
        let settings = IndexSettings::builder()
            .refresh_interval(Duration::from_millis(20))
            .auto_commit(false)
            .build();
        let index = Index::create(
            "auto",
            dir.path().join("auto"),
            Arc::new(settings),
            IndexOptions::default(),
        )
        .unwrap();
        index.add_document(&article("1", "a")).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while index.doc_count().unwrap() == 0 {
            assert!(Instant::now() < deadline, "background refresh never ran");
            std::thread::sleep(Duration::from_millis(10));
        }
        index.close().unwrap();
    }
}
