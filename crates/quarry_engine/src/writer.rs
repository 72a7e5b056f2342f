//! The single writer bound to an index directory.

use crate::directory::EngineDirectory;
use crate::error::{EngineError, EngineResult};
use crate::field::{NativeDocument, Term};
use crate::query::Query;
use crate::schema::EngineSchema;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tantivy::merge_policy::{LogMergePolicy, MergePolicy, NoMergePolicy};
use tantivy::query::AllQuery;
use tantivy::{IndexWriter, ReloadPolicy, TantivyDocument};

/// Smallest per-thread memory arena tantivy accepts.
pub const MIN_BUDGET_PER_THREAD: usize = 15_000_000;
/// Largest per-thread memory arena handed to tantivy.
pub const MAX_BUDGET_PER_THREAD: usize = 3_000_000_000;

/// Segment merge policy.
#[derive(Debug, Clone, PartialEq)]
pub enum MergePolicyConfig {
    /// Log-structured merging by document count.
    Log {
        /// Segments of one level needed before they are merged.
        min_num_segments: usize,
        /// Segments holding more documents than this are never merged.
        max_docs_before_merge: usize,
    },
    /// Background merging disabled; only explicit force merges run.
    NoMerge,
}

impl MergePolicyConfig {
    fn build(&self) -> Box<dyn MergePolicy> {
        match self {
            Self::Log {
                min_num_segments,
                max_docs_before_merge,
            } => {
                let mut policy = LogMergePolicy::default();
                policy.set_min_num_segments((*min_num_segments).max(2));
                policy.set_max_docs_before_merge((*max_docs_before_merge).max(1));
                Box::new(policy)
            }
            Self::NoMerge => Box::new(NoMergePolicy),
        }
    }
}

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Total indexing memory budget in bytes.
    pub memory_budget_bytes: usize,
    /// Upper bound on indexing threads.
    pub max_threads: usize,
    /// Flush automatically after this many buffered documents.
    pub max_buffered_docs: Option<usize>,
    /// Requested compound segment files. tantivy always writes one file per
    /// segment component, so this is advisory.
    pub use_compound_file: bool,
    /// Merge policy.
    pub merge_policy: MergePolicyConfig,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: 16 * 1024 * 1024,
            max_threads: 8,
            max_buffered_docs: None,
            use_compound_file: true,
            merge_policy: MergePolicyConfig::Log {
                min_num_segments: 10,
                max_docs_before_merge: 5_000_000,
            },
        }
    }
}

impl WriterConfig {
    /// Returns `(threads, total budget)` satisfying tantivy's per-thread
    /// arena limits. The thread count shrinks before the budget grows.
    pub fn resolve_threads(&self) -> (usize, usize) {
        let threads = (self.memory_budget_bytes / MIN_BUDGET_PER_THREAD).clamp(1, self.max_threads.max(1));
        let per_thread =
            (self.memory_budget_bytes / threads).clamp(MIN_BUDGET_PER_THREAD, MAX_BUDGET_PER_THREAD);
        (threads, per_thread * threads)
    }
}

/// Outcome of a forced merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Committed segments before the merge.
    pub segments_before: usize,
    /// Segments folded into the merged segment.
    pub segments_merged: usize,
}

/// Document counts taken from a fresh reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocStats {
    /// Live documents.
    pub num_docs: u64,
    /// Deleted documents not yet merged away.
    pub deleted_docs: u64,
    /// Live plus deleted documents.
    pub max_doc: u64,
}

/// The exclusive writer of one index directory.
///
/// Document submissions take the shared side of the internal lock and may
/// run concurrently. Commit, flush, merge and close take the exclusive side.
/// tantivy additionally holds a lock file in the directory, so a second
/// writer on the same path fails to open.
pub struct EngineWriter {
    inner: RwLock<Option<IndexWriter<TantivyDocument>>>,
    index: tantivy::Index,
    schema: Arc<EngineSchema>,
    max_buffered_docs: Option<usize>,
    buffered: AtomicUsize,
}

impl EngineWriter {
    /// Opens the writer for `directory`.
    ///
    /// # Errors
    ///
    /// Fails if another writer holds the directory lock.
    pub fn open(directory: &EngineDirectory, config: &WriterConfig) -> EngineResult<Self> {
        let (threads, budget) = config.resolve_threads();
        let writer: IndexWriter<TantivyDocument> =
            directory.index().writer_with_num_threads(threads, budget)?;
        writer.set_merge_policy(config.merge_policy.build());
        if config.use_compound_file {
            tracing::debug!(
                path = %directory.path().display(),
                "compound segment files requested; segments are written as separate files"
            );
        }
        tracing::debug!(threads, budget, "opened index writer");

        Ok(Self {
            inner: RwLock::new(Some(writer)),
            index: directory.index().clone(),
            schema: Arc::clone(directory.schema()),
            max_buffered_docs: config.max_buffered_docs,
            buffered: AtomicUsize::new(0),
        })
    }

    fn with_writer<R>(
        &self,
        f: impl FnOnce(&IndexWriter<TantivyDocument>) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let guard = self.inner.read();
        let writer = guard.as_ref().ok_or(EngineError::WriterClosed)?;
        f(writer)
    }

    fn with_writer_mut<R>(
        &self,
        f: impl FnOnce(&mut IndexWriter<TantivyDocument>) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let mut guard = self.inner.write();
        let writer = guard.as_mut().ok_or(EngineError::WriterClosed)?;
        f(writer)
    }

    /// Adds a document. Returns the operation stamp.
    pub fn add_document(&self, doc: &NativeDocument) -> EngineResult<u64> {
        let lowered = self.schema.to_tantivy(doc)?;
        let opstamp = self.with_writer(|w| Ok(w.add_document(lowered)?))?;
        self.note_buffered()?;
        Ok(opstamp)
    }

    /// Deletes every document matching `key`, then adds `doc`.
    pub fn update_document(&self, key: &Term, doc: &NativeDocument) -> EngineResult<u64> {
        let lowered = self.schema.to_tantivy(doc)?;
        let term = self.schema.term(key);
        let opstamp = self.with_writer(|w| {
            w.delete_term(term);
            Ok(w.add_document(lowered)?)
        })?;
        self.note_buffered()?;
        Ok(opstamp)
    }

    /// Deletes every document matching `key`.
    pub fn delete_term(&self, key: &Term) -> EngineResult<u64> {
        let term = self.schema.term(key);
        self.with_writer(|w| Ok(w.delete_term(term)))
    }

    /// Deletes every document matching `query`.
    pub fn delete_query(&self, query: &Query) -> EngineResult<u64> {
        let query = query.to_tantivy(&self.schema);
        self.with_writer(|w| Ok(w.delete_query(query)?))
    }

    /// Deletes every document, including ones added since the last commit.
    pub fn delete_all(&self) -> EngineResult<u64> {
        self.with_writer(|w| Ok(w.delete_query(Box::new(AllQuery))?))
    }

    /// Commits all pending operations and waits until they are durable.
    pub fn commit(&self) -> EngineResult<u64> {
        let opstamp = self.with_writer_mut(|w| Ok(w.commit()?))?;
        self.buffered.store(0, Ordering::Relaxed);
        Ok(opstamp)
    }

    /// Publishes pending operations as new segments without waiting for
    /// the commit to become durable.
    pub fn flush(&self) -> EngineResult<u64> {
        let opstamp = self.with_writer_mut(|w| {
            let prepared = w.prepare_commit()?;
            let opstamp = prepared.opstamp();
            // The commit runs on the segment updater; its result is not awaited.
            drop(prepared.commit_future());
            Ok(opstamp)
        })?;
        self.buffered.store(0, Ordering::Relaxed);
        Ok(opstamp)
    }

    /// Merges committed segments until at most `max_segments` remain.
    ///
    /// Blocks until the merge completes. The smallest segments are merged
    /// first.
    pub fn force_merge(&self, max_segments: usize) -> EngineResult<MergeOutcome> {
        if max_segments == 0 {
            return Err(EngineError::invalid_argument(
                "max_segments must be at least 1",
            ));
        }
        self.with_writer_mut(|w| {
            let mut metas = self.index.searchable_segment_metas()?;
            let segments_before = metas.len();
            if segments_before <= max_segments {
                return Ok(MergeOutcome {
                    segments_before,
                    segments_merged: 0,
                });
            }
            metas.sort_by_key(|meta| meta.num_docs());
            let segments_merged = segments_before - max_segments + 1;
            let ids: Vec<_> = metas.iter().take(segments_merged).map(|m| m.id()).collect();
            w.merge(&ids).wait()?;
            Ok(MergeOutcome {
                segments_before,
                segments_merged,
            })
        })
    }

    /// Counts documents through a fresh reader over committed segments.
    pub fn doc_stats(&self) -> EngineResult<DocStats> {
        let reader: tantivy::IndexReader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let searcher = reader.searcher();
        let mut stats = DocStats::default();
        for segment in searcher.segment_readers() {
            stats.num_docs += u64::from(segment.num_docs());
            stats.deleted_docs += u64::from(segment.num_deleted_docs());
            stats.max_doc += u64::from(segment.max_doc());
        }
        Ok(stats)
    }

    /// Returns the number of documents added since the last commit or flush.
    pub fn buffered_docs(&self) -> usize {
        self.buffered.load(Ordering::Relaxed)
    }

    /// Returns true once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.read().is_none()
    }

    /// Commits pending operations, waits for merges and releases the
    /// directory lock. A second call is a no-op.
    pub fn close(&self) -> EngineResult<()> {
        let Some(mut writer) = self.inner.write().take() else {
            return Ok(());
        };
        let committed = writer.commit().map(|_| ());
        let drained = writer.wait_merging_threads();
        committed?;
        drained?;
        Ok(())
    }

    fn note_buffered(&self) -> EngineResult<()> {
        let Some(limit) = self.max_buffered_docs else {
            return Ok(());
        };
        let pending = self.buffered.fetch_add(1, Ordering::Relaxed) + 1;
        if pending >= limit {
            tracing::debug!(pending, limit, "buffered document limit reached; flushing");
            self.flush()?;
        }
        Ok(())
    }
}

impl Drop for EngineWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close index writer");
        }
    }
}

impl std::fmt::Debug for EngineWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineWriter")
            .field("closed", &self.is_closed())
            .field("buffered", &self.buffered_docs())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{NativeField, PointValue, StoredValue};
    use tempfile::tempdir;

    fn doc(id: &str, price: i64) -> NativeDocument {
        vec![
            NativeField::keyword("_id", id, true),
            NativeField::stored("price", StoredValue::Long(price)),
            NativeField::point("price", PointValue::Long(price)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn resolve_threads_respects_arena_floor() {
        let config = WriterConfig::default();
        let (threads, budget) = config.resolve_threads();
        assert_eq!(threads, 1);
        assert!(budget >= MIN_BUDGET_PER_THREAD);

        let big = WriterConfig {
            memory_budget_bytes: 256 * 1024 * 1024,
            max_threads: 4,
            ..WriterConfig::default()
        };
        let (threads, budget) = big.resolve_threads();
        assert_eq!(threads, 4);
        assert!(budget / threads >= MIN_BUDGET_PER_THREAD);
    }

    #[test]
    fn add_update_delete_commit() {
        let dir = tempdir().unwrap();
        let directory = EngineDirectory::open(dir.path()).unwrap();
        let writer = EngineWriter::open(&directory, &WriterConfig::default()).unwrap();

        writer.add_document(&doc("a", 1)).unwrap();
        writer.add_document(&doc("b", 2)).unwrap();
        writer.commit().unwrap();
        assert_eq!(writer.doc_stats().unwrap().num_docs, 2);

        writer
            .update_document(&Term::new("_id", "a"), &doc("a", 3))
            .unwrap();
        writer.delete_term(&Term::new("_id", "b")).unwrap();
        writer.commit().unwrap();
        assert_eq!(writer.doc_stats().unwrap().num_docs, 1);

        writer.delete_all().unwrap();
        writer.commit().unwrap();
        assert_eq!(writer.doc_stats().unwrap().num_docs, 0);
    }

    #[test]
    fn delete_all_drops_uncommitted_documents() {
        let dir = tempdir().unwrap();
        let directory = EngineDirectory::open(dir.path()).unwrap();
        let writer = EngineWriter::open(&directory, &WriterConfig::default()).unwrap();

        writer.add_document(&doc("a", 1)).unwrap();
        writer.commit().unwrap();
        writer.add_document(&doc("b", 2)).unwrap();
        writer.delete_all().unwrap();
        writer.commit().unwrap();
        assert_eq!(writer.doc_stats().unwrap().num_docs, 0);

        writer.add_document(&doc("c", 3)).unwrap();
        writer.commit().unwrap();
        assert_eq!(writer.doc_stats().unwrap().num_docs, 1);
    }

    #[test]
    fn second_writer_is_rejected() {
        let dir = tempdir().unwrap();
        let directory = EngineDirectory::open(dir.path()).unwrap();
        let _first = EngineWriter::open(&directory, &WriterConfig::default()).unwrap();
        assert!(EngineWriter::open(&directory, &WriterConfig::default()).is_err());
    }

    #[test]
    fn closed_writer_rejects_operations() {
        let dir = tempdir().unwrap();
        let directory = EngineDirectory::open(dir.path()).unwrap();
        let writer = EngineWriter::open(&directory, &WriterConfig::default()).unwrap();
        writer.add_document(&doc("a", 1)).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        assert!(writer.is_closed());
        assert!(matches!(
            writer.add_document(&doc("b", 2)),
            Err(EngineError::WriterClosed)
        ));
        // close commits what was buffered
        let reopened = EngineWriter::open(&directory, &WriterConfig::default()).unwrap();
        assert_eq!(reopened.doc_stats().unwrap().num_docs, 1);
    }

    #[test]
    fn force_merge_reduces_segments() {
        let dir = tempdir().unwrap();
        let directory = EngineDirectory::open(dir.path()).unwrap();
        let config = WriterConfig {
            merge_policy: MergePolicyConfig::NoMerge,
            ..WriterConfig::default()
        };
        let writer = EngineWriter::open(&directory, &config).unwrap();
        for i in 0..3 {
            writer.add_document(&doc(&i.to_string(), i)).unwrap();
            writer.commit().unwrap();
        }
        assert_eq!(directory.segment_count().unwrap(), 3);

        let outcome = writer.force_merge(1).unwrap();
        assert_eq!(outcome.segments_before, 3);
        assert_eq!(outcome.segments_merged, 3);
        assert_eq!(directory.segment_count().unwrap(), 1);
        assert_eq!(writer.doc_stats().unwrap().num_docs, 3);

        assert!(writer.force_merge(0).is_err());
    }
}
