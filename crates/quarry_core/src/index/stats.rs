//! Per-index operation statistics.
//!
//! All counters are atomic and may be read while operations are in flight.
//! Times are accumulated in microseconds.

use super::metadata::now_millis;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

fn average_millis(total_micros: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total_micros as f64 / count as f64 / 1000.0
    }
}

/// Live counters for one index.
#[derive(Debug)]
pub struct IndexStats {
    created: Instant,

    total_docs: AtomicU64,
    deleted_docs: AtomicU64,
    max_doc: AtomicU64,

    index_total: AtomicU64,
    index_time: AtomicU64,
    index_current: AtomicU64,
    index_failed: AtomicU64,
    last_index_time: AtomicU64,

    delete_total: AtomicU64,
    delete_time: AtomicU64,
    delete_failed: AtomicU64,

    get_total: AtomicU64,
    get_time: AtomicU64,
    get_exists: AtomicU64,
    get_missing: AtomicU64,

    search_query_total: AtomicU64,
    search_query_time: AtomicU64,
    search_current: AtomicU64,
    search_fetch_total: AtomicU64,
    search_fetch_time: AtomicU64,
    last_search_time: AtomicU64,

    refresh_total: AtomicU64,
    refresh_time: AtomicU64,
    last_refresh_time: AtomicU64,

    flush_total: AtomicU64,
    flush_time: AtomicU64,
    last_flush_time: AtomicU64,

    commit_total: AtomicU64,
    commit_time: AtomicU64,

    merge_total: AtomicU64,
    merge_time: AtomicU64,
    merge_current: AtomicU64,
    merge_segments: AtomicU64,

    store_size: AtomicU64,
}

impl Default for IndexStats {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self {
            created: Instant::now(),
            total_docs: AtomicU64::new(0),
            deleted_docs: AtomicU64::new(0),
            max_doc: AtomicU64::new(0),
            index_total: AtomicU64::new(0),
            index_time: AtomicU64::new(0),
            index_current: AtomicU64::new(0),
            index_failed: AtomicU64::new(0),
            last_index_time: AtomicU64::new(0),
            delete_total: AtomicU64::new(0),
            delete_time: AtomicU64::new(0),
            delete_failed: AtomicU64::new(0),
            get_total: AtomicU64::new(0),
            get_time: AtomicU64::new(0),
            get_exists: AtomicU64::new(0),
            get_missing: AtomicU64::new(0),
            search_query_total: AtomicU64::new(0),
            search_query_time: AtomicU64::new(0),
            search_current: AtomicU64::new(0),
            search_fetch_total: AtomicU64::new(0),
            search_fetch_time: AtomicU64::new(0),
            last_search_time: AtomicU64::new(0),
            refresh_total: AtomicU64::new(0),
            refresh_time: AtomicU64::new(0),
            last_refresh_time: AtomicU64::new(0),
            flush_total: AtomicU64::new(0),
            flush_time: AtomicU64::new(0),
            last_flush_time: AtomicU64::new(0),
            commit_total: AtomicU64::new(0),
            commit_time: AtomicU64::new(0),
            merge_total: AtomicU64::new(0),
            merge_time: AtomicU64::new(0),
            merge_current: AtomicU64::new(0),
            merge_segments: AtomicU64::new(0),
            store_size: AtomicU64::new(0),
        }
    }

    fn stamp(slot: &AtomicU64) {
        slot.store(u64::try_from(now_millis()).unwrap_or(0), Ordering::Relaxed);
    }

    // === Recording (internal use) ===

    pub(crate) fn update_doc_counts(&self, total: u64, deleted: u64, max: u64) {
        self.total_docs.store(total, Ordering::Relaxed);
        self.deleted_docs.store(deleted, Ordering::Relaxed);
        self.max_doc.store(max, Ordering::Relaxed);
    }

    pub(crate) fn update_store_size(&self, bytes: u64) {
        self.store_size.store(bytes, Ordering::Relaxed);
    }

    pub(crate) fn index_started(&self) {
        self.index_current.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `docs` documents indexed in `elapsed`.
    pub(crate) fn record_indexing(&self, docs: u64, elapsed: Duration, success: bool) {
        self.index_current.fetch_sub(1, Ordering::Relaxed);
        if success {
            self.index_total.fetch_add(docs, Ordering::Relaxed);
        } else {
            self.index_failed.fetch_add(docs, Ordering::Relaxed);
        }
        self.index_time.fetch_add(micros(elapsed), Ordering::Relaxed);
        Self::stamp(&self.last_index_time);
    }

    pub(crate) fn record_delete(&self, elapsed: Duration, success: bool) {
        if success {
            self.delete_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.delete_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.delete_time.fetch_add(micros(elapsed), Ordering::Relaxed);
    }

    pub(crate) fn record_get(&self, elapsed: Duration, exists: bool) {
        self.get_total.fetch_add(1, Ordering::Relaxed);
        self.get_time.fetch_add(micros(elapsed), Ordering::Relaxed);
        if exists {
            self.get_exists.fetch_add(1, Ordering::Relaxed);
        } else {
            self.get_missing.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn search_started(&self) {
        self.search_current.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn search_finished(&self) {
        // Saturating: a reset while searchers are out must not wrap.
        let _ = self
            .search_current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }

    pub(crate) fn record_search(&self, elapsed: Duration) {
        self.search_query_total.fetch_add(1, Ordering::Relaxed);
        self.search_query_time.fetch_add(micros(elapsed), Ordering::Relaxed);
        Self::stamp(&self.last_search_time);
    }

    pub(crate) fn record_fetch(&self, elapsed: Duration) {
        self.search_fetch_total.fetch_add(1, Ordering::Relaxed);
        self.search_fetch_time.fetch_add(micros(elapsed), Ordering::Relaxed);
    }

    pub(crate) fn record_refresh(&self, elapsed: Duration) {
        self.refresh_total.fetch_add(1, Ordering::Relaxed);
        self.refresh_time.fetch_add(micros(elapsed), Ordering::Relaxed);
        Self::stamp(&self.last_refresh_time);
    }

    pub(crate) fn record_flush(&self, elapsed: Duration) {
        self.flush_total.fetch_add(1, Ordering::Relaxed);
        self.flush_time.fetch_add(micros(elapsed), Ordering::Relaxed);
        Self::stamp(&self.last_flush_time);
    }

    pub(crate) fn record_commit(&self, elapsed: Duration) {
        self.commit_total.fetch_add(1, Ordering::Relaxed);
        self.commit_time.fetch_add(micros(elapsed), Ordering::Relaxed);
    }

    pub(crate) fn merge_started(&self) {
        self.merge_current.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_merge(&self, elapsed: Duration, segments: u64) {
        self.merge_current.fetch_sub(1, Ordering::Relaxed);
        self.merge_total.fetch_add(1, Ordering::Relaxed);
        self.merge_time.fetch_add(micros(elapsed), Ordering::Relaxed);
        self.merge_segments.fetch_add(segments, Ordering::Relaxed);
    }

    /// Zeroes every cumulative counter. Gauges for in-flight operations and
    /// document counts are kept.
    pub fn reset(&self) {
        for counter in [
            &self.index_total,
            &self.index_time,
            &self.index_failed,
            &self.delete_total,
            &self.delete_time,
            &self.delete_failed,
            &self.get_total,
            &self.get_time,
            &self.get_exists,
            &self.get_missing,
            &self.search_query_total,
            &self.search_query_time,
            &self.search_fetch_total,
            &self.search_fetch_time,
            &self.refresh_total,
            &self.refresh_time,
            &self.flush_total,
            &self.flush_time,
            &self.commit_total,
            &self.commit_time,
            &self.merge_total,
            &self.merge_time,
            &self.merge_segments,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    // === Getters (public API) ===

    /// Live documents at the last commit.
    pub fn total_docs(&self) -> u64 {
        self.total_docs.load(Ordering::Relaxed)
    }

    /// Documents indexed successfully.
    pub fn index_total(&self) -> u64 {
        self.index_total.load(Ordering::Relaxed)
    }

    /// Documents that failed to index.
    pub fn index_failed(&self) -> u64 {
        self.index_failed.load(Ordering::Relaxed)
    }

    /// Indexing calls in flight.
    pub fn index_current(&self) -> u64 {
        self.index_current.load(Ordering::Relaxed)
    }

    /// Searchers currently acquired.
    pub fn search_current(&self) -> u64 {
        self.search_current.load(Ordering::Relaxed)
    }

    /// Completed refreshes.
    pub fn refresh_total(&self) -> u64 {
        self.refresh_total.load(Ordering::Relaxed)
    }

    /// Completed commits.
    pub fn commit_total(&self) -> u64 {
        self.commit_total.load(Ordering::Relaxed)
    }

    /// On-disk size at the last commit.
    pub fn store_size_in_bytes(&self) -> u64 {
        self.store_size.load(Ordering::Relaxed)
    }

    /// Copies every counter and derives averages and rates.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |a: &AtomicU64| a.load(Ordering::Relaxed);
        let elapsed = self.created.elapsed().as_secs_f64();
        let rate = |count: u64| {
            if elapsed > 0.0 {
                count as f64 / elapsed
            } else {
                0.0
            }
        };

        let index_total = load(&self.index_total);
        let search_total = load(&self.search_query_total);
        StatsSnapshot {
            docs: DocsStats {
                count: load(&self.total_docs),
                deleted: load(&self.deleted_docs),
                max_doc: load(&self.max_doc),
            },
            indexing: IndexingStats {
                total: index_total,
                time_micros: load(&self.index_time),
                current: load(&self.index_current),
                failed: load(&self.index_failed),
                last_millis: load(&self.last_index_time),
                delete_total: load(&self.delete_total),
                delete_time_micros: load(&self.delete_time),
                delete_failed: load(&self.delete_failed),
            },
            get: GetStats {
                total: load(&self.get_total),
                time_micros: load(&self.get_time),
                exists: load(&self.get_exists),
                missing: load(&self.get_missing),
            },
            search: SearchStats {
                query_total: search_total,
                query_time_micros: load(&self.search_query_time),
                current: load(&self.search_current),
                fetch_total: load(&self.search_fetch_total),
                fetch_time_micros: load(&self.search_fetch_time),
                last_millis: load(&self.last_search_time),
            },
            refresh: TimedStats {
                total: load(&self.refresh_total),
                time_micros: load(&self.refresh_time),
                last_millis: load(&self.last_refresh_time),
            },
            flush: TimedStats {
                total: load(&self.flush_total),
                time_micros: load(&self.flush_time),
                last_millis: load(&self.last_flush_time),
            },
            commit: TimedStats {
                total: load(&self.commit_total),
                time_micros: load(&self.commit_time),
                last_millis: 0,
            },
            merge: MergeStats {
                total: load(&self.merge_total),
                time_micros: load(&self.merge_time),
                current: load(&self.merge_current),
                segments_merged: load(&self.merge_segments),
            },
            store_size_in_bytes: load(&self.store_size),
            average_index_time_millis: average_millis(load(&self.index_time), index_total),
            average_search_time_millis: average_millis(
                load(&self.search_query_time),
                search_total,
            ),
            indexing_rate: rate(index_total),
            search_rate: rate(search_total),
        }
    }
}

/// Document counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DocsStats {
    /// Live documents.
    pub count: u64,
    /// Deleted documents awaiting merge.
    pub deleted: u64,
    /// Live plus deleted.
    pub max_doc: u64,
}

/// Write-path counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IndexingStats {
    /// Documents indexed.
    pub total: u64,
    /// Time spent indexing.
    pub time_micros: u64,
    /// Calls in flight.
    pub current: u64,
    /// Documents that failed.
    pub failed: u64,
    /// Last indexing call, epoch millis.
    pub last_millis: u64,
    /// Delete calls.
    pub delete_total: u64,
    /// Time spent deleting.
    pub delete_time_micros: u64,
    /// Delete calls that failed.
    pub delete_failed: u64,
}

/// Identifier lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GetStats {
    /// Lookups.
    pub total: u64,
    /// Time spent.
    pub time_micros: u64,
    /// Lookups that found a document.
    pub exists: u64,
    /// Lookups that found nothing.
    pub missing: u64,
}

/// Read-path counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SearchStats {
    /// Queries executed.
    pub query_total: u64,
    /// Time spent executing queries.
    pub query_time_micros: u64,
    /// Searchers currently acquired.
    pub current: u64,
    /// Fetch phases executed.
    pub fetch_total: u64,
    /// Time spent loading documents.
    pub fetch_time_micros: u64,
    /// Last query, epoch millis.
    pub last_millis: u64,
}

/// Counter and accumulated time of a maintenance operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimedStats {
    /// Completed operations.
    pub total: u64,
    /// Time spent.
    pub time_micros: u64,
    /// Last completion, epoch millis. Zero if never or untracked.
    pub last_millis: u64,
}

/// Merge counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MergeStats {
    /// Forced merges run.
    pub total: u64,
    /// Time spent merging.
    pub time_micros: u64,
    /// Merges in flight.
    pub current: u64,
    /// Segments folded away.
    pub segments_merged: u64,
}

/// Point-in-time copy of [`IndexStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Document counts.
    pub docs: DocsStats,
    /// Write path.
    pub indexing: IndexingStats,
    /// Identifier lookups.
    pub get: GetStats,
    /// Read path.
    pub search: SearchStats,
    /// Refreshes.
    pub refresh: TimedStats,
    /// Flushes.
    pub flush: TimedStats,
    /// Commits.
    pub commit: TimedStats,
    /// Forced merges.
    pub merge: MergeStats,
    /// On-disk size.
    pub store_size_in_bytes: u64,
    /// Mean time per indexed document.
    pub average_index_time_millis: f64,
    /// Mean time per query.
    pub average_search_time_millis: f64,
    /// Documents per second since creation.
    pub indexing_rate: f64,
    /// Queries per second since creation.
    pub search_rate: f64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "docs={} indexed={} ({:.2}/s) searches={} ({:.2}/s) size={} bytes",
            self.docs.count,
            self.indexing.total,
            self.indexing_rate,
            self.search.query_total,
            self.search_rate,
            self.store_size_in_bytes
        )
    }
}
