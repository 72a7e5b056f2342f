//! Scoped searcher acquisition.

use super::IndexCore;
use crate::document::{Document, DocumentConverter};
use crate::error::IndexResult;
use quarry_engine::{DocAddress, Query, Searcher, TopDocs};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// A point-in-time searcher over one index, released on drop.
///
/// Searches are clamped to the manager's maximum result window and
/// recorded in the index statistics.
pub struct SearcherGuard {
    searcher: Searcher,
    core: Arc<IndexCore>,
}

impl SearcherGuard {
    pub(crate) fn new(searcher: Searcher, core: Arc<IndexCore>) -> Self {
        core.stats.search_started();
        Self { searcher, core }
    }

    /// Runs `query`, returning at most `limit` hits.
    ///
    /// `limit` is clamped to the maximum result window; zero counts
    /// matches without collecting hits.
    pub fn search(&self, query: &Query, limit: usize) -> IndexResult<TopDocs> {
        let limit = limit.min(self.core.options.max_result_window);
        let started = Instant::now();
        let result = self.searcher.search(query, limit);
        let elapsed = started.elapsed();
        self.core.stats.record_search(elapsed);
        if self.core.options.is_slow(elapsed) {
            warn!(
                index = %self.core.name,
                elapsed_ms = elapsed.as_millis() as u64,
                ?query,
                "slow search"
            );
        }
        Ok(result?)
    }

    /// Counts documents matching `query`.
    pub fn count(&self, query: &Query) -> IndexResult<usize> {
        let started = Instant::now();
        let count = self.searcher.count(query)?;
        self.core.stats.record_search(started.elapsed());
        Ok(count)
    }

    /// Loads and lifts the document at `address`.
    pub fn doc(&self, address: DocAddress) -> IndexResult<Document> {
        let started = Instant::now();
        let native = self.searcher.doc(address)?;
        let doc = DocumentConverter::from_native(&native)?;
        self.core.stats.record_fetch(started.elapsed());
        Ok(doc)
    }

    /// Runs `query` and loads every returned hit.
    pub fn search_documents(&self, query: &Query, limit: usize) -> IndexResult<Vec<Document>> {
        self.search(query, limit)?
            .hits
            .iter()
            .map(|hit| self.doc(hit.address))
            .collect()
    }

    /// Live documents in the snapshot.
    pub fn num_docs(&self) -> u64 {
        self.searcher.num_docs()
    }

    /// The underlying engine searcher.
    pub fn engine_searcher(&self) -> &Searcher {
        &self.searcher
    }
}

impl Drop for SearcherGuard {
    fn drop(&mut self) {
        self.core.stats.search_finished();
    }
}

impl std::fmt::Debug for SearcherGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearcherGuard")
            .field("index", &self.core.name)
            .field("num_docs", &self.num_docs())
            .finish()
    }
}
