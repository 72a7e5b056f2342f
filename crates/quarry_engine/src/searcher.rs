//! Refresh-aware searcher management.

use crate::directory::EngineDirectory;
use crate::error::EngineResult;
use crate::field::NativeDocument;
use crate::query::Query;
use crate::schema::EngineSchema;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs as TopDocsCollector};
use tantivy::{DocAddress, IndexReader, ReloadPolicy, TantivyDocument};

/// Hands out point-in-time searchers and swaps in new ones on refresh.
///
/// Searchers acquired before a refresh keep seeing the old snapshot.
pub struct SearcherManager {
    reader: IndexReader,
    schema: Arc<EngineSchema>,
}

impl SearcherManager {
    /// Opens a manager over the committed state of `directory`.
    pub fn open(directory: &EngineDirectory) -> EngineResult<Self> {
        let reader = directory
            .index()
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            reader,
            schema: Arc::clone(directory.schema()),
        })
    }

    /// Reloads the reader so new searchers see the latest published segments.
    pub fn maybe_refresh(&self) -> EngineResult<()> {
        self.reader.reload()?;
        Ok(())
    }

    /// Acquires the current snapshot. Dropping the searcher releases it.
    pub fn acquire(&self) -> Searcher {
        Searcher {
            inner: self.reader.searcher(),
            schema: Arc::clone(&self.schema),
        }
    }
}

impl std::fmt::Debug for SearcherManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearcherManager").finish_non_exhaustive()
    }
}

/// A scored hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    /// Relevance score.
    pub score: f32,
    /// Address of the document within the searcher's snapshot.
    pub address: DocAddress,
}

/// The result of a search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopDocs {
    /// Number of matching documents, not limited by the hit count.
    pub total_hits: usize,
    /// Best hits, highest score first.
    pub hits: Vec<ScoredDoc>,
}

/// A point-in-time view of an index.
#[derive(Clone)]
pub struct Searcher {
    inner: tantivy::Searcher,
    schema: Arc<EngineSchema>,
}

impl Searcher {
    /// Runs `query` and returns up to `limit` hits.
    pub fn search(&self, query: &Query, limit: usize) -> EngineResult<TopDocs> {
        let query = query.to_tantivy(&self.schema);
        if limit == 0 {
            let total_hits = self.inner.search(query.as_ref(), &Count)?;
            return Ok(TopDocs {
                total_hits,
                hits: Vec::new(),
            });
        }
        let (total_hits, top) = self
            .inner
            .search(query.as_ref(), &(Count, TopDocsCollector::with_limit(limit)))?;
        Ok(TopDocs {
            total_hits,
            hits: top
                .into_iter()
                .map(|(score, address)| ScoredDoc { score, address })
                .collect(),
        })
    }

    /// Counts documents matching `query`.
    pub fn count(&self, query: &Query) -> EngineResult<usize> {
        let query = query.to_tantivy(&self.schema);
        Ok(self.inner.search(query.as_ref(), &Count)?)
    }

    /// Loads the stored fields of a hit.
    pub fn doc(&self, address: DocAddress) -> EngineResult<NativeDocument> {
        let doc: TantivyDocument = self.inner.doc(address)?;
        self.schema.from_tantivy(&doc)
    }

    /// Returns the number of live documents in the snapshot.
    pub fn num_docs(&self) -> u64 {
        self.inner.num_docs()
    }
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("num_docs", &self.num_docs())
            .finish_non_exhaustive()
    }
}
