//! # Quarry Engine
//!
//! Embedded full-text engine adapter for Quarry.
//!
//! This crate wraps [tantivy](https://docs.rs/tantivy) behind the small
//! surface the index lifecycle layer needs:
//!
//! - [`EngineDirectory`]: open or create an index directory, list its files
//! - [`EngineWriter`]: the single writer (add, update and delete by term,
//!   delete by query, commit, flush, force merge)
//! - [`SearcherManager`] and [`Searcher`]: refresh-aware point-in-time reads
//! - [`NativeDocument`]: the physical field model documents are lowered to
//!
//! ## Example
//!
//! ```rust,no_run
//! use quarry_engine::{
//!     EngineDirectory, EngineWriter, NativeDocument, NativeField, Query, SearcherManager,
//!     WriterConfig,
//! };
//!
//! # fn main() -> quarry_engine::EngineResult<()> {
//! let directory = EngineDirectory::open(std::path::Path::new("data/articles"))?;
//! let writer = EngineWriter::open(&directory, &WriterConfig::default())?;
//! let searchers = SearcherManager::open(&directory)?;
//!
//! let mut doc = NativeDocument::new();
//! doc.add(NativeField::keyword("_id", "1", true));
//! doc.add(NativeField::text("title", "Hello world", true));
//! writer.add_document(&doc)?;
//! writer.commit()?;
//! searchers.maybe_refresh()?;
//!
//! let hits = searchers.acquire().search(&Query::text("title", "hello"), 10)?;
//! assert_eq!(hits.total_hits, 1);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod analysis;
mod directory;
mod encoding;
mod error;
mod field;
mod query;
mod schema;
mod searcher;
mod writer;

pub use analysis::{Analyzer, MAX_TOKEN_LEN};
pub use directory::EngineDirectory;
pub use error::{EngineError, EngineResult};
pub use field::{NativeDocument, NativeField, PointValue, StoredValue, Term};
pub use query::Query;
pub use schema::{EngineSchema, POINTS_FIELD, STORED_FIELD, TERMS_FIELD};
pub use searcher::{ScoredDoc, Searcher, SearcherManager, TopDocs};
pub use tantivy::DocAddress;
pub use writer::{
    DocStats, EngineWriter, MergeOutcome, MergePolicyConfig, WriterConfig, MAX_BUDGET_PER_THREAD,
    MIN_BUDGET_PER_THREAD,
};
