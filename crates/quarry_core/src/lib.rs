//! # Quarry Core
//!
//! Index lifecycle management over an embedded full-text engine.
//!
//! This crate provides:
//! - [`Document`] and [`DocumentConverter`]: typed multi-valued documents and
//!   their lossless mapping onto engine fields
//! - [`Index`]: one index with its writer, searchers, background refresh and
//!   commit, and a lifecycle state machine
//! - [`IndexRegistry`]: name and alias lookup, glob matching, discovery
//! - [`IndexManager`]: the entry point serializing structural operations
//! - [`IndexSettings`], [`IndexMetadata`] and [`IndexStats`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use quarry_core::{Document, IndexManager, IndexSettings, QuarryConfig, Query};
//!
//! # fn main() -> quarry_core::IndexResult<()> {
//! let manager = IndexManager::open(QuarryConfig::new().base_path("data/indices"))?;
//! let articles = manager.create_index("articles", IndexSettings::default())?;
//!
//! articles.add_document(
//!     &Document::new("1")
//!         .with_text("title", "Rust full-text search")
//!         .with_keyword("category", "tech")
//!         .with_double("price", 42.0),
//! )?;
//! articles.refresh()?;
//!
//! let searcher = articles.acquire_searcher()?;
//! let hits = searcher.search(&Query::term("category", "tech"), 10)?;
//! assert_eq!(hits.total_hits, 1);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod data_dir;
mod document;
mod error;
mod index;
mod manager;
mod naming;
mod registry;

pub use config::{
    QuarryConfig, BASE_PATH_KEY, DISCOVER_KEY, MAX_INDICES_KEY, MAX_RESULT_WINDOW_KEY,
    SLOW_LOG_ENABLED_KEY, SLOW_LOG_THRESHOLD_KEY,
};
pub use document::{
    millis_to_system_time, Document, DocumentConverter, FieldConfig, FieldConfigBuilder,
    FieldType, FieldValue, ID_FIELD, INTERNAL_PREFIX,
};
pub use error::{IndexError, IndexResult, ValidationError};
pub use index::{
    DocsStats, GetStats, Index, IndexMetadata, IndexSettings, IndexSettingsBuilder, IndexState,
    IndexStats, IndexingStats, MergePolicyType, MergeStats, MetadataSnapshot, SearchStats,
    SearcherGuard, StatsSnapshot, TimedStats, UnknownState, SHUTDOWN_GRACE,
};
pub use manager::IndexManager;
pub use naming::{glob_matches, validate_index_name, MAX_INDEX_NAME_LEN};
pub use registry::{ClusterStats, IndexRegistry};

pub use quarry_engine::{DocAddress, Query, ScoredDoc, TopDocs};
