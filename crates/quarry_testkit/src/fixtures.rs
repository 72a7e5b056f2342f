//! Test fixtures and manager helpers.
//!
//! Provides managers and indices backed by temporary directories, plus
//! canned documents for common search scenarios.

use quarry_core::{Document, FieldConfig, Index, IndexManager, IndexSettings, QuarryConfig};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Settings with background refresh and commit disabled, so tests control
/// visibility explicitly.
pub fn quiet_settings() -> IndexSettings {
    IndexSettings::builder()
        .auto_refresh(false)
        .auto_commit(false)
        .build()
}

/// A manager over a temporary storage root.
pub struct TestManager {
    /// The manager instance.
    pub manager: IndexManager,
    /// The temporary directory (declared last so it outlives the manager).
    temp_dir: TempDir,
}

impl TestManager {
    /// Opens a manager with default configuration.
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    /// Opens a manager after adjusting the configuration. The base path is
    /// always the temporary directory.
    pub fn with_config(configure: impl FnOnce(QuarryConfig) -> QuarryConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let manager = open_manager(temp_dir.path(), configure);
        Self { manager, temp_dir }
    }

    /// Storage root.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Creates an index with [`quiet_settings`].
    pub fn create_quiet(&self, name: &str) -> Arc<Index> {
        self.manager
            .create_index(name, quiet_settings())
            .expect("Failed to create index")
    }

    /// Closes the manager and opens a new one over the same directory.
    pub fn reopen(self) -> Self {
        let Self { manager, temp_dir } = self;
        manager.close().expect("Failed to close manager");
        drop(manager);
        let manager = open_manager(temp_dir.path(), |config| config);
        Self { manager, temp_dir }
    }
}

impl Default for TestManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestManager {
    type Target = IndexManager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

fn open_manager(
    path: &Path,
    configure: impl FnOnce(QuarryConfig) -> QuarryConfig,
) -> IndexManager {
    let config = configure(QuarryConfig::new()).base_path(path);
    IndexManager::open(config).expect("Failed to open index manager")
}

/// A single quiet index owned by its own temporary manager.
pub struct TestIndex {
    /// The index instance.
    pub index: Arc<Index>,
    manager: TestManager,
}

impl TestIndex {
    /// Creates an index named `name` with [`quiet_settings`].
    pub fn new(name: &str) -> Self {
        let manager = TestManager::new();
        let index = manager.create_quiet(name);
        Self { index, manager }
    }

    /// The owning manager.
    pub fn manager(&self) -> &TestManager {
        &self.manager
    }
}

impl std::ops::Deref for TestIndex {
    type Target = Index;

    fn deref(&self) -> &Self::Target {
        &self.index
    }
}

/// An article with a title, a keyword category and a double price.
pub fn article(id: &str, title: &str, category: &str, price: f64) -> Document {
    Document::new(id)
        .with_text("title", title)
        .with_keyword("category", category)
        .with_double("price", price)
}

/// Five articles: three in `tech`, one in `science`, one in `technology`.
pub fn sample_documents() -> Vec<Document> {
    vec![
        article("1", "Rust ownership explained", "tech", 50.0),
        article("2", "Async runtimes compared", "tech", 100.0),
        article("3", "Inverted indices from scratch", "tech", 150.0),
        article("4", "Protein folding", "science", 75.0),
        article("5", "History of the transistor", "technology", 20.0),
    ]
}

/// `count` documents with ids `0..count`, an integer field `n` and a keyword
/// `parity`.
pub fn numbered_documents(count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| {
            let n = i32::try_from(i).expect("count fits in i32");
            Document::new(i.to_string())
                .with_integer("n", n)
                .with_field("parity", if n % 2 == 0 { "even" } else { "odd" }, FieldConfig::keyword())
        })
        .collect()
}
