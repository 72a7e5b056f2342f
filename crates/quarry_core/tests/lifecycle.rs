//! End-to-end index scenarios through the manager.

use quarry_core::{
    Document, FieldConfig, FieldValue, IndexError, IndexSettings, IndexState, Query,
};
use quarry_testkit::prelude::*;
use std::time::{Duration, Instant};

#[test]
fn articles_keyword_search_is_exact() {
    init_tracing();
    let manager = TestManager::new();
    let articles = manager.create_quiet("articles");
    articles.add_documents(&sample_documents()).unwrap();
    manager.refresh_index("articles").unwrap();

    let searcher = articles.acquire_searcher().unwrap();
    assert_eq!(searcher.num_docs(), 5);
    let tech = searcher.search(&Query::term("category", "tech"), 10).unwrap();
    assert_eq!(tech.total_hits, 3);
    assert_eq!(tech.hits.len(), 3);
    assert_eq!(searcher.count(&Query::term("category", "tec")).unwrap(), 0);
    assert_eq!(searcher.count(&Query::term("category", "TECH")).unwrap(), 0);

    let rust = searcher
        .search_documents(&Query::text("title", "RUST ownership"), 10)
        .unwrap();
    assert_eq!(rust.len(), 1);
    assert_eq!(rust[0].id(), "1");
}

#[test]
fn price_range_matches_only_inner_value() {
    let index = TestIndex::new("products");
    index
        .add_documents(&[
            article("cheap", "Cheap", "x", 50.0),
            article("mid", "Mid", "x", 100.0),
            article("dear", "Dear", "x", 150.0),
        ])
        .unwrap();
    index.refresh().unwrap();

    let searcher = index.acquire_searcher().unwrap();
    let docs = searcher
        .search_documents(&Query::double_range("price", 75.0, 125.0), 10)
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id(), "mid");
    assert_eq!(docs[0].get_first("price"), Some(&FieldValue::Double(100.0)));
}

#[test]
fn update_replaces_previous_version() {
    let index = TestIndex::new("versions");
    index
        .add_document(&Document::new("doc1").with_long("version", 1))
        .unwrap();
    index.refresh().unwrap();
    index
        .update_document("doc1", &Document::new("doc1").with_long("version", 2))
        .unwrap();
    index.refresh().unwrap();

    let searcher = index.acquire_searcher().unwrap();
    assert_eq!(searcher.num_docs(), 1);
    assert_eq!(
        searcher.count(&Query::long_range("version", 1, 1)).unwrap(),
        0
    );
    let hits = searcher
        .search_documents(&Query::long_range("version", 2, 2), 10)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].get_first("version"), Some(&FieldValue::Long(2)));
}

#[test]
fn bulk_indexing_and_int_ranges() {
    let index = TestIndex::new("bulk");
    index.add_documents(&numbered_documents(100)).unwrap();
    index.commit().unwrap();
    index.refresh().unwrap();

    let searcher = index.acquire_searcher().unwrap();
    assert_eq!(searcher.num_docs(), 100);
    assert_eq!(searcher.count(&Query::int_range("n", 50, 59)).unwrap(), 10);
    assert_eq!(
        searcher
            .count(&Query::all_of(vec![
                Query::int_range("n", 50, 59),
                Query::term("parity", "even"),
            ]))
            .unwrap(),
        5
    );
    assert_eq!(index.stats().total_docs(), 100);
    assert_eq!(index.stats().index_total(), 100);
}

#[test]
fn get_document_round_trips_fields() {
    let index = TestIndex::new("roundtrip");
    let mut doc = Document::new("42")
        .with_text("title", "A title")
        .with_integer("count", 7)
        .with_boolean("published", true)
        .with_binary("blob", vec![0xde, 0xad]);
    doc.add_fields("tags", ["b", "a", "b"], FieldConfig::keyword());
    index.add_document(&doc).unwrap();
    index.refresh().unwrap();

    let loaded = index.get_document("42").unwrap().unwrap();
    assert_eq!(loaded.id(), "42");
    assert_eq!(loaded.get_first("title"), Some(&FieldValue::from("A title")));
    assert_eq!(loaded.get_first("count"), Some(&FieldValue::Integer(7)));
    assert_eq!(loaded.get_first("published"), Some(&FieldValue::from("true")));
    assert_eq!(
        loaded.get_first("blob"),
        Some(&FieldValue::Binary(vec![0xde, 0xad]))
    );
    assert_eq!(
        loaded.values("tags"),
        &[FieldValue::from("b"), FieldValue::from("a")]
    );
    assert!(index.get_document("43").unwrap().is_none());
}

#[test]
fn delete_index_removes_storage() {
    let manager = TestManager::new();
    let index = manager.create_quiet("doomed");
    index.add_documents(&sample_documents()).unwrap();
    manager.commit_index("doomed").unwrap();
    let path = index.path().to_path_buf();
    assert!(path.exists());

    manager.delete_index("doomed").unwrap();
    assert!(!path.exists());
    assert_eq!(index.state(), IndexState::Deleting);
    assert!(matches!(
        index.add_document(&Document::new("x")),
        Err(IndexError::InvalidState { .. })
    ));
    assert!(manager.index_names().unwrap().is_empty());
}

#[test]
fn reopened_manager_discovers_committed_data() {
    let manager = TestManager::new();
    manager.create_quiet("logs-2023");
    let logs = manager.create_quiet("logs-2024");
    logs.add_documents(&numbered_documents(10)).unwrap();
    manager.commit_index("logs-2024").unwrap();
    drop(logs);

    let manager = manager.reopen();
    assert_eq!(manager.index_names().unwrap(), vec!["logs-2023", "logs-2024"]);
    assert_eq!(manager.indices_by_pattern("logs-*").unwrap().len(), 2);

    let logs = manager.get_index("logs-2024").unwrap();
    assert_eq!(logs.state(), IndexState::Open);
    assert_eq!(logs.doc_count().unwrap(), 10);
    assert_eq!(manager.cluster_stats().unwrap().open_indices, 2);
}

#[test]
fn close_commits_pending_writes() {
    let manager = TestManager::new();
    let index = manager.create_quiet("pending");
    index.add_documents(&numbered_documents(3)).unwrap();
    manager.close_index("pending").unwrap();
    manager.open_index("pending").unwrap();
    assert_eq!(index.doc_count().unwrap(), 3);
}

#[test]
fn refresh_all_reports_every_failure() {
    let manager = TestManager::new();
    manager.create_quiet("a");
    manager.create_quiet("b");
    manager.close_index("b").unwrap();

    // Refreshing a closed index is tolerated.
    manager.refresh_all().unwrap();

    let err = manager
        .refresh_indices(&["a", "nope-1", "b", "nope-2"])
        .unwrap_err();
    assert_eq!(err.failures().len(), 2);
    assert!(err
        .failures()
        .iter()
        .all(|e| matches!(e, IndexError::NotFound { .. })));
}

#[test]
fn aliases_follow_swaps() {
    let manager = TestManager::new();
    let v1 = manager.create_quiet("products-v1");
    let v2 = manager.create_quiet("products-v2");
    v1.add_document(&Document::new("old")).unwrap();
    v2.add_document(&Document::new("new")).unwrap();
    manager.refresh_all().unwrap();

    manager.add_alias("products-v1", "products").unwrap();
    let current = manager.get_index("products").unwrap();
    assert!(current.get_document("old").unwrap().is_some());

    manager
        .swap_alias("products", "products-v1", "products-v2")
        .unwrap();
    let current = manager.get_index("products").unwrap();
    assert_eq!(current.name(), "products-v2");
    assert!(current.get_document("new").unwrap().is_some());
    assert_eq!(
        manager.aliases().unwrap().get("products"),
        Some(&vec!["products-v2".to_string()])
    );
    assert!(manager
        .index_metadata("products-v2")
        .unwrap()
        .aliases
        .contains_key("products"));
}

#[test]
fn background_tasks_publish_and_persist() {
    let manager = TestManager::new();
    let settings = IndexSettings::builder()
        .refresh_interval(Duration::from_millis(20))
        .commit_interval(Duration::from_millis(20))
        .build();
    let index = manager.create_index("auto", settings).unwrap();
    index.add_documents(&numbered_documents(5)).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while index.doc_count().unwrap() < 5 || index.stats().total_docs() < 5 {
        assert!(Instant::now() < deadline, "background tasks never ran");
        std::thread::sleep(Duration::from_millis(10));
    }
    manager.close().unwrap();
    assert_eq!(index.state(), IndexState::Closed);
}
