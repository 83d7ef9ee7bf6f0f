use super::*;
use tempfile::TempDir;

const DIMENSION: usize = 4;

async fn open_test_store() -> (VectorStore, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::open(&temp_dir.path().join("store"), DIMENSION)
        .await
        .expect("should create vector store");
    (store, temp_dir)
}

fn history_record(id: &str, vector: [f32; DIMENSION], isbns: &[&str]) -> VectorRecord {
    VectorRecord {
        id: id.to_string(),
        vector: vector.to_vec(),
        document: BookDocument::new(
            format!("history of reader {}", id),
            DocumentMetadata::history(isbns.iter().map(ToString::to_string).collect()),
        ),
    }
}

fn book_record(isbn: &str, title: &str, vector: [f32; DIMENSION]) -> VectorRecord {
    VectorRecord {
        id: isbn.to_string(),
        vector: vector.to_vec(),
        document: BookDocument::new(
            format!("description of {}", title),
            DocumentMetadata::book(isbn, title),
        ),
    }
}

#[tokio::test]
async fn vector_store_initialization() {
    let (store, _temp_dir) = open_test_store().await;

    assert_eq!(store.table_name, TABLE_NAME);
    assert_eq!(store.vector_dimension(), DIMENSION);
    assert_eq!(store.count().await.expect("should count rows"), 0);
    assert!(store.validate_integrity().await);
}

#[tokio::test]
async fn store_batch_documents() {
    let (mut store, _temp_dir) = open_test_store().await;

    let records = vec![
        history_record("1", [1.0, 0.0, 0.0, 0.0], &["a", "b"]),
        history_record("2", [0.0, 1.0, 0.0, 0.0], &["c"]),
        book_record("d", "Dune", [0.0, 0.0, 1.0, 0.0]),
    ];
    store
        .store_batch(records)
        .await
        .expect("should store documents");

    assert_eq!(store.count().await.expect("should count rows"), 3);
}

#[tokio::test]
async fn empty_batch_handling() {
    let (mut store, _temp_dir) = open_test_store().await;

    store
        .store_batch(vec![])
        .await
        .expect("should handle empty batch gracefully");

    assert_eq!(store.count().await.expect("should count rows"), 0);
}

#[tokio::test]
async fn search_returns_nearest_first_with_metadata() {
    let (mut store, _temp_dir) = open_test_store().await;

    store
        .store_batch(vec![
            history_record("1", [1.0, 0.0, 0.0, 0.0], &["a", "b"]),
            history_record("2", [0.9, 0.1, 0.0, 0.0], &["b", "c"]),
            history_record("3", [0.0, 0.0, 1.0, 0.0], &["z"]),
        ])
        .await
        .expect("should store documents");

    let results = store
        .search_similar(&[1.0, 0.0, 0.0, 0.0], 2)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "1");
    assert_eq!(results[1].id, "2");
    assert_eq!(
        results[0].document.metadata.isbns,
        vec!["a".to_string(), "b".to_string()]
    );
    assert!(results[0].document.metadata.title.is_none());
    assert!(results[0].distance <= results[1].distance);
    assert!(results[0].similarity_score > 0.99);
}

#[tokio::test]
async fn book_titles_survive_storage() {
    let (mut store, _temp_dir) = open_test_store().await;

    store
        .store_batch(vec![book_record("0441172717", "Dune", [0.0, 1.0, 0.0, 0.0])])
        .await
        .expect("should store documents");

    let results = store
        .similarity_search(&[0.0, 1.0, 0.0, 0.0], 5)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document.metadata.title.as_deref(), Some("Dune"));
    assert_eq!(results[0].document.content, "description of Dune");
}

#[tokio::test]
async fn search_rejects_wrong_dimension() {
    let (store, _temp_dir) = open_test_store().await;

    let result = store.search_similar(&[1.0, 0.0], 3).await;
    assert!(matches!(result, Err(RecsError::InvalidInput(_))));
}

#[tokio::test]
async fn mixed_dimensions_in_one_batch_are_rejected() {
    let (mut store, _temp_dir) = open_test_store().await;

    let mut short = history_record("2", [0.0; DIMENSION], &["x"]);
    short.vector.truncate(2);
    let result = store
        .store_batch(vec![history_record("1", [1.0; DIMENSION], &["a"]), short])
        .await;

    assert!(matches!(result, Err(RecsError::InvalidInput(_))));
}

#[tokio::test]
async fn new_dimension_recreates_table() {
    let (mut store, _temp_dir) = open_test_store().await;

    store
        .store_batch(vec![history_record("1", [1.0; DIMENSION], &["a"])])
        .await
        .expect("should store documents");

    let wider = VectorRecord {
        vector: vec![0.5; 6],
        ..history_record("2", [0.0; DIMENSION], &["b"])
    };
    store
        .store_batch(vec![wider])
        .await
        .expect("should recreate table");

    assert_eq!(store.vector_dimension(), 6);
    assert_eq!(store.count().await.expect("should count rows"), 1);
}

#[tokio::test]
async fn reset_clears_documents() {
    let (mut store, _temp_dir) = open_test_store().await;

    store
        .store_batch(vec![history_record("1", [1.0; DIMENSION], &["a"])])
        .await
        .expect("should store documents");
    store.reset().await.expect("reset should succeed");

    assert_eq!(store.count().await.expect("should count rows"), 0);
}

#[tokio::test]
async fn reopening_detects_existing_dimension() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("store");

    let mut store = VectorStore::open(&path, DIMENSION)
        .await
        .expect("should create vector store");
    store
        .store_batch(vec![history_record("1", [1.0; DIMENSION], &["a"])])
        .await
        .expect("should store documents");
    drop(store);

    let reopened = VectorStore::open(&path, 384)
        .await
        .expect("should reopen vector store");

    assert_eq!(reopened.vector_dimension(), DIMENSION);
    assert_eq!(reopened.count().await.expect("should count rows"), 1);
}

#[tokio::test]
async fn relative_path_stays_under_working_directory() {
    let temp_dir = TempDir::new_in(".").expect("should create temp dir");
    let relative = temp_dir.path().join("collab-store");
    assert!(relative.is_relative());

    let mut store = VectorStore::open(&relative, DIMENSION)
        .await
        .expect("should open store at a relative path");
    store
        .store_batch(vec![history_record("1", [1.0; DIMENSION], &["a"])])
        .await
        .expect("should store documents");

    let written = std::fs::read_dir(&relative)
        .expect("store directory exists")
        .count();
    assert!(written > 0, "table files should land under the relative path");
    assert_eq!(store.count().await.expect("should count rows"), 1);
}

#[tokio::test]
async fn optimize_database() {
    let (mut store, _temp_dir) = open_test_store().await;

    store
        .store_batch(vec![history_record("1", [1.0; DIMENSION], &["a"])])
        .await
        .expect("should store documents");

    let result = store.optimize().await;
    assert!(result.is_ok(), "Failed to optimize database: {:?}", result.err());
}
