#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

/// Integration tests for the LanceDB vector stores with realistically sized data
use book_recs::config::Config;
use book_recs::database::{BookDocument, DocumentIndex, DocumentMetadata, VectorRecord, VectorStore};
use tempfile::TempDir;

const DIMENSION: usize = 384;

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    (config, temp_dir)
}

fn realistic_vector(variation: f32, length: usize) -> Vec<f32> {
    (0..DIMENSION)
        .map(|i| {
            let base = (i as f32).mul_add(0.01, variation).sin() * 0.1;
            (length as f32).mul_add(0.001, base)
        })
        .collect()
}

fn reader_record(user_id: u32, isbns: &[String], variation: f32) -> VectorRecord {
    let content = isbns
        .iter()
        .map(|isbn| format!("{}A story about {}Title {}4", user_id, isbn, isbn))
        .collect::<Vec<_>>()
        .join(" ");
    VectorRecord {
        id: user_id.to_string(),
        vector: realistic_vector(variation, content.len()),
        document: BookDocument::new(content, DocumentMetadata::history(isbns.to_vec())),
    }
}

fn catalog_record(isbn: &str, title: &str, description: &str, variation: f32) -> VectorRecord {
    VectorRecord {
        id: isbn.to_string(),
        vector: realistic_vector(variation, description.len()),
        document: BookDocument::new(description, DocumentMetadata::book(isbn, title)),
    }
}

#[tokio::test]
async fn reader_histories_storage_and_search() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::open(&config.collab_store_path(), DIMENSION)
        .await
        .expect("should create vector store");

    let records: Vec<VectorRecord> = (1..=30)
        .map(|user_id| {
            let isbns: Vec<String> = (0..(user_id % 7 + 1))
                .map(|n| format!("{:010}", user_id * 10 + n))
                .collect();
            reader_record(user_id, &isbns, user_id as f32 * 0.05)
        })
        .collect();
    store
        .store_batch(records.clone())
        .await
        .expect("should store reader histories");

    assert_eq!(store.count().await.expect("should count"), 30);

    let results = store
        .similarity_search(&records[9].vector, 3)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id, "10");
    assert_eq!(results[0].document.metadata, records[9].document.metadata);
    assert!(results[0].document.metadata.title.is_none());
    assert!(
        results
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance),
        "results should be ordered nearest first"
    );
}

#[tokio::test]
async fn catalog_large_batch_processing() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::open(&config.content_store_path(), DIMENSION)
        .await
        .expect("should create vector store");

    let dataset: Vec<VectorRecord> = (0..500)
        .map(|i| {
            catalog_record(
                &format!("{:010}", i),
                &format!("Book {}", i),
                &format!("A novel about topic {} with a memorable cast of characters", i % 10),
                i as f32 * 0.01,
            )
        })
        .collect();

    for chunk in dataset.chunks(64) {
        store
            .store_batch(chunk.to_vec())
            .await
            .expect("should store batch");
    }
    store.optimize().await.expect("should optimize");

    assert_eq!(store.count().await.expect("should count"), 500);

    let results = store
        .similarity_search(&dataset[250].vector, 10)
        .await
        .expect("search should succeed");
    assert_eq!(results.len(), 10);
    assert_eq!(results[0].id, "0000000250");
    assert_eq!(
        results[0].document.metadata.title.as_deref(),
        Some("Book 250")
    );
    assert_eq!(results[0].document.metadata.isbns, vec!["0000000250"]);
}

#[tokio::test]
async fn stores_are_independent() {
    let (config, _temp_dir) = create_test_config();
    let mut collab = VectorStore::open(&config.collab_store_path(), DIMENSION)
        .await
        .expect("should create collaborative store");
    let mut content = VectorStore::open(&config.content_store_path(), DIMENSION)
        .await
        .expect("should create content store");

    collab
        .store_batch(vec![reader_record(1, &["a".to_string()], 0.1)])
        .await
        .expect("should store history");
    content
        .store_batch(vec![
            catalog_record("a", "Alpha", "first book", 0.1),
            catalog_record("b", "Beta", "second book", 0.2),
        ])
        .await
        .expect("should store books");

    collab.reset().await.expect("should reset");

    assert_eq!(collab.count().await.expect("should count"), 0);
    assert_eq!(content.count().await.expect("should count"), 2);
    assert!(content.validate_integrity().await);
}

#[tokio::test]
async fn documents_persist_across_reopen() {
    let (config, _temp_dir) = create_test_config();
    let path = config.content_store_path();
    {
        let mut store = VectorStore::open(&path, DIMENSION)
            .await
            .expect("should create vector store");
        store
            .store_batch(vec![catalog_record("0441172717", "Dune", "desert planet", 0.3)])
            .await
            .expect("should store book");
    }

    let store = VectorStore::open(&path, DIMENSION)
        .await
        .expect("should reopen vector store");
    let results = store
        .similarity_search(&realistic_vector(0.3, "desert planet".len()), 1)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document.content, "desert planet");
    assert!(results[0].similarity_score > 0.99);
}
