use super::*;
use crate::database::{BookDocument, DocumentMetadata, SearchResult};
use crate::model::group_histories;
use crate::synthetic::SyntheticRating;
use std::sync::Mutex;

/// Embedder that returns a constant vector
struct ConstantEmbedder;

impl Embedder for ConstantEmbedder {
    fn embed_documents(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }

    fn embed_query(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }
}

/// Index returning canned hits and recording the requested `k`
struct CannedIndex {
    hits: Vec<Vec<&'static str>>,
    requested: Mutex<Vec<usize>>,
}

impl CannedIndex {
    fn new(hits: Vec<Vec<&'static str>>) -> Self {
        Self {
            hits,
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DocumentIndex for CannedIndex {
    async fn similarity_search(&self, _query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        self.requested.lock().expect("lock is not poisoned").push(k);
        Ok(self
            .hits
            .iter()
            .take(k)
            .enumerate()
            .map(|(i, isbns)| SearchResult {
                id: i.to_string(),
                document: BookDocument::new(
                    "",
                    DocumentMetadata::history(isbns.iter().map(ToString::to_string).collect()),
                ),
                similarity_score: 1.0,
                distance: 0.0,
            })
            .collect())
    }
}

fn book(isbn: &str, title: &str) -> Book {
    Book {
        isbn: isbn.to_string(),
        title: title.to_string(),
        description: format!("About {}", title),
        average_rating: 4.0,
        image_url: format!("https://images.example.com/{}.jpg", isbn),
        authors: format!("Author {}", isbn),
        language_code: "eng".to_string(),
    }
}

fn catalog() -> Catalog {
    Catalog::new(
        ["a", "b", "c", "d", "e", "f", "g", "h"]
            .iter()
            .map(|isbn| book(isbn, &format!("Book {}", isbn.to_uppercase())))
            .collect(),
    )
}

fn rating(user_id: u32, isbn: &str) -> SyntheticRating {
    SyntheticRating {
        user_id,
        isbn: isbn.to_string(),
        title: String::new(),
        rating: 4,
        description: String::new(),
        image_url: String::new(),
    }
}

fn recommender(
    collab: Vec<Vec<&'static str>>,
    content: Vec<Vec<&'static str>>,
    ratings: &[SyntheticRating],
) -> Recommender<ConstantEmbedder, CannedIndex> {
    Recommender::new(
        ConstantEmbedder,
        CannedIndex::new(collab),
        CannedIndex::new(content),
        catalog(),
        group_histories(ratings),
        RecommendConfig::default(),
    )
}

#[test]
fn votes_rank_descending_with_first_seen_ties() {
    let ranked = rank_by_votes(["x", "y", "z", "y", "w", "z"], &HashSet::new());

    assert_eq!(
        ranked,
        vec![
            ("y".to_string(), 2),
            ("z".to_string(), 2),
            ("x".to_string(), 1),
            ("w".to_string(), 1),
        ]
    );
}

#[test]
fn excluded_isbns_get_no_votes() {
    let excluded: HashSet<&str> = ["y"].into_iter().collect();
    let ranked = rank_by_votes(["x", "y", "y", "x", "z"], &excluded);

    assert_eq!(ranked, vec![("x".to_string(), 2), ("z".to_string(), 1)]);
}

#[tokio::test]
async fn user_recommendations_exclude_read_books() {
    let ratings = vec![rating(1, "a"), rating(1, "b")];
    let recommender = recommender(
        vec![vec!["a", "c", "d"], vec!["b", "c"], vec!["e", "d", "c"]],
        vec![],
        &ratings,
    );

    let recommendations = recommender
        .recommend_for_user(1)
        .await
        .expect("user has a history");

    let isbns: Vec<&str> = recommendations.iter().map(|r| r.isbn.as_str()).collect();
    assert_eq!(isbns, vec!["c", "d", "e"]);
    assert_eq!(recommendations[0].votes, 3);
    assert_eq!(recommendations[0].title, "Book C");
    assert_eq!(recommendations[0].authors, "Author c");
    assert!(recommendations.iter().all(|r| r.isbn != "a" && r.isbn != "b"));
}

#[tokio::test]
async fn user_query_uses_configured_neighbours() {
    let ratings = vec![rating(4, "a")];
    let recommender = recommender(
        vec![vec!["b"], vec!["c"], vec!["d"], vec!["e"], vec!["f"]],
        vec![],
        &ratings,
    );

    let recommendations = recommender
        .recommend_for_user(4)
        .await
        .expect("user has a history");

    assert_eq!(recommendations.len(), 3);
    assert_eq!(
        *recommender
            .collab_index
            .requested
            .lock()
            .expect("lock is not poisoned"),
        vec![3]
    );
}

#[tokio::test]
async fn results_are_capped_at_count() {
    let ratings = vec![rating(2, "h")];
    let mut recommender = recommender(vec![vec!["a", "b", "c", "d", "e", "f", "g"]], vec![], &ratings);
    recommender.config.count = 4;

    let recommendations = recommender
        .recommend_for_user(2)
        .await
        .expect("user has a history");

    assert_eq!(recommendations.len(), 4);
}

#[tokio::test]
async fn unknown_isbns_are_skipped_before_capping() {
    let ratings = vec![rating(2, "h")];
    let recommender = recommender(
        vec![vec!["zz1", "a", "zz2", "b", "c", "d", "e", "f"]],
        vec![],
        &ratings,
    );

    let recommendations = recommender
        .recommend_for_user(2)
        .await
        .expect("user has a history");

    let isbns: Vec<&str> = recommendations.iter().map(|r| r.isbn.as_str()).collect();
    assert_eq!(isbns, vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let recommender = recommender(vec![vec!["a"]], vec![], &[rating(1, "a")]);

    let result = recommender.recommend_for_user(99).await;

    assert!(matches!(result, Err(RecsError::NotFound(_))));
}

#[tokio::test]
async fn similar_books_exclude_the_query_book() {
    let recommender = recommender(
        vec![],
        vec![vec!["b"], vec!["c"], vec!["d"], vec!["e"], vec!["f"], vec!["g"], vec!["h"]],
        &[],
    );

    let recommendations = recommender
        .recommend_similar("Book B")
        .await
        .expect("title exists");

    let isbns: Vec<&str> = recommendations.iter().map(|r| r.isbn.as_str()).collect();
    assert_eq!(isbns, vec!["c", "d", "e", "f", "g"]);
    assert!(recommendations.iter().all(|r| r.votes == 1));
    assert_eq!(
        *recommender
            .content_index
            .requested
            .lock()
            .expect("lock is not poisoned"),
        vec![10]
    );
}

#[tokio::test]
async fn similar_books_fall_back_to_partial_title() {
    let recommender = recommender(vec![], vec![vec!["c"], vec!["a"]], &[]);

    let recommendations = recommender
        .recommend_similar("book a")
        .await
        .expect("partial title matches");

    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0].isbn, "c");
}

#[tokio::test]
async fn unknown_or_empty_titles_are_rejected() {
    let recommender = recommender(vec![], vec![vec!["a"]], &[]);

    assert!(matches!(
        recommender.recommend_similar("Middlemarch").await,
        Err(RecsError::NotFound(_))
    ));
    assert!(matches!(
        recommender.recommend_similar("   ").await,
        Err(RecsError::InvalidInput(_))
    ));
}

#[test]
fn max_user_id_defaults_to_highest_history() {
    let recommender = recommender(vec![], vec![], &[rating(3, "a"), rating(17, "b")]);
    assert_eq!(RecommendationService::max_user_id(&recommender), 17);

    let recommender = recommender.with_max_user_id(500);
    assert_eq!(RecommendationService::max_user_id(&recommender), 500);
}

/// Embedder that blocks on the runtime, which panics on an async worker thread
struct BlockingEmbedder;

impl Embedder for BlockingEmbedder {
    fn embed_documents(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_query(t)).collect()
    }

    fn embed_query(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(tokio::runtime::Handle::current().block_on(async { vec![1.0, 0.0] }))
    }
}

#[tokio::test]
async fn query_embedding_runs_off_the_async_workers() {
    let ratings = vec![rating(1, "a")];
    let recommender = Recommender::new(
        BlockingEmbedder,
        CannedIndex::new(vec![vec!["b", "c"]]),
        CannedIndex::new(vec![vec!["a"], vec!["d"]]),
        catalog(),
        group_histories(&ratings),
        RecommendConfig::default(),
    );

    let for_user = recommender
        .recommend_for_user(1)
        .await
        .expect("blocking embedder is usable");
    let similar = recommender
        .recommend_similar("Book A")
        .await
        .expect("blocking embedder is usable");

    assert_eq!(for_user.len(), 2);
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].isbn, "d");
}
