// Recommendation
// Nearest-neighbour votes turned into ranked book suggestions

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{Book, Catalog};
use crate::database::DocumentIndex;
use crate::embeddings::Embedder;
use crate::model::UserHistory;
use crate::{RecsError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecommendConfig {
    /// Reader histories consulted per collaborative query
    pub collab_neighbors: usize,
    /// Books consulted per content query
    pub content_neighbors: usize,
    /// Maximum recommendations returned
    pub count: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            collab_neighbors: 3,
            content_neighbors: 10,
            count: 5,
        }
    }
}

/// A recommended book and the number of neighbours that voted for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub isbn: String,
    pub title: String,
    pub authors: String,
    pub description: String,
    pub image_url: String,
    pub votes: usize,
}

impl Recommendation {
    #[inline]
    pub fn from_book(book: &Book, votes: usize) -> Self {
        Self {
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            authors: book.authors.clone(),
            description: book.description.clone(),
            image_url: book.image_url.clone(),
            votes,
        }
    }
}

/// Count one vote per isbn occurrence, skipping `excluded`.
///
/// Sorted by votes descending; equal counts keep the order in which isbns were first seen.
#[inline]
pub fn rank_by_votes<'a, I>(isbns: I, excluded: &HashSet<&str>) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut votes: HashMap<&str, usize> = HashMap::new();

    for isbn in isbns {
        if excluded.contains(isbn) {
            continue;
        }
        let count = votes.entry(isbn).or_insert_with(|| {
            order.push(isbn);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|isbn| (isbn.to_string(), votes[isbn]))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// What the web layer needs from a recommender
#[async_trait]
pub trait RecommendationService: Send + Sync {
    async fn recommend_for_user(&self, user_id: u32) -> Result<Vec<Recommendation>>;

    async fn recommend_similar(&self, title: &str) -> Result<Vec<Recommendation>>;

    /// Highest user id the dashboard should offer
    fn max_user_id(&self) -> u32;
}

/// Recommendations over the two similarity indexes
pub struct Recommender<E, I> {
    embedder: Arc<E>,
    collab_index: I,
    content_index: I,
    catalog: Catalog,
    histories: BTreeMap<u32, UserHistory>,
    config: RecommendConfig,
    max_user_id: u32,
}

impl<E: Embedder + 'static, I: DocumentIndex> Recommender<E, I> {
    #[inline]
    pub fn new(
        embedder: E,
        collab_index: I,
        content_index: I,
        catalog: Catalog,
        histories: BTreeMap<u32, UserHistory>,
        config: RecommendConfig,
    ) -> Self {
        let max_user_id = histories.keys().next_back().copied().unwrap_or(0);
        Self {
            embedder: Arc::new(embedder),
            collab_index,
            content_index,
            catalog,
            histories,
            config,
            max_user_id,
        }
    }

    /// Offer user ids up to `max_user_id` in the dashboard
    #[inline]
    pub fn with_max_user_id(mut self, max_user_id: u32) -> Self {
        self.max_user_id = max_user_id;
        self
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Embedding clients block, so queries run on the blocking pool
    async fn embed(&self, text: String) -> Result<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || embedder.embed_query(&text))
            .await
            .map_err(|e| RecsError::Embedding(format!("Embedding task failed: {}", e)))?
            .map_err(|e| RecsError::Embedding(format!("{:#}", e)))
    }

    fn resolve(&self, ranked: Vec<(String, usize)>) -> Vec<Recommendation> {
        ranked
            .into_iter()
            .filter_map(|(isbn, votes)| {
                let book = self.catalog.by_isbn(&isbn);
                if book.is_none() {
                    debug!("Recommended isbn {} is not in the catalog", isbn);
                }
                book.map(|b| Recommendation::from_book(b, votes))
            })
            .take(self.config.count)
            .collect()
    }

    /// Books liked by readers with a similar history, minus what `user_id` already rated
    #[inline]
    pub async fn recommend_for_user(&self, user_id: u32) -> Result<Vec<Recommendation>> {
        let history = self
            .histories
            .get(&user_id)
            .ok_or_else(|| RecsError::NotFound(format!("No reading history for user {}", user_id)))?;

        let query = self.embed(history.text()).await?;
        let neighbours = self
            .collab_index
            .similarity_search(&query, self.config.collab_neighbors)
            .await?;

        let read: HashSet<&str> = history.isbns.iter().map(String::as_str).collect();
        let ranked = rank_by_votes(
            neighbours
                .iter()
                .flat_map(|hit| hit.document.metadata.isbns.iter().map(String::as_str)),
            &read,
        );

        debug!(
            "User {}: {} neighbours, {} candidate books",
            user_id,
            neighbours.len(),
            ranked.len()
        );
        Ok(self.resolve(ranked))
    }

    /// Books whose descriptions sit close to the named book's
    #[inline]
    pub async fn recommend_similar(&self, title: &str) -> Result<Vec<Recommendation>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(RecsError::InvalidInput("Book title is empty".to_string()));
        }

        let book = self
            .catalog
            .find_by_title(title)
            .ok_or_else(|| RecsError::NotFound(format!("No book titled '{}'", title)))?;

        let query = self
            .embed(format!("{} {}", book.description, book.title))
            .await?;
        let neighbours = self
            .content_index
            .similarity_search(&query, self.config.content_neighbors)
            .await?;

        let excluded: HashSet<&str> = std::iter::once(book.isbn.as_str()).collect();
        let ranked = rank_by_votes(
            neighbours
                .iter()
                .flat_map(|hit| hit.document.metadata.isbns.iter().map(String::as_str)),
            &excluded,
        );

        debug!(
            "Title '{}': {} neighbours, {} candidate books",
            book.title,
            neighbours.len(),
            ranked.len()
        );
        Ok(self.resolve(ranked))
    }
}

#[async_trait]
impl<E: Embedder + 'static, I: DocumentIndex> RecommendationService for Recommender<E, I> {
    async fn recommend_for_user(&self, user_id: u32) -> Result<Vec<Recommendation>> {
        Self::recommend_for_user(self, user_id).await
    }

    async fn recommend_similar(&self, title: &str) -> Result<Vec<Recommendation>> {
        Self::recommend_similar(self, title).await
    }

    fn max_user_id(&self) -> u32 {
        self.max_user_id
    }
}
