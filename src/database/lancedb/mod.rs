// LanceDB vector database module
// Stores embedded book documents and answers nearest-neighbour queries


pub mod vector_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
pub use vector_store::VectorStore;

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Document id: a user id for collaborative documents, an isbn for content documents
    pub id: String,
    pub vector: Vec<f32>,
    pub document: BookDocument,
}

/// Text that gets embedded, plus what a search hit needs to point back at books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Every isbn the document stands for
    pub isbns: Vec<String>,
    /// Set only for single-book documents
    pub title: Option<String>,
}

impl DocumentMetadata {
    /// Metadata for a reader's history: the isbns they rated, in rating order
    #[inline]
    pub fn history(isbns: Vec<String>) -> Self {
        Self { isbns, title: None }
    }

    /// Metadata for a single catalog book
    #[inline]
    pub fn book(isbn: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            isbns: vec![isbn.into()],
            title: Some(title.into()),
        }
    }
}

impl BookDocument {
    #[inline]
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub document: BookDocument,
    pub similarity_score: f32,
    pub distance: f32,
}

/// Nearest-neighbour lookup over embedded documents
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// The `k` documents closest to `query`, nearest first
    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;
}
