// Embeddings module
// Ollama integration for turning book texts into vectors

pub mod ollama;

pub use ollama::OllamaClient;

/// Anything that can turn text into embedding vectors
pub trait Embedder: Send + Sync {
    /// Embed a batch of documents, returning one vector per input in order
    fn embed_documents(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Embed a single query text
    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}
