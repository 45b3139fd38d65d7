// Embeddings module
// Text chunking plus the embedders that turn chunks and questions into vectors

pub mod chunking;
pub mod hashing;
pub mod ollama;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::{Config, EmbeddingProvider};
use crate::{KbError, Result};

pub use chunking::{ChunkingConfig, ContentChunk, chunk_text};
pub use hashing::HashEmbedder;
pub use ollama::OllamaClient;

/// Maps text to fixed-width vectors.
///
/// Implementations must be deterministic for a given model and input, and
/// every returned vector must have exactly [`Embedder::dimension`] entries.
pub trait Embedder: Send + Sync {
    /// Width of every vector this embedder produces
    fn dimension(&self) -> usize;

    /// Embed a batch of documents, returning one vector per input in order
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query
    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| KbError::Embedding("Embedder returned no vector for query".to_string()))
    }
}

/// Build the embedder selected by `config.embedding.provider`
#[inline]
pub fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match config.embedding.provider {
        EmbeddingProvider::Ollama => Ok(Arc::new(OllamaClient::new(config)?)),
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::new(config.embedding.dimension))),
    }
}

/// Check that every vector has the expected width
#[inline]
pub fn ensure_dimension(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(vector) => Err(KbError::DimensionMismatch {
            expected,
            found: vector.len(),
        }),
        None => Ok(()),
    }
}
