//! Embedding provider trait

use async_trait::async_trait;
use crate::error::Result;

/// Turns text into vectors for the index and for incoming questions
///
/// The same provider must embed both; the model name is persisted with the
/// index so a model change forces a rebuild.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, in order
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Whether the backend is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Embedding model name
    fn model(&self) -> &str;
}
