//! In-memory vector index with exact cosine retrieval
//!
//! A document yields at most a few thousand chunks, so retrieval is a linear
//! scan over every stored embedding.

mod store;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Node, ScoredNode};

pub use store::{DOCSTORE_FILE, INDEX_STORE_FILE, VECTOR_STORE_FILE};

/// On-disk layout version written to `index_store.json`
pub const FORMAT_VERSION: u32 = 1;

/// Texts sent to the embedder per request batch
const EMBED_BATCH_SIZE: usize = 16;

/// Index metadata persisted alongside the nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    /// On-disk layout version
    pub format_version: u32,
    /// Embedding model that produced the vectors
    pub embed_model: String,
    /// Embedding dimensions (0 for an empty index)
    pub dimensions: usize,
    /// Number of nodes
    pub node_count: usize,
    /// Chunk size the nodes were cut with
    pub chunk_size: usize,
    /// Chunk overlap the nodes were cut with
    pub chunk_overlap: usize,
    /// SHA-256 of the source file
    #[serde(default)]
    pub source_hash: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl IndexMeta {
    /// Check that this index still matches the configuration and source file
    ///
    /// `source_hash` is the hash of the source file as it is now, or `None` when
    /// the file cannot be read. An index without a recorded hash skips that check.
    pub fn check_compatible(&self, config: &RagConfig, source_hash: Option<&str>) -> Result<()> {
        if self.embed_model != config.llm.embed_model {
            return Err(Error::index(format!(
                "Index was built with embedding model '{}' but '{}' is configured",
                self.embed_model, config.llm.embed_model
            )));
        }

        if self.chunk_size != config.chunking.chunk_size
            || self.chunk_overlap != config.chunking.chunk_overlap
        {
            return Err(Error::index(format!(
                "Index was chunked with size {}/overlap {} but {}/{} is configured",
                self.chunk_size,
                self.chunk_overlap,
                config.chunking.chunk_size,
                config.chunking.chunk_overlap
            )));
        }

        if let (Some(recorded), Some(current)) = (self.source_hash.as_deref(), source_hash) {
            if recorded != current {
                return Err(Error::index("Source file changed since the index was built"));
            }
        }

        Ok(())
    }
}

/// Nodes with their embeddings
#[derive(Debug, Clone)]
pub struct VectorIndex {
    meta: IndexMeta,
    nodes: Vec<Node>,
}

impl VectorIndex {
    /// Embed every node and build the index
    ///
    /// A progress bar is drawn on stderr when `show_progress` is set and stderr is
    /// a terminal.
    pub async fn from_nodes(
        mut nodes: Vec<Node>,
        embedder: &dyn EmbeddingProvider,
        show_progress: bool,
    ) -> Result<Self> {
        let progress = embedding_progress(nodes.len() as u64, show_progress);
        let mut dimensions = 0usize;

        for batch in nodes.chunks_mut(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|n| n.text.clone()).collect();
            let embeddings = embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            for (node, embedding) in batch.iter_mut().zip(embeddings) {
                if dimensions == 0 {
                    dimensions = embedding.len();
                }
                if embedding.is_empty() || embedding.len() != dimensions {
                    return Err(Error::embedding(format!(
                        "Inconsistent embedding dimensions: expected {}, got {}",
                        dimensions,
                        embedding.len()
                    )));
                }
                node.embedding = embedding;
            }
            progress.inc(batch.len() as u64);
        }
        progress.finish_and_clear();

        tracing::debug!(
            "Embedded {} nodes with {} ({} dimensions)",
            nodes.len(),
            embedder.model(),
            dimensions
        );

        Ok(Self {
            meta: IndexMeta {
                format_version: FORMAT_VERSION,
                embed_model: embedder.model().to_string(),
                dimensions,
                node_count: nodes.len(),
                chunk_size: 0,
                chunk_overlap: 0,
                source_hash: None,
                created_at: Utc::now(),
            },
            nodes,
        })
    }

    /// Record the chunking parameters the nodes were produced with
    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.meta.chunk_size = chunk_size;
        self.meta.chunk_overlap = chunk_overlap;
        self
    }

    /// Record the hash of the source file
    pub fn with_source_hash(mut self, hash: impl Into<String>) -> Self {
        self.meta.source_hash = Some(hash.into());
        self
    }

    /// Index metadata
    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// Indexed nodes
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top `top_k` nodes by cosine similarity, best first
    pub fn retrieve(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredNode>> {
        if self.nodes.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if query_embedding.len() != self.meta.dimensions {
            return Err(Error::index(format!(
                "Query embedding has {} dimensions, index has {}",
                query_embedding.len(),
                self.meta.dimensions
            )));
        }

        let mut scored: Vec<ScoredNode> = self
            .nodes
            .iter()
            .map(|node| ScoredNode {
                score: cosine_similarity(query_embedding, &node.embedding),
                node: node.clone(),
            })
            .collect();

        // NaN sorts last
        scored.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
            (false, false) => b.score.total_cmp(&a.score),
            (a_nan, b_nan) => a_nan.cmp(&b_nan),
        });
        scored.truncate(top_k);

        Ok(scored)
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn embedding_progress(total: u64, show: bool) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if !show || !console::user_attended_stderr() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }
    if let Ok(style) =
        ProgressStyle::with_template("  {spinner} 埋め込み生成 [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentSource, SourceDocument};
    use async_trait::async_trait;
    use std::path::Path;

    /// Embeds text as letter counts of 'a', 'b' and 'c'
    struct LetterEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(['a', 'b', 'c']
                .iter()
                .map(|c| text.matches(*c).count() as f32)
                .collect())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "letters"
        }

        fn model(&self) -> &str {
            "letters-v1"
        }
    }

    fn nodes(texts: &[&str]) -> Vec<Node> {
        let doc = SourceDocument::new(texts.concat(), DocumentSource::text(Path::new("t.txt")));
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Node::new(&doc, t.to_string(), 0, 0, i as u32))
            .collect()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_retrieve_orders_by_similarity() {
        let index = VectorIndex::from_nodes(nodes(&["aaa", "bbb", "abab", "ccc"]), &LetterEmbedder, false)
            .await
            .unwrap();
        assert_eq!(index.meta().dimensions, 3);
        assert_eq!(index.meta().embed_model, "letters-v1");
        assert_eq!(index.len(), 4);

        let results = index.retrieve(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].node.text, "aaa");
        assert_eq!(results[1].node.text, "abab");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_retrieve_edge_cases() {
        let index = VectorIndex::from_nodes(nodes(&["a", "b"]), &LetterEmbedder, false)
            .await
            .unwrap();
        assert!(index.retrieve(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
        assert_eq!(index.retrieve(&[1.0, 0.0, 0.0], 10).unwrap().len(), 2);
        assert!(matches!(index.retrieve(&[1.0], 1), Err(Error::Index(_))));

        let empty = VectorIndex::from_nodes(Vec::new(), &LetterEmbedder, false)
            .await
            .unwrap();
        assert!(empty.is_empty());
        assert!(empty.retrieve(&[1.0, 0.0, 0.0], 3).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_embedding_rejected() {
        struct EmptyEmbedder;

        #[async_trait]
        impl EmbeddingProvider for EmptyEmbedder {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Ok(Vec::new())
            }
            async fn health_check(&self) -> Result<bool> {
                Ok(true)
            }
            fn name(&self) -> &str {
                "empty"
            }
            fn model(&self) -> &str {
                "empty"
            }
        }

        let err = VectorIndex::from_nodes(nodes(&["x"]), &EmptyEmbedder, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_meta_compatibility() {
        let index = VectorIndex::from_nodes(nodes(&["a"]), &LetterEmbedder, false)
            .await
            .unwrap()
            .with_chunking(500, 50)
            .with_source_hash("abc");
        assert_eq!(index.meta().chunk_size, 500);
        assert_eq!(index.meta().source_hash.as_deref(), Some("abc"));

        let mut config = RagConfig::default();
        config.chunking.chunk_size = 500;
        config.chunking.chunk_overlap = 50;
        let err = index.meta().check_compatible(&config, None).unwrap_err();
        assert!(err.to_string().contains("embedding model 'letters-v1'"));

        config.llm.embed_model = "letters-v1".to_string();
        index.meta().check_compatible(&config, None).unwrap();
        index.meta().check_compatible(&config, Some("abc")).unwrap();

        let err = index.meta().check_compatible(&config, Some("abd")).unwrap_err();
        assert!(matches!(err, Error::Index(msg) if msg.contains("Source file changed")));

        config.chunking.chunk_overlap = 100;
        let err = index.meta().check_compatible(&config, Some("abc")).unwrap_err();
        assert!(err.to_string().contains("size 500/overlap 50"));
    }
}
