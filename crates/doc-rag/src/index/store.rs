//! Persistence of a [`VectorIndex`] as three JSON files in one directory

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::Node;

use super::{IndexMeta, VectorIndex, FORMAT_VERSION};

/// Nodes without embeddings
pub const DOCSTORE_FILE: &str = "docstore.json";
/// Node ID to embedding
pub const VECTOR_STORE_FILE: &str = "vector_store.json";
/// Index metadata
pub const INDEX_STORE_FILE: &str = "index_store.json";

#[derive(Serialize, Deserialize)]
struct DocStore {
    nodes: Vec<Node>,
}

#[derive(Serialize, Deserialize)]
struct VectorStore {
    embeddings: HashMap<Uuid, Vec<f32>>,
}

impl VectorIndex {
    /// Write the index to `dir`, creating it if needed
    pub async fn persist(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;

        let docstore = DocStore {
            nodes: self.nodes.clone(),
        };
        let vectors = VectorStore {
            embeddings: self
                .nodes
                .iter()
                .map(|n| (n.id, n.embedding.clone()))
                .collect(),
        };

        tokio::fs::write(dir.join(DOCSTORE_FILE), serde_json::to_vec_pretty(&docstore)?).await?;
        tokio::fs::write(dir.join(VECTOR_STORE_FILE), serde_json::to_vec(&vectors)?).await?;
        // Metadata last: a directory without it is treated as incomplete
        tokio::fs::write(dir.join(INDEX_STORE_FILE), serde_json::to_vec_pretty(&self.meta)?).await?;

        tracing::debug!("Persisted {} nodes to {}", self.nodes.len(), dir.display());
        Ok(())
    }

    /// Read an index previously written by [`VectorIndex::persist`]
    pub async fn load(dir: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
            return Err(Error::IndexNotFound(dir.to_path_buf()));
        }

        let meta: IndexMeta = read_json(dir, INDEX_STORE_FILE).await?;
        if meta.format_version != FORMAT_VERSION {
            return Err(Error::index(format!(
                "Unsupported index format version {} (expected {})",
                meta.format_version, FORMAT_VERSION
            )));
        }

        let docstore: DocStore = read_json(dir, DOCSTORE_FILE).await?;
        let mut vectors: VectorStore = read_json(dir, VECTOR_STORE_FILE).await?;

        let mut nodes = docstore.nodes;
        for node in &mut nodes {
            let embedding = vectors.embeddings.remove(&node.id).ok_or_else(|| {
                Error::index(format!("Node {} has no stored embedding", node.id))
            })?;
            if embedding.len() != meta.dimensions {
                return Err(Error::index(format!(
                    "Node {} has {} dimensions, index has {}",
                    node.id,
                    embedding.len(),
                    meta.dimensions
                )));
            }
            node.embedding = embedding;
        }

        if nodes.len() != meta.node_count || !vectors.embeddings.is_empty() {
            return Err(Error::index(format!(
                "Index files disagree: {} nodes, {} recorded, {} orphaned embeddings",
                nodes.len(),
                meta.node_count,
                vectors.embeddings.len()
            )));
        }

        Ok(Self { meta, nodes })
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let path = dir.join(file);
    let content = tokio::fs::read(&path)
        .await
        .map_err(|e| Error::index(format!("Cannot read {}: {}", path.display(), e)))?;
    serde_json::from_slice(&content)
        .map_err(|e| Error::index(format!("Corrupt {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::EmbeddingProvider;
    use crate::types::{DocumentSource, SourceDocument};
    use async_trait::async_trait;

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.chars().count() as f32, 1.0])
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
        fn name(&self) -> &str {
            "length"
        }
        fn model(&self) -> &str {
            "length"
        }
    }

    async fn sample_index() -> VectorIndex {
        let doc = SourceDocument::new(
            "一つ目。二つ目の文。".to_string(),
            DocumentSource::pdf_page(Path::new("data/manual.pdf"), 2, 3),
        );
        let nodes = vec![
            Node::new(&doc, "一つ目。".to_string(), 0, 4, 0),
            Node::new(&doc, "二つ目の文。".to_string(), 4, 10, 1),
        ];
        VectorIndex::from_nodes(nodes, &LengthEmbedder, false)
            .await
            .unwrap()
            .with_chunking(1000, 200)
            .with_source_hash("deadbeef")
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("manual_index");
        let index = sample_index().await;
        index.persist(&index_dir).await.unwrap();

        assert!(index_dir.join(DOCSTORE_FILE).exists());
        assert!(index_dir.join(VECTOR_STORE_FILE).exists());
        assert!(index_dir.join(INDEX_STORE_FILE).exists());

        let loaded = VectorIndex::load(&index_dir).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.meta().chunk_size, 1000);
        assert_eq!(loaded.meta().source_hash.as_deref(), Some("deadbeef"));
        assert_eq!(loaded.nodes()[1].text, "二つ目の文。");
        assert_eq!(loaded.nodes()[1].embedding, vec![6.0, 1.0]);
        assert_eq!(loaded.nodes()[0].source.page_number, Some(2));

        let results = loaded.retrieve(&[6.0, 1.0], 1).unwrap();
        assert_eq!(results[0].node.chunk_index, 1);
    }

    #[tokio::test]
    async fn test_load_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorIndex::load(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, Error::IndexNotFound(_)));
    }

    #[tokio::test]
    async fn test_load_incomplete_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorIndex::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::Index(_)));
    }

    #[tokio::test]
    async fn test_load_rejects_missing_embedding() {
        let dir = tempfile::tempdir().unwrap();
        sample_index().await.persist(dir.path()).await.unwrap();
        std::fs::write(dir.path().join(VECTOR_STORE_FILE), r#"{"embeddings":{}}"#).unwrap();

        let err = VectorIndex::load(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("no stored embedding"));
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index().await;
        index.persist(dir.path()).await.unwrap();

        let mut meta = index.meta().clone();
        meta.format_version = 99;
        std::fs::write(
            dir.path().join(INDEX_STORE_FILE),
            serde_json::to_vec(&meta).unwrap(),
        )
        .unwrap();

        let err = VectorIndex::load(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }
}
