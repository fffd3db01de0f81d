//! The RAG pipeline: load, chunk, index, persist, and answer

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::ingestion::{hash_bytes, DocumentLoader, TextChunker};
use crate::logger::WorkflowLogger;
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaProvider};
use crate::query::QueryEngine;
use crate::types::QueryResult;

/// Question-answering pipeline over a single document
pub struct RagPipeline {
    config: RagConfig,
    logger: WorkflowLogger,
    loader: DocumentLoader,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    query_engine: Option<QueryEngine>,
    show_progress: bool,
}

impl RagPipeline {
    /// Create a pipeline with the given providers
    pub fn new(
        config: RagConfig,
        logger: WorkflowLogger,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        logger.log_stage("ステージ1: システム初期化", "LLMモデルと埋め込みモデルの設定");
        logger.log_info(&format!("LLMモデル: {} ({})", llm.model(), llm.name()));
        logger.log_info(&format!("埋め込みモデル: {} ({})", embedder.model(), embedder.name()));

        let pipeline = Self {
            loader: DocumentLoader::new(logger.clone()),
            chunker: TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap),
            config,
            logger,
            embedder,
            llm,
            query_engine: None,
            show_progress: false,
        };

        pipeline.logger.log_success("RAGパイプラインの初期化が完了しました", None);
        pipeline
    }

    /// Create a pipeline backed by the Ollama server in `config.llm`
    pub fn ollama(config: RagConfig, logger: WorkflowLogger) -> Result<Self> {
        let (embedder, llm) = OllamaProvider::new(&config.llm)?.split();
        Ok(Self::new(config, logger, Arc::new(embedder), Arc::new(llm)))
    }

    /// Draw a progress bar while embedding
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Whether an index has been built or loaded
    pub fn is_index_built(&self) -> bool {
        self.query_engine.is_some()
    }

    /// The active index, if any
    pub fn index(&self) -> Option<&VectorIndex> {
        self.query_engine.as_ref().map(|engine| engine.index())
    }

    /// Build a vector index from a text or PDF file
    ///
    /// `index_name` defaults to the file stem.
    pub async fn build_index_from_document(
        &mut self,
        document_path: &Path,
        save_index: bool,
        index_name: Option<&str>,
    ) -> Result<()> {
        let index_name = match index_name {
            Some(name) => name.to_string(),
            None => document_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .ok_or_else(|| {
                    Error::config(format!("Cannot derive an index name from {}", document_path.display()))
                })?,
        };

        let loaded = self.loader.load_document(document_path).await?;

        self.logger.log_substage("チャンク分割", "ドキュメントを検索単位のノードに分割");
        let nodes = self.chunker.chunk_documents(&loaded.documents);
        self.logger.log_info(&format!(
            "ノード数: {} (チャンクサイズ: {}, オーバーラップ: {})",
            nodes.len(),
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap
        ));
        if nodes.is_empty() {
            self.logger
                .log_warning("インデックス化できるテキストがありません。質問には回答できません");
        }

        self.logger
            .log_substage("ベクトルインデックス作成", "埋め込みモデルでノードをベクトル化");
        self.logger.log_info("インデックスを作成しています...");
        let start = Instant::now();
        let index = VectorIndex::from_nodes(nodes, self.embedder.as_ref(), self.show_progress)
            .await?
            .with_chunking(self.config.chunking.chunk_size, self.config.chunking.chunk_overlap)
            .with_source_hash(loaded.content_hash);
        self.logger
            .log_success("ベクトルインデックス作成完了", Some(start.elapsed()));

        self.setup_query_engine(index);

        if save_index {
            self.save_index(&index_name).await?;
        }

        Ok(())
    }

    /// Load a persisted index by name
    pub async fn load_index(&mut self, index_name: &str) -> Result<()> {
        let dir = self.config.index_dir(index_name);
        let index = VectorIndex::load(&dir).await?;

        let source_hash = if index_name == self.config.index_name() {
            self.current_source_hash().await
        } else {
            None
        };
        index
            .meta()
            .check_compatible(&self.config, source_hash.as_deref())?;

        self.logger.log_info(&format!(
            "読み込んだノード数: {} (作成日時: {})",
            index.len(),
            index.meta().created_at.format("%Y-%m-%d %H:%M:%S")
        ));
        self.setup_query_engine(index);
        Ok(())
    }

    /// Answer a question against the current index
    pub async fn answer_question(&self, question: &str) -> Result<QueryResult> {
        let engine = self.query_engine.as_ref().ok_or(Error::IndexNotBuilt)?;

        self.logger
            .log_stage("ステージ3: 質問応答処理", &format!("質問: {}", question));
        self.logger
            .log_substage("類似文書検索", "質問に関連する文書をベクトル検索");

        let start = Instant::now();
        let result = engine.query(question).await?;

        self.logger.log_success("質問応答完了", Some(start.elapsed()));
        self.logger
            .log_info(&format!("検索された文書数: {}", result.sources.len()));
        tracing::debug!("Top similarity score: {:?}", result.top_score());

        Ok(result)
    }

    /// Hash of the configured document, if it can be read
    async fn current_source_hash(&self) -> Option<String> {
        match tokio::fs::read(&self.config.document_path).await {
            Ok(data) => Some(hash_bytes(&data)),
            Err(e) => {
                tracing::debug!(
                    "Not checking source hash, cannot read {}: {}",
                    self.config.document_path.display(),
                    e
                );
                None
            }
        }
    }

    fn setup_query_engine(&mut self, index: VectorIndex) {
        self.logger.log_substage(
            "クエリエンジン設定",
            "日本語回答用プロンプトとQueryEngineの設定",
        );
        self.query_engine = Some(QueryEngine::new(
            Arc::new(index),
            Arc::clone(&self.embedder),
            Arc::clone(&self.llm),
            &self.config,
        ));
        self.logger.log_success(
            &format!(
                "QueryEngine設定完了 (top_k: {}, モード: {})",
                self.config.query.similarity_top_k, self.config.query.response_mode
            ),
            None,
        );
    }

    async fn save_index(&self, index_name: &str) -> Result<()> {
        let Some(index) = self.index() else {
            return Err(Error::IndexNotBuilt);
        };

        self.logger
            .log_substage("インデックス保存", "作成したインデックスをディスクに保存");
        let dir = self.config.index_dir(index_name);

        let start = Instant::now();
        index.persist(&dir).await?;

        self.logger
            .log_info(&format!("インデックスを保存しました: {}", dir.display()));
        self.logger.log_success("保存完了", Some(start.elapsed()));
        Ok(())
    }
}
