//! End-to-end pipeline tests with in-process providers

use async_trait::async_trait;
use std::sync::Arc;

use doc_rag::index::{DOCSTORE_FILE, INDEX_STORE_FILE, VECTOR_STORE_FILE};
use doc_rag::logger::{MemorySink, WorkflowLogger};
use doc_rag::providers::{EmbeddingProvider, LlmProvider};
use doc_rag::{Error, RagConfig, RagPipeline, Result};

/// Bag-of-keywords embedding over a small vocabulary
struct KeywordEmbedder;

const VOCABULARY: [&str; 5] = ["Rust", "所有権", "借用", "非同期", "マクロ"];

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v: Vec<f32> = VOCABULARY
            .iter()
            .map(|w| text.matches(w).count() as f32)
            .collect();
        v.push(0.05);
        Ok(v)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "keyword"
    }

    fn model(&self) -> &str {
        "bge-m3"
    }
}

/// Answers with the first context line of the prompt
struct FirstLineLlm;

#[async_trait]
impl LlmProvider for FirstLineLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let context = prompt
            .split("---------------------\n")
            .nth(1)
            .unwrap_or_default();
        Ok(context.lines().next().unwrap_or_default().to_string())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "first-line"
    }

    fn model(&self) -> &str {
        "gemma:7b"
    }
}

const DOCUMENT: &str = "\
Rustの所有権は各値に一人の所有者がいるという規則です。所有権はスコープを抜けると解放されます。
借用は所有権を移さずに値を参照する仕組みです。借用には不変と可変があります。
非同期処理はasyncとawaitで書きます。非同期ランタイムとしてtokioがよく使われます。
マクロはコードを生成するコードです。";

fn pipeline(config: RagConfig) -> (RagPipeline, MemorySink) {
    let sink = MemorySink::new();
    let pipeline = RagPipeline::new(
        config,
        WorkflowLogger::with_writer(sink.clone()),
        Arc::new(KeywordEmbedder),
        Arc::new(FirstLineLlm),
    );
    (pipeline, sink)
}

fn setup() -> (tempfile::TempDir, RagConfig) {
    let dir = tempfile::tempdir().unwrap();
    let document = dir.path().join("rust_guide.txt");
    std::fs::write(&document, DOCUMENT).unwrap();

    let mut config = RagConfig::for_document(&document);
    config.index.models_dir = dir.path().join("models");
    config.chunking.chunk_size = 60;
    config.chunking.chunk_overlap = 0;
    config.query.similarity_top_k = 2;
    (dir, config)
}

#[tokio::test]
async fn test_answer_before_index_fails() {
    let (_dir, config) = setup();
    let (pipeline, _) = pipeline(config);
    assert!(!pipeline.is_index_built());
    assert!(matches!(
        pipeline.answer_question("所有権とは？").await,
        Err(Error::IndexNotBuilt)
    ));
}

#[tokio::test]
async fn test_build_answer_and_reload() {
    let (_dir, config) = setup();
    let (mut pipeline, sink) = pipeline(config.clone());

    pipeline
        .build_index_from_document(&config.document_path, true, None)
        .await
        .unwrap();
    assert!(pipeline.is_index_built());

    let index_dir = config.index_path();
    assert_eq!(index_dir, config.index.models_dir.join("rust_guide_index"));
    for file in [DOCSTORE_FILE, VECTOR_STORE_FILE, INDEX_STORE_FILE] {
        assert!(index_dir.join(file).exists(), "missing {}", file);
    }

    let node_count = pipeline.index().unwrap().len();
    assert!(node_count >= 4, "expected several chunks, got {}", node_count);

    let result = pipeline.answer_question("借用について教えて").await.unwrap();
    assert_eq!(result.sources.len(), 2);
    assert!(result.sources[0].node.text.contains("借用"));
    assert!(result.answer.contains("借用"));
    assert!(result.sources[0].score >= result.sources[1].score);
    assert!(result.context.starts_with("[ドキュメント 1] (ソース: "));

    let out = sink.contents();
    assert!(out.contains("🔄 RAGワークフロー: ステージ1: システム初期化"));
    assert!(out.contains("🔄 RAGワークフロー: ステージ2: ドキュメント読み込み"));
    assert!(out.contains("ベクトルインデックス作成完了"));
    assert!(out.contains("インデックスを保存しました"));
    assert!(out.contains("🔄 RAGワークフロー: ステージ3: 質問応答処理"));
    assert!(out.contains("検索された文書数: 2"));

    // A fresh pipeline answers from the persisted index without the document
    std::fs::remove_file(&config.document_path).unwrap();
    let (mut reloaded, _) = self::pipeline(config.clone());
    reloaded.load_index(&config.index_name()).await.unwrap();
    assert_eq!(reloaded.index().unwrap().len(), node_count);

    let again = reloaded.answer_question("借用について教えて").await.unwrap();
    assert_eq!(again.sources[0].node.text, result.sources[0].node.text);
}

#[tokio::test]
async fn test_build_without_saving() {
    let (_dir, config) = setup();
    let (mut pipeline, _) = pipeline(config.clone());
    pipeline
        .build_index_from_document(&config.document_path, false, Some("scratch"))
        .await
        .unwrap();
    assert!(pipeline.is_index_built());
    assert!(!config.index_dir("scratch").exists());
}

#[tokio::test]
async fn test_load_missing_index() {
    let (_dir, config) = setup();
    let (mut pipeline, _) = pipeline(config);
    let err = pipeline.load_index("never_built").await.unwrap_err();
    assert!(matches!(err, Error::IndexNotFound(_)));
    assert!(!pipeline.is_index_built());
}

#[tokio::test]
async fn test_blank_document_answers_without_context() {
    let (dir, mut config) = setup();
    let blank = dir.path().join("blank.txt");
    std::fs::write(&blank, "   \n\n").unwrap();
    config.document_path = blank.clone();

    let (mut pipeline, sink) = pipeline(config);
    pipeline.build_index_from_document(&blank, true, None).await.unwrap();
    assert!(sink.contents().contains("インデックス化できるテキストがありません"));

    let result = pipeline.answer_question("何が書いてある？").await.unwrap();
    assert_eq!(result.answer, "提供された情報からは回答できません");
    assert!(result.sources.is_empty());
}
