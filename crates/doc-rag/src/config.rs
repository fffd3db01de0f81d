//! Configuration for the question-answering workflow

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::query::{PromptTemplate, ResponseMode};

/// Placeholder for retrieved context in the QA template
pub const CONTEXT_VAR: &str = "context_str";
/// Placeholder for the user question in QA and refine templates
pub const QUERY_VAR: &str = "query_str";
/// Placeholder for the running answer in the refine template
pub const EXISTING_ANSWER_VAR: &str = "existing_answer";
/// Placeholder for the new context in the refine template
pub const CONTEXT_MSG_VAR: &str = "context_msg";

/// Main workflow configuration
///
/// Built once per run and shared by reference with every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Text or PDF file to answer questions about
    pub document_path: PathBuf,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Index persistence configuration
    pub index: IndexConfig,
    /// Query engine configuration
    pub query: QueryConfig,
    /// Prompt templates
    pub prompts: PromptConfig,
    /// Prompt for questions instead of running the sample questions
    pub interactive: bool,
    /// Questions asked in non-interactive mode
    pub sample_questions: Vec<String>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            document_path: PathBuf::new(),
            llm: LlmConfig::default(),
            chunking: ChunkingConfig::default(),
            index: IndexConfig::default(),
            query: QueryConfig::default(),
            prompts: PromptConfig::default(),
            interactive: true,
            sample_questions: default_sample_questions(),
        }
    }
}

fn default_sample_questions() -> Vec<String> {
    [
        "このドキュメントの内容を教えて",
        "この文書の主なトピックは何ですか？",
        "重要なポイントを3つ教えて",
        "このドキュメントで説明されている概念は何ですか？",
    ]
    .iter()
    .map(|q| q.to_string())
    .collect()
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Embedding model name
    pub embed_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// System prompt sent with every generation request
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "gemma:7b".to_string(),
            embed_model: "bge-m3".to_string(), // multilingual, handles Japanese
            temperature: 0.1,
            timeout_secs: 300,
            max_retries: 2,
            system_prompt: "あなたは日本語で回答するアシスタントです。必ず日本語で回答してください。英語での回答は禁止です。".to_string(),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Index persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding persisted indexes
    pub models_dir: PathBuf,
    /// Rebuild the index even when a persisted one exists
    pub rebuild_index: bool,
    /// Persist a freshly built index
    pub save_index: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            rebuild_index: false,
            save_index: true,
        }
    }
}

/// Query engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Number of chunks retrieved per question
    pub similarity_top_k: usize,
    /// How retrieved chunks are turned into an answer
    pub response_mode: ResponseMode,
    /// Character budget for the context packed into a single prompt
    pub context_window_chars: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            similarity_top_k: 3,
            response_mode: ResponseMode::Compact,
            context_window_chars: 6000,
        }
    }
}

/// Prompt templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Question-answering template with `{context_str}` and `{query_str}`
    pub qa_template: String,
    /// Refine template with `{query_str}`, `{existing_answer}` and `{context_msg}`
    pub refine_template: String,
    /// Answer returned when nothing relevant was retrieved
    pub no_context_answer: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            qa_template: concat!(
                "あなたは日本語で回答するアシスタントです。\n",
                "以下のコンテキスト情報を参照して、質問に日本語で答えてください。\n",
                "\n",
                "コンテキスト情報:\n",
                "---------------------\n",
                "{context_str}\n",
                "---------------------\n",
                "\n",
                "重要な指示:\n",
                "1. 必ず日本語で回答してください\n",
                "2. コンテキスト情報に基づいて回答してください\n",
                "3. 情報がない場合は「提供された情報からは回答できません」と日本語で答えてください\n",
                "4. 英語で回答することは絶対に避けてください\n",
                "\n",
                "質問: {query_str}\n",
                "回答（日本語）: ",
            )
            .to_string(),
            refine_template: concat!(
                "元の質問: {query_str}\n",
                "既存の回答: {existing_answer}\n",
                "\n",
                "以下の追加のコンテキスト情報を使って、必要であれば既存の回答を改善してください。\n",
                "---------------------\n",
                "{context_msg}\n",
                "---------------------\n",
                "追加の情報が役に立たない場合は、既存の回答をそのまま返してください。\n",
                "必ず日本語で回答してください。\n",
                "改善された回答（日本語）: ",
            )
            .to_string(),
            no_context_answer: "提供された情報からは回答できません".to_string(),
        }
    }
}

impl RagConfig {
    /// Create a configuration for a document with default settings
    pub fn for_document(document_path: impl Into<PathBuf>) -> Self {
        Self {
            document_path: document_path.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    ///
    /// Every section and key is optional; missing values keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `DOC_RAG_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DOC_RAG_OLLAMA_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("DOC_RAG_LLM_MODEL") {
            self.llm.generate_model = model;
        }
        if let Some(model) = lookup("DOC_RAG_EMBED_MODEL") {
            self.llm.embed_model = model;
        }
    }

    /// Check settings that would otherwise fail deep inside the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than 0"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.query.similarity_top_k == 0 {
            return Err(Error::config("similarity_top_k must be at least 1"));
        }
        PromptTemplate::new(self.prompts.qa_template.as_str())
            .require("qa_template", &[CONTEXT_VAR, QUERY_VAR])?;
        PromptTemplate::new(self.prompts.refine_template.as_str())
            .require("refine_template", &[QUERY_VAR, EXISTING_ANSWER_VAR, CONTEXT_MSG_VAR])?;
        Ok(())
    }

    /// Index name derived from the document file stem
    pub fn index_name(&self) -> String {
        self.document_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string())
    }

    /// Directory of the persisted index for the current document
    pub fn index_path(&self) -> PathBuf {
        self.index_dir(&self.index_name())
    }

    /// Directory of a persisted index by name
    pub fn index_dir(&self, index_name: &str) -> PathBuf {
        self.index.models_dir.join(format!("{}_index", index_name))
    }

    /// Lowercased extension with a leading dot, or an empty string
    pub fn file_extension(&self) -> String {
        self.document_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }

    /// Whether the document is a PDF
    pub fn is_pdf(&self) -> bool {
        self.file_extension() == ".pdf"
    }

    /// Whether the document is a plain text file
    pub fn is_text(&self) -> bool {
        self.file_extension() == ".txt"
    }

    /// Japanese label for the document type, used in progress output
    pub fn file_type_label(&self) -> &'static str {
        if self.is_text() {
            "テキスト"
        } else if self.is_pdf() {
            "PDF"
        } else {
            "ドキュメント"
        }
    }
}
