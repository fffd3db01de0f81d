//! End-to-end workflow: validate, initialise, prepare the index, answer

use std::io::BufRead;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::display::ResultDisplayer;
use crate::error::Result;
use crate::handlers::QuestionAnswerHandler;
use crate::index_manager::IndexManager;
use crate::ingestion::DocumentLoader;
use crate::logger::WorkflowLogger;
use crate::pipeline::RagPipeline;
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaProvider};

/// How a workflow run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Questions were processed
    Completed { answered: usize },
    /// The document is missing or has an unsupported type
    InvalidInput,
    /// No index could be built or loaded
    IndexUnavailable,
}

impl WorkflowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Runs the whole question-answering workflow for one document
pub struct Workflow {
    config: RagConfig,
    logger: WorkflowLogger,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    show_progress: bool,
}

impl Workflow {
    /// Workflow with the given providers
    pub fn new(
        config: RagConfig,
        logger: WorkflowLogger,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            config,
            logger,
            embedder,
            llm,
            show_progress: false,
        }
    }

    /// Workflow backed by Ollama, printing to stdout
    pub fn ollama(config: RagConfig) -> Result<Self> {
        let (embedder, llm) = OllamaProvider::new(&config.llm)?.split();
        Ok(Self::new(config, WorkflowLogger::stdout(), Arc::new(embedder), Arc::new(llm)))
    }

    /// Draw a progress bar while embedding
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run the workflow, reading interactive questions from `input`
    pub async fn run<R: BufRead>(&self, input: R) -> WorkflowOutcome {
        let label = self.config.file_type_label();
        self.logger.print(&format!(
            "🚀 {}ファイル用 RAGシステムを開始します\n📄 対象ファイル: {}\n📝 ファイルタイプ: {} ({})\n🤖 使用LLMモデル: {}",
            label,
            self.config.document_path.display(),
            label,
            self.config.file_extension(),
            self.llm.model()
        ));

        if !self.validate_input_file() {
            return WorkflowOutcome::InvalidInput;
        }

        let mut pipeline = RagPipeline::new(
            self.config.clone(),
            self.logger.clone(),
            Arc::clone(&self.embedder),
            Arc::clone(&self.llm),
        )
        .with_progress(self.show_progress);

        let index_manager = IndexManager::new(self.config.clone(), self.logger.clone());
        if !index_manager.prepare_index(&mut pipeline).await {
            self.logger.log_error("インデックスの準備に失敗しました");
            return WorkflowOutcome::IndexUnavailable;
        }

        self.logger.log_stage(
            "システム準備完了",
            "RAGシステムが質問を受け付ける準備ができました",
        );
        self.logger
            .log_success(&format!("{}ファイル用 RAGシステムの準備が完了しました！", label), None);

        let handler = QuestionAnswerHandler::new(
            self.config.clone(),
            self.logger.clone(),
            ResultDisplayer::new(self.logger.clone()),
        );
        let answered = if self.config.interactive {
            handler.run_interactive_mode(&pipeline, input).await
        } else {
            handler.run_sample_mode(&pipeline).await
        };

        WorkflowOutcome::Completed { answered }
    }

    fn validate_input_file(&self) -> bool {
        let path = &self.config.document_path;
        if !path.exists() {
            self.logger.log_error(&format!(
                "指定されたファイルが見つかりません: {}",
                path.display()
            ));
            return false;
        }
        if !DocumentLoader::is_supported_file(path) {
            self.logger.log_error(&format!(
                "サポートされていないファイル形式です: {}\nサポートされている形式: {}",
                self.config.file_extension(),
                DocumentLoader::supported_extensions().join(", ")
            ));
            return false;
        }
        true
    }
}
