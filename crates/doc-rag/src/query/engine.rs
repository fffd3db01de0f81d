//! Query engine: retrieve, then synthesize an answer with the LLM

use std::sync::Arc;

use crate::config::{RagConfig, CONTEXT_MSG_VAR, CONTEXT_VAR, EXISTING_ANSWER_VAR, QUERY_VAR};
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::types::{QueryResult, ScoredNode};

use super::{PromptTemplate, ResponseMode};

/// Answers questions against a built index
pub struct QueryEngine {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    similarity_top_k: usize,
    response_mode: ResponseMode,
    context_window_chars: usize,
    qa_template: PromptTemplate,
    refine_template: PromptTemplate,
    no_context_answer: String,
}

impl QueryEngine {
    /// Create an engine using the query and prompt settings from `config`
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        config: &RagConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            llm,
            similarity_top_k: config.query.similarity_top_k,
            response_mode: config.query.response_mode,
            context_window_chars: config.query.context_window_chars,
            qa_template: PromptTemplate::new(config.prompts.qa_template.as_str()),
            refine_template: PromptTemplate::new(config.prompts.refine_template.as_str()),
            no_context_answer: config.prompts.no_context_answer.clone(),
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Retrieve the chunks most similar to `question`
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredNode>> {
        let embedding = self.embedder.embed(question).await?;
        self.index.retrieve(&embedding, self.similarity_top_k)
    }

    /// Answer a question
    pub async fn query(&self, question: &str) -> Result<QueryResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::config("Question must not be empty"));
        }

        let sources = self.retrieve(question).await?;
        tracing::debug!(
            "Retrieved {} nodes (top score {:?})",
            sources.len(),
            sources.first().map(|s| s.score)
        );

        if sources.is_empty() {
            return Ok(QueryResult::new(self.no_context_answer.clone(), sources));
        }

        let answer = match self.response_mode {
            ResponseMode::NoText => String::new(),
            ResponseMode::Compact => {
                let batches = pack_context(&sources, self.context_window_chars);
                self.synthesize(question, &batches).await?
            }
            ResponseMode::Refine => {
                let batches: Vec<String> = sources.iter().map(|s| s.node.text.clone()).collect();
                self.synthesize(question, &batches).await?
            }
        };

        Ok(QueryResult::new(answer, sources))
    }

    /// Answer from the first batch, then refine the answer with each further batch
    async fn synthesize(&self, question: &str, batches: &[String]) -> Result<String> {
        let mut answer: Option<String> = None;

        for (i, context) in batches.iter().enumerate() {
            let prompt = match &answer {
                None => self
                    .qa_template
                    .format(&[(CONTEXT_VAR, context), (QUERY_VAR, question)])?,
                Some(existing) => self.refine_template.format(&[
                    (QUERY_VAR, question),
                    (EXISTING_ANSWER_VAR, existing),
                    (CONTEXT_MSG_VAR, context),
                ])?,
            };

            tracing::debug!(
                "Synthesis step {}/{} with {} ({} prompt chars)",
                i + 1,
                batches.len(),
                self.llm.model(),
                prompt.chars().count()
            );
            let response = self.llm.complete(&prompt).await?;

            // A blank refinement keeps the previous answer
            if answer.is_none() || !response.trim().is_empty() {
                answer = Some(response);
            }
        }

        Ok(answer.unwrap_or_default())
    }
}

/// Group node texts, in retrieval order, into batches within `window` characters
///
/// A node longer than the window gets a batch of its own.
fn pack_context(sources: &[ScoredNode], window: usize) -> Vec<String> {
    const SEPARATOR: &str = "\n\n";

    let mut batches = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for source in sources {
        let text = source.node.text.as_str();
        let chars = text.chars().count();
        let needed = if current.is_empty() {
            chars
        } else {
            current_chars + SEPARATOR.len() + chars
        };

        if !current.is_empty() && needed > window {
            batches.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        if !current.is_empty() {
            current.push_str(SEPARATOR);
            current_chars += SEPARATOR.len();
        }
        current.push_str(text);
        current_chars += chars;
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
