//! Fake providers shared by unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::logger::{MemorySink, WorkflowLogger};
use crate::pipeline::RagPipeline;
use crate::providers::{EmbeddingProvider, LlmProvider};

/// Counts occurrences of a fixed set of characters
pub struct CharEmbedder {
    pub alphabet: Vec<char>,
}

impl Default for CharEmbedder {
    fn default() -> Self {
        Self {
            alphabet: "猫犬鳥魚abcdefghijklmnopqrstuvwxyz".chars().collect(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CharEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        // Constant last component keeps texts without known characters non-zero
        let mut v: Vec<f32> = self
            .alphabet
            .iter()
            .map(|c| lower.matches(*c).count() as f32)
            .collect();
        v.push(0.1);
        Ok(v)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "bge-m3"
    }
}

/// Answers with a fixed text, optionally failing for some questions
#[derive(Default)]
pub struct ScriptedLlm {
    pub fail_on: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(marker) = &self.fail_on {
            if prompt.contains(marker.as_str()) {
                return Err(Error::llm("model unavailable"));
            }
        }
        Ok("テストの回答です".to_string())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "gemma:7b"
    }
}

/// Pipeline over fake providers with output captured in memory
pub fn fake_pipeline(config: RagConfig, llm: Arc<ScriptedLlm>) -> (RagPipeline, MemorySink) {
    let sink = MemorySink::new();
    let logger = WorkflowLogger::with_writer(sink.clone());
    let pipeline = RagPipeline::new(config, logger, Arc::new(CharEmbedder::default()), llm);
    (pipeline, sink)
}

/// A two-page PDF with one line of Courier text per page
pub fn two_page_pdf(first: &str, second: &str) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in [first, second] {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => 2,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
