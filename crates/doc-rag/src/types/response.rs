//! Response types for questions answered by the query engine

use serde::{Deserialize, Serialize};

use super::document::Node;

/// A retrieved node with its similarity to the question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredNode {
    /// The retrieved node
    pub node: Node,
    /// Cosine similarity (-1.0 to 1.0, higher is more similar)
    pub score: f32,
}

/// Answer to a single question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Generated answer
    pub answer: String,
    /// Nodes the answer was generated from, best match first
    pub sources: Vec<ScoredNode>,
    /// Retrieved context rendered as text
    pub context: String,
}

impl QueryResult {
    /// Build a result, rendering the context from the sources
    pub fn new(answer: String, sources: Vec<ScoredNode>) -> Self {
        let context = format_context(&sources);
        Self {
            answer,
            sources,
            context,
        }
    }

    /// Highest similarity among the sources
    pub fn top_score(&self) -> Option<f32> {
        self.sources.first().map(|s| s.score)
    }
}

/// Render retrieved nodes as a numbered context listing
///
/// Each entry reads `[ドキュメント n] (ソース: path, ページ: p, スコア: s)` followed by
/// the node text. Text files report page 0.
pub fn format_context(sources: &[ScoredNode]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "[ドキュメント {}] (ソース: {}, ページ: {}, スコア: {:.4})\n{}\n",
                i + 1,
                s.node.source.source,
                s.node.source.page_number.unwrap_or(0),
                s.score,
                s.node.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::document::{DocumentSource, SourceDocument};
    use std::path::Path;

    fn scored(text: &str, page: u32, score: f32) -> ScoredNode {
        let doc = SourceDocument::new(
            text.to_string(),
            DocumentSource::pdf_page(Path::new("data/guide.pdf"), page, 4),
        );
        ScoredNode {
            node: Node::new(&doc, text.to_string(), 0, text.chars().count(), 0),
            score,
        }
    }

    #[test]
    fn test_format_context() {
        let sources = vec![scored("第一章", 1, 0.91234), scored("第二章", 2, 0.5)];
        let context = format_context(&sources);

        assert!(context.starts_with(
            "[ドキュメント 1] (ソース: data/guide.pdf, ページ: 1, スコア: 0.9123)\n第一章\n"
        ));
        assert!(context.contains("[ドキュメント 2] (ソース: data/guide.pdf, ページ: 2, スコア: 0.5000)"));
    }

    #[test]
    fn test_query_result() {
        let result = QueryResult::new("回答".to_string(), vec![scored("本文", 1, 0.8)]);
        assert_eq!(result.top_score(), Some(0.8));
        assert!(result.context.contains("本文"));

        let empty = QueryResult::new(String::new(), Vec::new());
        assert_eq!(empty.top_score(), None);
        assert!(empty.context.is_empty());
    }
}
