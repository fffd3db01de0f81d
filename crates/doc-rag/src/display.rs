//! Rendering of answers and their sources

use crate::logger::WorkflowLogger;
use crate::types::{QueryResult, ScoredNode};

/// Prints question-answering results
#[derive(Debug, Clone)]
pub struct ResultDisplayer {
    logger: WorkflowLogger,
}

impl ResultDisplayer {
    pub fn new(logger: WorkflowLogger) -> Self {
        Self { logger }
    }

    /// Print the answer followed by its sources
    pub fn display_result(&self, result: &QueryResult) {
        self.logger.print(&render_result(result));
    }
}

/// Format a result the way [`ResultDisplayer::display_result`] prints it
pub fn render_result(result: &QueryResult) -> String {
    let mut out = format!("\n📝 **回答:**\n{}\n", result.answer);

    if result.sources.is_empty() {
        out.push_str("\n📚 **参照元:** なし");
        return out;
    }

    out.push_str("\n📚 **参照元:**");
    for (i, source) in result.sources.iter().enumerate() {
        if i > 0 {
            out.push('\n');
            out.push_str(&"-".repeat(40));
        }
        out.push('\n');
        out.push_str(&render_source(source, i + 1));
    }
    out
}

fn render_source(source: &ScoredNode, number: usize) -> String {
    let meta = &source.node.source;
    let mut lines = vec![
        format!("--- ソース {} ---", number),
        format!("  📄 ファイル: {}", meta.file_name),
        format!("  📁 パス: {}", meta.source),
    ];
    if let Some(page) = meta.page_number {
        match meta.total_pages {
            Some(total) => lines.push(format!("  📃 ページ: {}/{}", page, total)),
            None => lines.push(format!("  📃 ページ: {}", page)),
        }
    }
    lines.push(format!("  🎯 類似度スコア: {:.4}", source.score));
    lines.join("\n")
}
