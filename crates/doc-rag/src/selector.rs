//! Picking a document from the data directory when none is given

use std::io::BufRead;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::ingestion::DocumentLoader;
use crate::logger::WorkflowLogger;

/// Supported files directly inside `data_dir`, sorted by path
///
/// A missing directory yields an empty list.
pub fn list_available_documents(data_dir: &Path) -> Vec<PathBuf> {
    let mut documents: Vec<PathBuf> = WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| DocumentLoader::is_supported_file(path))
        .collect();
    documents.sort();
    documents
}

/// Human-readable file size: bytes below 1 KiB, then KB and MB with one decimal
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    }
}

/// Interactive document chooser
pub struct DocumentSelector {
    logger: WorkflowLogger,
}

impl DocumentSelector {
    pub fn new(logger: WorkflowLogger) -> Self {
        Self { logger }
    }

    /// List the documents in `data_dir` and let the user pick one
    pub fn choose<R: BufRead>(&self, data_dir: &Path, input: R) -> Option<PathBuf> {
        if !data_dir.is_dir() {
            self.logger.print(&format!(
                "データディレクトリが見つかりません: {}",
                data_dir.display()
            ));
            return None;
        }
        self.select_document(&list_available_documents(data_dir), input)
    }

    /// Show `documents` with their sizes and read a 1-based choice
    ///
    /// Re-prompts on invalid input; returns `None` on EOF or an empty list.
    pub fn select_document<R: BufRead>(&self, documents: &[PathBuf], mut input: R) -> Option<PathBuf> {
        if documents.is_empty() {
            self.logger.print("利用可能なドキュメントファイルがありません。");
            return None;
        }

        self.logger.print("\n利用可能なドキュメントファイル:");
        for (i, doc) in documents.iter().enumerate() {
            let size = std::fs::metadata(doc).map(|m| m.len()).unwrap_or(0);
            let name = doc
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            self.logger
                .print(&format!("  {}. {} ({})", i + 1, name, format_size(size)));
        }

        loop {
            self.logger.prompt(&format!(
                "\nファイルを選択してください (1-{}): ",
                documents.len()
            ));

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) | Err(_) => {
                    self.logger.print("\n処理を中断しました。");
                    return None;
                }
                Ok(_) => {}
            }

            let choice = line.trim();
            if choice.is_empty() {
                continue;
            }
            match choice.parse::<usize>() {
                Ok(n) if (1..=documents.len()).contains(&n) => {
                    return Some(documents[n - 1].clone());
                }
                Ok(_) => self.logger.print(&format!(
                    "1から{}の間の数字を入力してください。",
                    documents.len()
                )),
                Err(_) => self.logger.print("有効な数字を入力してください。"),
            }
        }
    }
}
