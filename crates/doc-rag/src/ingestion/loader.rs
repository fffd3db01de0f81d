//! File-to-document loading for the workflow
//!
//! Picks the loader for the file's type, validates the path, and turns the
//! parsed pages into [`SourceDocument`]s with their source metadata.

use std::path::Path;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::logger::WorkflowLogger;
use crate::types::{DocumentSource, FileType, SourceDocument};

use super::parser::{FileParser, ParsedDocument};

/// Loaded documents plus the hash of the file they came from
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// One document for a text file, one per page for a PDF
    pub documents: Vec<SourceDocument>,
    /// SHA-256 of the raw file bytes
    pub content_hash: String,
}

/// Loads text and PDF files into documents
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    logger: WorkflowLogger,
}

impl DocumentLoader {
    /// Create a loader reporting progress through `logger`
    pub fn new(logger: WorkflowLogger) -> Self {
        Self { logger }
    }

    /// Extensions accepted by [`DocumentLoader::load_document`]
    pub fn supported_extensions() -> &'static [&'static str] {
        &[".txt", ".pdf"]
    }

    /// Whether the path has a supported extension
    pub fn is_supported_file(path: &Path) -> bool {
        FileType::from_path(path).is_supported()
    }

    /// Load a file, choosing the loader from its extension
    pub async fn load_document(&self, path: &Path) -> Result<LoadedFile> {
        self.logger.log_stage(
            "ステージ2: ドキュメント読み込み",
            "ファイル形式を判別して適切な方法で読み込み",
        );

        match FileType::from_path(path) {
            FileType::Txt => {
                self.logger.log_info("テキストファイルプロセッサーを選択");
                self.load_text_file(path).await
            }
            FileType::Pdf => {
                self.logger.log_info("PDFファイルプロセッサーを選択");
                self.load_pdf_file(path).await
            }
            FileType::Unknown => Err(unsupported(path)),
        }
    }

    /// Load a text file as a single document
    pub async fn load_text_file(&self, path: &Path) -> Result<LoadedFile> {
        self.logger.log_substage(
            "ドキュメント読み込み",
            "テキストファイルをDocumentオブジェクトに変換",
        );
        validate_file(path, FileType::Txt)?;
        self.logger
            .log_info(&format!("テキストファイルを読み込んでいます: {}", path.display()));

        let start = Instant::now();
        let parsed = self.read_and_parse(path).await?;
        let chars = parsed.char_count();
        let source = DocumentSource::text(path);
        let file_name = source.file_name.clone();
        let documents = parsed
            .pages
            .into_iter()
            .map(|page| SourceDocument::new(page.content, source.clone()))
            .collect::<Vec<_>>();

        self.logger
            .log_success(&format!("読み込み完了: {}文字", chars), Some(start.elapsed()));
        self.logger.log_info(&format!("ファイル名: {}", file_name));

        Ok(LoadedFile {
            documents,
            content_hash: parsed.content_hash,
        })
    }

    /// Load a PDF as one document per page
    pub async fn load_pdf_file(&self, path: &Path) -> Result<LoadedFile> {
        self.logger.log_substage(
            "PDFドキュメント読み込み",
            "PDFファイルをDocumentオブジェクトに変換",
        );
        validate_file(path, FileType::Pdf)?;
        self.logger
            .log_info(&format!("PDFファイルを読み込んでいます: {}", path.display()));

        let start = Instant::now();
        let parsed = match self.read_and_parse(path).await {
            Ok(parsed) => parsed,
            Err(e) => {
                self.logger.log_error(&format!("PDF読み込みエラー: {}", e));
                return Err(e);
            }
        };

        let chars = parsed.char_count();
        let content_hash = parsed.content_hash.clone();
        let (documents, total_pages) = pdf_documents(path, parsed);

        self.logger.log_success(
            &format!("PDF読み込み完了: {}ページ, {}文字", total_pages, chars),
            Some(start.elapsed()),
        );
        if let Some(first) = documents.first() {
            self.logger
                .log_info(&format!("ファイル名: {}", first.source.file_name));
        }
        self.logger.log_info(&format!("ページ数: {}", total_pages));

        Ok(LoadedFile {
            documents,
            content_hash,
        })
    }

    async fn read_and_parse(&self, path: &Path) -> Result<ParsedDocument> {
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        // PDF extraction is CPU-bound and may block on a stuck font
        tokio::task::spawn_blocking(move || FileParser::parse(&filename, &data))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
    }
}

/// One document per extracted page
///
/// The page count is the PDF's own, which exceeds the number of pages when
/// extraction fell back to a single whole-document page.
fn pdf_documents(path: &Path, parsed: ParsedDocument) -> (Vec<SourceDocument>, u32) {
    let total_pages = parsed
        .total_pages
        .unwrap_or(parsed.pages.len() as u32)
        .max(parsed.pages.len() as u32);
    let documents = parsed
        .pages
        .into_iter()
        .map(|page| {
            SourceDocument::new(
                page.content,
                DocumentSource::pdf_page(path, page.page_number, total_pages),
            )
        })
        .collect();
    (documents, total_pages)
}

/// Check that the file exists and has the expected type
fn validate_file(path: &Path, expected: FileType) -> Result<()> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    if FileType::from_path(path) != expected {
        return Err(unsupported(path));
    }
    Ok(())
}

fn unsupported(path: &Path) -> Error {
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    Error::UnsupportedFileType(format!(
        "{} (supported: {})",
        ext,
        DocumentLoader::supported_extensions().join(", ")
    ))
}
