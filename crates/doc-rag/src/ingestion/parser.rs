//! Text and PDF extraction

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Seconds allowed for whole-document extraction by `pdf-extract`
const PDF_EXTRACT_TIMEOUT_SECS: u64 = 60;

/// Parsed file with extracted text per page
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Page-level content; a text file is a single page
    pub pages: Vec<PageContent>,
    /// Total pages (PDFs only)
    pub total_pages: Option<u32>,
    /// SHA-256 of the raw file bytes
    pub content_hash: String,
}

impl ParsedDocument {
    /// Total extracted characters
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.content.chars().count()).sum()
    }
}

/// Content from a single page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text content of the page
    pub content: String,
}

/// Byte-level parser for supported file types
pub struct FileParser;

impl FileParser {
    /// Parse file bytes according to the file name's extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();

        match FileType::from_extension(&extension) {
            FileType::Txt => Self::parse_text(filename, data),
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Unknown => Err(Error::UnsupportedFileType(format!(".{}", extension))),
        }
    }

    /// Parse a UTF-8 text file
    fn parse_text(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let content = std::str::from_utf8(data)
            .map_err(|e| Error::file_parse(filename, format!("File is not valid UTF-8: {}", e)))?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        Ok(ParsedDocument {
            file_type: FileType::Txt,
            pages: vec![PageContent {
                page_number: 1,
                content: content.to_string(),
            }],
            total_pages: None,
            content_hash: hash_bytes(data),
        })
    }

    /// Parse a PDF page by page
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let total_pages = page_numbers.len() as u32;

        let mut pages = Vec::with_capacity(page_numbers.len());
        for page_number in page_numbers {
            match doc.extract_text(&[page_number]) {
                Ok(text) => pages.push(PageContent {
                    page_number,
                    content: cleanup_pdf_text(&text),
                }),
                Err(e) => {
                    tracing::debug!("Could not extract text from page {}: {}", page_number, e);
                    pages.push(PageContent {
                        page_number,
                        content: String::new(),
                    });
                }
            }
        }

        if pages.iter().all(|p| p.content.trim().is_empty()) {
            tracing::warn!("Page-wise extraction produced no text, trying pdf-extract");
            let text = Self::extract_pdf_with_timeout(filename, data)?;
            let text = cleanup_pdf_text(&text);
            if text.trim().is_empty() {
                return Err(Error::file_parse(
                    filename,
                    "PDF appears to be image-based or has no extractable text",
                ));
            }
            pages = vec![PageContent {
                page_number: 1,
                content: text,
            }];
        }

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            pages,
            total_pages: Some(total_pages.max(1)),
            content_hash: hash_bytes(data),
        })
    }

    /// Whole-document extraction on a worker thread, bounded by a timeout
    ///
    /// `pdf-extract` can hang on some embedded fonts and cannot be cancelled, so the
    /// thread is left behind when the timeout fires.
    fn extract_pdf_with_timeout(filename: &str, data: &[u8]) -> Result<String> {
        use std::sync::mpsc;
        use std::time::Duration;

        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(Duration::from_secs(PDF_EXTRACT_TIMEOUT_SECS)) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(Error::file_parse(filename, e.to_string())),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::file_parse(
                filename,
                format!("PDF extraction timed out after {}s", PDF_EXTRACT_TIMEOUT_SECS),
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(Error::file_parse(filename, "PDF extraction thread crashed"))
            }
        }
    }
}

fn glyph_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\buni([0-9A-Fa-f]{4})\b").expect("valid glyph regex"))
}

/// Clean up extracted PDF text
///
/// Resolves `uniXXXX` glyph names, splits ligatures, drops NULs and blank lines
/// and trims every line.
pub fn cleanup_pdf_text(text: &str) -> String {
    let resolved = glyph_name_pattern().replace_all(text, |caps: &regex::Captures| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    resolved
        .replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hash content for change detection
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
