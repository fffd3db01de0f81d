//! Document and node types with source tracking for answers

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Plain text file
    Txt,
    /// PDF document
    Pdf,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension (with or without the leading dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "txt" => Self::Txt,
            "pdf" => Self::Pdf,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .map(|e| Self::from_extension(&e.to_string_lossy()))
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Short tag stored in node metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Pdf => "pdf",
            Self::Unknown => "unknown",
        }
    }
}

/// Where a piece of text came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSource {
    /// Path of the input file as given
    pub source: String,
    /// File name without directories
    pub file_name: String,
    /// File type
    pub file_type: FileType,
    /// Page number (1-indexed, PDFs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Total pages in the document (PDFs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

impl DocumentSource {
    /// Source info for a text file
    pub fn text(path: &Path) -> Self {
        Self {
            source: path.to_string_lossy().to_string(),
            file_name: file_name_of(path),
            file_type: FileType::Txt,
            page_number: None,
            total_pages: None,
        }
    }

    /// Source info for a PDF page
    pub fn pdf_page(path: &Path, page: u32, total_pages: u32) -> Self {
        Self {
            source: path.to_string_lossy().to_string(),
            file_name: file_name_of(path),
            file_type: FileType::Pdf,
            page_number: Some(page),
            total_pages: Some(total_pages),
        }
    }

}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// A loaded document (a whole text file, or one PDF page)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Unique document ID
    pub id: Uuid,
    /// Extracted text
    pub text: String,
    /// Source information
    pub source: DocumentSource,
}

impl SourceDocument {
    /// Create a new document
    pub fn new(text: String, source: DocumentSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            source,
        }
    }
}

/// A chunk of a document, the unit that is embedded and retrieved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub text: String,
    /// Source information inherited from the document
    pub source: DocumentSource,
    /// Character position in the parent document
    pub char_start: usize,
    pub char_end: usize,
    /// Chunk index within the parent document
    pub chunk_index: u32,
    /// Embedding vector, stored separately when persisted
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

impl Node {
    /// Create a new node without an embedding
    pub fn new(
        document: &SourceDocument,
        text: String,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: document.id,
            text,
            source: document.source.clone(),
            char_start,
            char_end,
            chunk_index,
            embedding: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_extension("txt"), FileType::Txt);
        assert_eq!(FileType::from_extension(".PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension("docx"), FileType::Unknown);
        assert_eq!(FileType::from_path(Path::new("data/a.Txt")), FileType::Txt);
        assert_eq!(FileType::from_path(Path::new("data/noext")), FileType::Unknown);
        assert!(!FileType::Unknown.is_supported());
    }

    #[test]
    fn test_document_source() {
        let text = DocumentSource::text(Path::new("data/notes.txt"));
        assert_eq!(text.file_name, "notes.txt");
        assert_eq!(text.source, "data/notes.txt");

        let page = DocumentSource::pdf_page(Path::new("data/manual.pdf"), 3, 10);
        assert_eq!(page.page_number, Some(3));
        assert_eq!(page.total_pages, Some(10));
    }

    #[test]
    fn test_node_skips_embedding_in_json() {
        let doc = SourceDocument::new(
            "本文".to_string(),
            DocumentSource::text(Path::new("a.txt")),
        );
        let mut node = Node::new(&doc, "本文".to_string(), 0, 2, 0);
        node.embedding = vec![0.1, 0.2];

        let json = serde_json::to_string(&node).unwrap();
        assert!(!json.contains("embedding"));
        let back: Node = serde_json::from_str(&json).unwrap();
        assert!(back.embedding.is_empty());
        assert_eq!(back.document_id, doc.id);
    }
}
