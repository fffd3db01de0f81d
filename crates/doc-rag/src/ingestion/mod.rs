//! Document loading and chunking

mod chunker;
mod loader;
mod parser;

pub use chunker::TextChunker;
pub use loader::{DocumentLoader, LoadedFile};
pub use parser::{cleanup_pdf_text, hash_bytes, FileParser, PageContent, ParsedDocument};
