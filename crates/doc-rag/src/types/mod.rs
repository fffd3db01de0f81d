//! Core types for the pipeline

pub mod document;
pub mod response;

pub use document::{DocumentSource, FileType, Node, SourceDocument};
pub use response::{format_context, QueryResult, ScoredNode};
