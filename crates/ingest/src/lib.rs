pub mod document;
pub mod highlight;

pub use document::{
    extract_file, extract_text, is_supported, ExtractedDocument, ExtractionError, SUPPORTED_EXTENSIONS,
};
pub use highlight::{highlight, Category, Span};
