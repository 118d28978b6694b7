//! Document ingestion: page extraction and passage loading

mod extractor;
mod loader;

pub use extractor::{
    cleanup_page_text, PageExtractor, PdfPageExtractor, PlainTextExtractor, PAGE_BREAK,
};
pub use loader::DocumentLoader;
