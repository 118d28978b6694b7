//! Document loader: one source file in, one passage per page out

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{FileType, PassageCollection};

use super::extractor::{PageExtractor, PdfPageExtractor, PlainTextExtractor};

/// Loads a document into a page-keyed passage collection
pub struct DocumentLoader {
    pdf: Box<dyn PageExtractor>,
    text: Box<dyn PageExtractor>,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self {
            pdf: Box::new(PdfPageExtractor::new()),
            text: Box::new(PlainTextExtractor),
        }
    }

    /// Read and split a document on disk
    pub fn load(&self, path: &Path) -> Result<PassageCollection> {
        let name = path.display().to_string();
        let data = std::fs::read(path).map_err(|e| Error::load(&name, e.to_string()))?;
        self.load_bytes(&name, FileType::from_path(path), &data)
    }

    /// Split an in-memory document of a known type
    pub fn load_bytes(
        &self,
        name: &str,
        file_type: FileType,
        data: &[u8],
    ) -> Result<PassageCollection> {
        let extractor = match &file_type {
            FileType::Pdf => self.pdf.as_ref(),
            FileType::Text => self.text.as_ref(),
            FileType::Unknown(ext) => {
                return Err(Error::UnsupportedFileType(format!(
                    "'{}' has unsupported extension '{}'",
                    name, ext
                )));
            }
        };

        let pages = extractor.extract_pages(name, data)?;
        let passages = PassageCollection::from_pages(pages);

        let empty = passages.iter().filter(|p| p.content.is_empty()).count();
        tracing::info!(
            "Loaded '{}' with {} ({} pages, {} without text)",
            name,
            extractor.name(),
            passages.len(),
            empty
        );

        Ok(passages)
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_text_document_keeps_empty_pages() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Soothing ballads\x0c\x0cNostalgic classics").unwrap();

        let passages = DocumentLoader::new().load(file.path()).unwrap();
        assert_eq!(passages.len(), 3);
        assert_eq!(passages.pages(), vec![1, 2, 3]);
        assert_eq!(passages.get(1).unwrap().content, "");
        assert_eq!(passages.get(2).unwrap().content, "Nostalgic classics");
    }

    #[test]
    fn test_load_is_idempotent() {
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        write!(file, "# Upbeat\x0c# Calm").unwrap();

        let loader = DocumentLoader::new();
        assert_eq!(loader.load(file.path()).unwrap(), loader.load(file.path()).unwrap());
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = DocumentLoader::new()
            .load(Path::new("/definitely/not/here.pdf"))
            .unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = DocumentLoader::new()
            .load_bytes("deck.pptx", FileType::from_extension("pptx"), b"PK")
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }
}
