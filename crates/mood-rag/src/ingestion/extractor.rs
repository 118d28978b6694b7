//! Page-delimited text extraction

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Form feed, the page separator for plain-text sources
pub const PAGE_BREAK: char = '\u{000C}';

/// Turns raw document bytes into one string per page, in page order
pub trait PageExtractor: Send + Sync {
    /// Extract page texts. Pages without text are returned as empty strings.
    fn extract_pages(&self, name: &str, data: &[u8]) -> Result<Vec<String>>;

    /// Extractor name for logging
    fn name(&self) -> &str;
}

/// Glyph names some PDF fonts leave behind instead of the character
const GLYPH_NAMES: &[(&str, &str)] = &[
    ("uni2010", "-"),
    ("uni2011", "-"),
    ("uni2013", "-"),
    ("uni2014", "--"),
    ("uni2018", "'"),
    ("uni2019", "'"),
    ("uni201C", "\""),
    ("uni201D", "\""),
    ("uni2022", "* "),
    ("uni2026", "..."),
    ("uni00A0", " "),
];

/// Typographic characters folded to ASCII
const CHAR_FOLDS: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Normalize extracted page text: glyph names, ligatures, NULs and blank lines
pub fn cleanup_page_text(text: &str) -> String {
    let mut result = text.replace('\0', "");

    for (glyph, replacement) in GLYPH_NAMES {
        result = result
            .replace(&format!("({})", glyph), replacement)
            .replace(&format!("<{}>", glyph), replacement);
    }
    for (ch, replacement) in CHAR_FOLDS {
        result = result.replace(*ch, replacement);
    }

    result
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// PDF extractor: pdf-extract per page, lopdf as fallback
pub struct PdfPageExtractor {
    timeout: Duration,
}

impl PdfPageExtractor {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }

    /// Run pdf-extract on a worker thread so a pathological font cannot hang startup
    fn extract_with_timeout(&self, name: &str, data: &[u8]) -> Result<Vec<String>> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem_by_pages(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(pages)) => {
                let _ = handle.join();
                Ok(pages)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::warn!("pdf-extract failed on '{}': {}, trying lopdf", name, e);
                Self::extract_with_lopdf(name, data)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "pdf-extract timed out after {:?} on '{}', trying lopdf",
                    self.timeout,
                    name
                );
                Self::extract_with_lopdf(name, data)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("pdf-extract worker crashed on '{}'", name);
                Self::extract_with_lopdf(name, data)
            }
        }
    }

    /// Page-by-page extraction using lopdf directly
    fn extract_with_lopdf(name: &str, data: &[u8]) -> Result<Vec<String>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::load(name, format!("Failed to load PDF: {}", e)))?;

        let pages = doc.get_pages();
        let mut texts = Vec::with_capacity(pages.len());

        for page_num in pages.keys() {
            match doc.extract_text(&[*page_num]) {
                Ok(text) => texts.push(text),
                Err(e) => {
                    // Keep the slot so page numbering stays aligned
                    tracing::debug!("No text on page {} of '{}': {}", page_num, name, e);
                    texts.push(String::new());
                }
            }
        }

        Ok(texts)
    }
}

impl Default for PdfPageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageExtractor for PdfPageExtractor {
    fn extract_pages(&self, name: &str, data: &[u8]) -> Result<Vec<String>> {
        if !data.starts_with(b"%PDF") {
            return Err(Error::load(name, "Not a PDF file (missing %PDF header)"));
        }

        let pages = self.extract_with_timeout(name, data)?;
        Ok(pages.iter().map(|p| cleanup_page_text(p)).collect())
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

/// Plain text and Markdown, one page per form-feed separated section
pub struct PlainTextExtractor;

impl PageExtractor for PlainTextExtractor {
    fn extract_pages(&self, name: &str, data: &[u8]) -> Result<Vec<String>> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::load(name, format!("Not valid UTF-8: {}", e)))?;

        if text.is_empty() {
            return Ok(Vec::new());
        }

        Ok(text.split(PAGE_BREAK).map(cleanup_page_text).collect())
    }

    fn name(&self) -> &str {
        "text"
    }
}
