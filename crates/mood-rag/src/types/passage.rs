//! Page-level passages and the ordered collection that keys the vector index

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source formats the loader understands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text or Markdown, pages separated by form feeds
    Text,
    /// Anything else
    Unknown(String),
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" | "md" | "markdown" => Self::Text,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext)
    }
}

/// One page of extracted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Page number (1-indexed, source order)
    pub page: u32,
    /// Extracted text; empty when the page had none
    pub content: String,
}

/// Ordered passages; a passage's position is its index key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageCollection {
    passages: Vec<Passage>,
}

impl PassageCollection {
    /// Number pages 1..=n in the order given
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let passages = pages
            .into_iter()
            .enumerate()
            .map(|(i, content)| Passage {
                page: i as u32 + 1,
                content: content.into(),
            })
            .collect();
        Self { passages }
    }

    /// Empty collection
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of passages
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Check if there are no passages
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Passage at an index key
    pub fn get(&self, key: usize) -> Option<&Passage> {
        self.passages.get(key)
    }

    /// Iterate in key order
    pub fn iter(&self) -> std::slice::Iter<'_, Passage> {
        self.passages.iter()
    }

    /// Passage contents in key order, ready for embedding
    pub fn contents(&self) -> Vec<String> {
        self.passages.iter().map(|p| p.content.clone()).collect()
    }

    /// Page numbers in key order
    pub fn pages(&self) -> Vec<u32> {
        self.passages.iter().map(|p| p.page).collect()
    }
}

impl<'a> IntoIterator for &'a PassageCollection {
    type Item = &'a Passage;
    type IntoIter = std::slice::Iter<'a, Passage>;

    fn into_iter(self) -> Self::IntoIter {
        self.passages.iter()
    }
}

/// A passage returned by retrieval together with its distance to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Index key (0-based position in the collection)
    pub key: usize,
    /// Page number (1-based)
    pub page: u32,
    /// Page text
    pub content: String,
    /// Squared Euclidean distance to the query vector
    pub distance: f32,
}
