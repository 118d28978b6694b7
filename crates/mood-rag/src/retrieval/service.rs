//! Retrieval service: embed the query, search the index, map keys back to pages

use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::index::FlatL2Index;
use crate::types::{PassageCollection, RetrievedPassage};

/// Returned in place of passages when nothing could be retrieved
pub const NO_RELEVANT_DOCUMENTS: &str = "No relevant documents found.";

/// Owns the passage collection and the index built over it.
///
/// Both are immutable after construction, so one instance can be shared across
/// concurrent conversations behind an `Arc` without locking.
pub struct RetrievalService {
    embedder: Arc<dyn EmbeddingProvider>,
    passages: PassageCollection,
    index: FlatL2Index,
}

impl RetrievalService {
    /// Embed every passage and build the index
    pub fn build(embedder: Arc<dyn EmbeddingProvider>, passages: PassageCollection) -> Result<Self> {
        let vectors = embedder.embed(&passages.contents())?;
        if vectors.len() != passages.len() {
            return Err(Error::embedding(format!(
                "{} returned {} vectors for {} passages",
                embedder.name(),
                vectors.len(),
                passages.len()
            )));
        }

        let index = FlatL2Index::build(&vectors)?;
        tracing::info!(
            "Vector index built: {} passages embedded with {}",
            index.len(),
            embedder.name()
        );

        Self::from_parts(embedder, passages, index)
    }

    /// Assemble from a prebuilt index; the index rows must line up with the passages
    pub fn from_parts(
        embedder: Arc<dyn EmbeddingProvider>,
        passages: PassageCollection,
        index: FlatL2Index,
    ) -> Result<Self> {
        if index.len() != passages.len() {
            return Err(Error::internal(format!(
                "Index holds {} vectors but there are {} passages",
                index.len(),
                passages.len()
            )));
        }
        if !index.is_empty() && index.dimensions() != embedder.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: embedder.dimensions(),
                actual: index.dimensions(),
            });
        }

        Ok(Self {
            embedder,
            passages,
            index,
        })
    }

    /// Nearest passages with their distances, closest first
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        if k == 0 {
            return Err(Error::invalid_request("k must be at least 1"));
        }
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_one(query)?;
        let neighbors = self.index.search(&query_vector, k)?;

        neighbors
            .into_iter()
            .map(|n| {
                let passage = self.passages.get(n.key).ok_or_else(|| {
                    Error::internal(format!("Index key {} has no passage", n.key))
                })?;
                Ok(RetrievedPassage {
                    key: n.key,
                    page: passage.page,
                    content: passage.content.clone(),
                    distance: n.distance,
                })
            })
            .collect()
    }

    /// Passage texts for prompt context, closest first.
    ///
    /// Never empty: with no hits the single sentinel string is returned.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let hits = self.search(query, k)?;

        if let Some(best) = hits.first() {
            tracing::debug!(
                "Retrieved {} passages (best: page {}, distance {:.4})",
                hits.len(),
                best.page,
                best.distance
            );
        }

        if hits.is_empty() {
            return Ok(vec![NO_RELEVANT_DOCUMENTS.to_string()]);
        }
        Ok(hits.into_iter().map(|h| h.content).collect())
    }

    pub fn passages(&self) -> &PassageCollection {
        &self.passages
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }
}
