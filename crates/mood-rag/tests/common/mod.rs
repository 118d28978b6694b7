#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use mood_rag::config::{EmbeddingBackend, RagConfig};
use mood_rag::embeddings::{EmbeddingProvider, HashingEmbedder};
use mood_rag::generation::{ChatBackend, FragmentStream};
use mood_rag::retrieval::RetrievalService;
use mood_rag::{Error, GenerationParams, PassageCollection, RagService, Result, Turn};

pub const PAGES: [&str; 3] = [
    "Soothing acoustic ballads help you relax and unwind after a long day.",
    "When you need a lift, reach for upbeat energetic pop music with a driving beat.",
    "Nostalgic classics from past decades suit quiet, reflective evenings.",
];

/// Replays a fixed list of fragments and records what it was asked
pub struct ScriptedBackend {
    fragments: Vec<std::result::Result<String, String>>,
    healthy: bool,
    pub calls: Mutex<Vec<(Vec<Turn>, GenerationParams)>>,
}

impl ScriptedBackend {
    pub fn new(fragments: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
            healthy: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Fails its health check and yields nothing
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            fragments: Vec::new(),
            healthy: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Yields the fragments, then fails with `message`
    pub fn failing_after(fragments: &[&str], message: &str) -> Arc<Self> {
        let mut scripted: Vec<_> = fragments.iter().map(|f| Ok(f.to_string())).collect();
        scripted.push(Err(message.to_string()));
        Arc::new(Self {
            fragments: scripted,
            healthy: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn last_turns(&self) -> Vec<Turn> {
        self.calls.lock().last().map(|(t, _)| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn stream_chat(&self, turns: &[Turn], params: &GenerationParams) -> Result<FragmentStream> {
        self.calls.lock().push((turns.to_vec(), *params));
        let items: Vec<Result<String>> = self
            .fragments
            .iter()
            .map(|f| f.clone().map_err(|m| Error::generation(m, "")))
            .collect();
        Ok(Box::pin(futures_util::stream::iter(items)))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.healthy)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

pub fn hashing_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.embeddings.backend = EmbeddingBackend::Hashing;
    config
}

pub fn service_with(pages: &[&str], backend: Arc<ScriptedBackend>) -> RagService {
    let config = hashing_config();
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::new(HashingEmbedder::new(config.embeddings.dimensions));
    let retrieval = RetrievalService::build(
        embedder,
        PassageCollection::from_pages(pages.iter().copied()),
    )
    .unwrap();
    RagService::from_parts(config, Arc::new(retrieval), backend).unwrap()
}
