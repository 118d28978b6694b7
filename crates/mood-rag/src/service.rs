//! Process-wide RAG service: corpus, index and chat backend built once at startup

use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::embeddings::{create_embedder, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::generation::{
    create_chat_backend, ChatBackend, ConversationOrchestrator, PromptBuilder, ResponseStream,
};
use crate::ingestion::DocumentLoader;
use crate::retrieval::RetrievalService;
use crate::types::{ChatRequest, PassageCollection, RetrievedPassage};

/// Everything a conversation turn needs, shared read-only across requests
#[derive(Clone)]
pub struct RagService {
    config: Arc<RagConfig>,
    orchestrator: ConversationOrchestrator,
}

impl RagService {
    /// Load the document, embed every page, build the index and the chat backend.
    ///
    /// Load and embedding failures abort initialization.
    pub async fn initialize(config: RagConfig) -> Result<Self> {
        let start = Instant::now();
        let source = config.corpus.source_path.clone();
        tracing::info!("Loading corpus from {}", source.display());

        let passages = tokio::task::spawn_blocking(move || DocumentLoader::new().load(&source))
            .await
            .map_err(|e| Error::internal(format!("Loader task failed: {}", e)))??;

        let embedder = create_embedder(&config.embeddings).await?;
        tracing::info!(
            "Embedding {} pages with {} ({} dims)",
            passages.len(),
            embedder.name(),
            embedder.dimensions()
        );

        let build_embedder = Arc::clone(&embedder);
        let retrieval =
            tokio::task::spawn_blocking(move || RetrievalService::build(build_embedder, passages))
                .await
                .map_err(|e| Error::internal(format!("Indexing task failed: {}", e)))??;

        let backend = create_chat_backend(&config.llm)?;
        tracing::info!(
            "Chat backend: {} ({}) at {}",
            backend.name(),
            backend.model(),
            config.llm.base_url
        );

        tracing::info!("RAG service ready in {:?}", start.elapsed());
        Self::from_parts(config, Arc::new(retrieval), backend)
    }

    /// Assemble from prebuilt parts
    pub fn from_parts(
        config: RagConfig,
        retrieval: Arc<RetrievalService>,
        backend: Arc<dyn ChatBackend>,
    ) -> Result<Self> {
        config.validate()?;

        let orchestrator = ConversationOrchestrator::new(
            retrieval,
            backend,
            PromptBuilder::new(config.generation.instructions.clone()),
            config.retrieval.top_k,
            config.generation.defaults(),
            config.llm.fragment_timeout(),
        );

        Ok(Self {
            config: Arc::new(config),
            orchestrator,
        })
    }

    /// Stream the growing answer for one conversation turn
    pub fn respond(&self, request: ChatRequest) -> ResponseStream {
        self.orchestrator.respond(request)
    }

    /// Nearest pages for a query; `k` defaults to the configured `top_k`
    pub async fn retrieve(&self, query: &str, k: Option<usize>) -> Result<Vec<RetrievedPassage>> {
        let retrieval = Arc::clone(self.orchestrator.retrieval());
        let query = query.to_string();
        let k = k.unwrap_or(self.config.retrieval.top_k);

        tokio::task::spawn_blocking(move || retrieval.search(&query, k))
            .await
            .map_err(|e| Error::internal(format!("Retrieval task failed: {}", e)))?
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &ConversationOrchestrator {
        &self.orchestrator
    }

    pub fn passages(&self) -> &PassageCollection {
        self.orchestrator.retrieval().passages()
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        self.orchestrator.retrieval().embedder()
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        self.orchestrator.backend()
    }
}
