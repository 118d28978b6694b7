//! API routes for the RAG server

pub mod chat;
pub mod passages;
pub mod retrieve;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::embeddings::EmbeddingProvider;
use crate::generation::ChatBackend;
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/retrieve", post(retrieve::retrieve))
        .route("/passages", get(passages::list_passages))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let service = state.service();
    let config = service.config();

    Json(serde_json::json!({
        "name": "mood-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Mood-based music recommendations grounded in one document",
        "corpus": {
            "source": config.corpus.source_path.display().to_string(),
            "pages": service.passages().len(),
        },
        "embeddings": {
            "provider": service.embedder().name(),
            "dimensions": service.embedder().dimensions(),
        },
        "llm": {
            "backend": service.backend().name(),
            "model": service.backend().model(),
        },
        "retrieval": {
            "top_k": config.retrieval.top_k,
        },
        "endpoints": {
            "POST /api/chat": "Stream a grounded answer (Server-Sent Events)",
            "POST /api/retrieve": "Nearest pages for a query",
            "GET /api/passages": "Page numbers in the corpus",
            "GET /api/info": "This document"
        }
    }))
}
