//! Corpus listing endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct PassagesResponse {
    pub source: String,
    pub total: usize,
    pub pages: Vec<u32>,
}

/// GET /api/passages
pub async fn list_passages(State(state): State<AppState>) -> Json<PassagesResponse> {
    let service = state.service();
    let passages = service.passages();

    Json(PassagesResponse {
        source: service.config().corpus.source_path.display().to_string(),
        total: passages.len(),
        pages: passages.pages(),
    })
}
