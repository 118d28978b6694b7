//! Retrieval endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RetrievedPage {
    pub page: u32,
    pub content: String,
    pub distance: f32,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub passages: Vec<RetrievedPage>,
}

/// POST /api/retrieve - nearest pages, closest first
pub async fn retrieve(
    State(state): State<AppState>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>> {
    tracing::info!("Retrieve: \"{}\"", request.query);

    let hits = state.service().retrieve(&request.query, request.top_k).await?;

    Ok(Json(RetrieveResponse {
        passages: hits
            .into_iter()
            .map(|hit| RetrievedPage {
                page: hit.page,
                content: hit.content,
                distance: hit.distance,
            })
            .collect(),
    }))
}
