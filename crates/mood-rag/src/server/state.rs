//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::service::RagService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    service: RagService,
}

impl AppState {
    /// Wrap an initialized service
    pub fn new(service: RagService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { service }),
        }
    }

    pub fn service(&self) -> &RagService {
        &self.inner.service
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        self.inner.service.config()
    }
}
