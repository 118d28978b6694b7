//! Streaming chat completion backend abstraction

use async_trait::async_trait;
use futures_util::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{ChatBackendKind, LlmConfig};
use crate::error::{Error, Result};
use crate::types::{GenerationParams, Turn};

/// Lazy, finite, non-restartable sequence of text fragments
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Any service that can stream a chat completion for a turn sequence
///
/// Implementations:
/// - `HuggingFaceChat`: Hugging Face Inference API / TGI (OpenAI-compatible SSE)
/// - `OllamaChat`: local Ollama server (NDJSON)
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Start a completion. Errors here mean no fragment was produced.
    async fn stream_chat(&self, turns: &[Turn], params: &GenerationParams)
        -> Result<FragmentStream>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Backend name for logging
    fn name(&self) -> &str;

    /// Model being used
    fn model(&self) -> &str;
}

/// Build the configured backend
pub fn create_chat_backend(config: &LlmConfig) -> Result<Arc<dyn ChatBackend>> {
    match config.backend {
        ChatBackendKind::HuggingFace => Ok(Arc::new(super::HuggingFaceChat::new(config)?)),
        ChatBackendKind::Ollama => Ok(Arc::new(super::OllamaChat::new(config)?)),
    }
}

/// Retry a request with exponential backoff (1s, 2s, 4s, ...)
pub(crate) async fn retry_request<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt < max_retries {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt + 1,
                        max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::internal("retry loop ran zero times")))
}

/// Splits a byte stream into complete lines, holding back a trailing partial line
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append bytes and drain every complete line (without the newline)
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            lines.push(text.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Whatever is left once the stream ends
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!rest.is_empty()).then_some(rest)
    }
}
