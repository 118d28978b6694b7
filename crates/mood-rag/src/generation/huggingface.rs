//! Hugging Face Inference API chat client (OpenAI-compatible streaming)

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::types::{GenerationParams, Turn};

use super::backend::{retry_request, ChatBackend, FragmentStream, LineBuffer};

/// Streams chat completions from a Hugging Face model endpoint or TGI server
pub struct HuggingFaceChat {
    client: Client,
    base_url: String,
    model: String,
    token: Option<String>,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// What one SSE line means for the fragment stream
#[derive(Debug, PartialEq)]
enum SseEvent {
    Fragment(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> Result<SseEvent> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        // blank separators, comments, `event:` and `id:` fields
        return Ok(SseEvent::Skip);
    };
    let data = data.trim();

    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| Error::generation(format!("Malformed stream chunk: {}", e), ""))?;

    if let Some(error) = chunk.error {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(Error::generation(format!("Backend error: {}", message), ""));
    }

    match chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
        Some(content) if !content.is_empty() => Ok(SseEvent::Fragment(content)),
        _ => Ok(SseEvent::Skip),
    }
}

impl HuggingFaceChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            // per read, so long streamed answers are not cut off
            .read_timeout(config.fragment_timeout())
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let token = std::env::var(&config.api_token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_none() {
            tracing::warn!(
                "{} is not set; Hugging Face requests will be anonymous and rate limited",
                config.api_token_env
            );
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            token,
            max_retries: config.max_retries,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ChatBackend for HuggingFaceChat {
    async fn stream_chat(
        &self,
        turns: &[Turn],
        params: &GenerationParams,
    ) -> Result<FragmentStream> {
        let url = self.completions_url();
        let body = serde_json::to_value(ChatCompletionRequest {
            model: &self.model,
            messages: turns,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            stream: true,
        })?;

        tracing::info!("Streaming completion from {} ({} turns)", self.model, turns.len());

        let response = retry_request(self.max_retries, || {
            let request = self.authorize(self.client.post(&url)).json(&body);
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| Error::generation(format!("Request failed: {}", e), ""))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(Error::generation(
                        format!("Completion failed: HTTP {} - {}", status, text),
                        "",
                    ));
                }

                Ok(response)
            }
        })
        .await?;

        let stream: FragmentStream = Box::pin(async_stream::try_stream! {
            let mut bytes = response.bytes_stream();
            let mut lines = LineBuffer::default();

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = chunk
                    .map_err(|e| Error::generation(format!("Stream error: {}", e), ""))?;
                for line in lines.push(&chunk) {
                    match parse_sse_line(&line)? {
                        SseEvent::Fragment(text) => yield text,
                        SseEvent::Done => break 'read,
                        SseEvent::Skip => {}
                    }
                }
            }

            if let Some(rest) = lines.finish() {
                if let SseEvent::Fragment(text) = parse_sse_line(&rest)? {
                    yield text;
                }
            }
        });

        Ok(stream)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.authorize(self.client.get(&self.base_url)).send().await {
            Ok(response) => Ok(!response.status().is_server_error()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
