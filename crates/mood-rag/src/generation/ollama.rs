//! Ollama chat client streaming NDJSON from `/api/chat`

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::types::{GenerationParams, Turn};

use super::backend::{retry_request, ChatBackend, FragmentStream, LineBuffer};

/// Ollama API client with retry on the initial request
pub struct OllamaChat {
    /// HTTP client
    client: Client,
    base_url: String,
    model: String,
    /// Maximum retries
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Parse one NDJSON line into `(fragment, done)`
fn parse_chunk(line: &str) -> Result<(Option<String>, bool)> {
    let line = line.trim();
    if line.is_empty() {
        return Ok((None, false));
    }

    let chunk: ChatChunk = serde_json::from_str(line)
        .map_err(|e| Error::generation(format!("Malformed Ollama chunk: {}", e), ""))?;

    if let Some(error) = chunk.error {
        return Err(Error::generation(format!("Ollama error: {}", error), ""));
    }

    let fragment = chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty());
    Ok((fragment, chunk.done))
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            // per read, so long streamed answers are not cut off
            .read_timeout(config.fragment_timeout())
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatBackend for OllamaChat {
    async fn stream_chat(
        &self,
        turns: &[Turn],
        params: &GenerationParams,
    ) -> Result<FragmentStream> {
        let url = format!("{}/api/chat", self.base_url);
        let body = serde_json::to_value(ChatRequestBody {
            model: &self.model,
            messages: turns,
            stream: true,
            options: ChatOptions {
                num_predict: params.max_tokens,
                temperature: params.temperature,
                top_p: params.top_p,
            },
        })?;

        let response = retry_request(self.max_retries, || {
            let request = self.client.post(&url).json(&body);
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| Error::generation(format!("Ollama request failed: {}", e), ""))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(Error::generation(
                        format!("Ollama chat failed: HTTP {} - {}", status, text),
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
                    let (fragment, done) = parse_chunk(&line)?;
                    if let Some(text) = fragment {
                        yield text;
                    }
                    if done {
                        break 'read;
                    }
                }
            }

            if let Some(rest) = lines.finish() {
                if let (Some(text), _) = parse_chunk(&rest)? {
                    yield text;
                }
            }
        });

        Ok(stream)
    }

    /// Check if Ollama is available
    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_chunk() {
        let line = r#"{"model":"llama3.2","message":{"role":"assistant","content":"Try"},"done":false}"#;
        assert_eq!(parse_chunk(line).unwrap(), (Some("Try".to_string()), false));
    }

    #[test]
    fn test_parse_final_chunk() {
        let line = r#"{"model":"llama3.2","message":{"role":"assistant","content":""},"done":true,"eval_count":12}"#;
        assert_eq!(parse_chunk(line).unwrap(), (None, true));
    }

    #[test]
    fn test_parse_error_chunk() {
        let err = parse_chunk(r#"{"error":"model not found"}"#).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    /// Serve a chunked NDJSON answer whose fragments arrive `gap` apart
    async fn slow_ollama(lines: Vec<String>, gap: Duration) -> std::net::SocketAddr {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 8192];
            let _ = socket.read(&mut request).await.unwrap();

            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\n\r\n",
                )
                .await
                .unwrap();
            for line in lines {
                tokio::time::sleep(gap).await;
                let data = format!("{}\n", line);
                let chunk = format!("{:x}\r\n{}\r\n", data.len(), data);
                socket.write_all(chunk.as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
            }
            socket.write_all(b"0\r\n\r\n").await.unwrap();
            let _ = socket.shutdown().await;
        });

        addr
    }

    #[tokio::test]
    async fn test_stream_outlives_connect_timeout() {
        let fragments = ["Try ", "some ", "mellow ", "jazz"];
        let mut lines: Vec<String> = fragments
            .iter()
            .map(|f| {
                serde_json::json!({ "message": { "role": "assistant", "content": f }, "done": false })
                    .to_string()
            })
            .collect();
        lines.push(r#"{"message":{"role":"assistant","content":""},"done":true}"#.to_string());

        let addr = slow_ollama(lines, Duration::from_millis(400)).await;
        let config = LlmConfig {
            backend: crate::config::ChatBackendKind::Ollama,
            base_url: format!("http://{}", addr),
            model: "llama3.2".to_string(),
            timeout_secs: 1,
            first_token_timeout_secs: 1,
            max_retries: 0,
            ..LlmConfig::default()
        };
        let chat = OllamaChat::new(&config).unwrap();

        let started = std::time::Instant::now();
        let params = GenerationParams {
            max_tokens: 32,
            temperature: 0.7,
            top_p: 0.95,
        };
        let stream = chat
            .stream_chat(&[Turn::user("something calm")], &params)
            .await
            .unwrap();
        let received: Vec<String> = stream.map(|r| r.unwrap()).collect().await;

        assert_eq!(received, fragments);
        assert!(started.elapsed() > Duration::from_secs(1));
    }

    #[test]
    fn test_options_use_ollama_names() {
        let turns = vec![Turn::user("hi")];
        let body = serde_json::to_value(ChatRequestBody {
            model: "llama3.2:1b",
            messages: &turns,
            stream: true,
            options: ChatOptions {
                num_predict: 100,
                temperature: 0.5,
                top_p: 0.9,
            },
        })
        .unwrap();
        assert_eq!(body["options"]["num_predict"], 100);
        assert_eq!(body["messages"][0]["content"], "hi");
    }
}
