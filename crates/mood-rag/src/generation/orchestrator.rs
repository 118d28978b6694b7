//! Per-turn conversation flow: assemble context, stream the completion,
//! emit the growing response.
//!
//! A turn moves through three owned values. A [`ChatRequest`] becomes a
//! [`PreparedTurn`] once retrieval has run and the turn sequence is fixed.
//! Streaming consumes the prepared turn and yields the accumulated text after
//! every fragment. The stream ends when the backend finishes; dropping it
//! stops consumption and leaves the last emitted value as the final answer.

use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::retrieval::RetrievalService;
use crate::types::{ChatRequest, GenerationParams, Turn};

use super::backend::ChatBackend;
use super::prompt::PromptBuilder;

/// Growing response text, one item per received fragment
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A turn whose context has been assembled and is ready to stream
#[derive(Debug, Clone)]
pub struct PreparedTurn {
    /// Turn sequence sent to the backend, context turn last
    pub turns: Vec<Turn>,
    /// Validated sampling parameters
    pub params: GenerationParams,
    /// Passage texts placed in the context turn
    pub retrieved: Vec<String>,
}

/// Drives one conversation turn at a time; cheap to clone and share
#[derive(Clone)]
pub struct ConversationOrchestrator {
    retrieval: Arc<RetrievalService>,
    backend: Arc<dyn ChatBackend>,
    prompt: PromptBuilder,
    top_k: usize,
    defaults: GenerationParams,
    fragment_timeout: Duration,
}

impl ConversationOrchestrator {
    pub fn new(
        retrieval: Arc<RetrievalService>,
        backend: Arc<dyn ChatBackend>,
        prompt: PromptBuilder,
        top_k: usize,
        defaults: GenerationParams,
        fragment_timeout: Duration,
    ) -> Self {
        Self {
            retrieval,
            backend,
            prompt,
            top_k,
            defaults,
            fragment_timeout,
        }
    }

    /// Build the turn sequence and run retrieval for the new message
    pub async fn prepare(&self, request: &ChatRequest) -> Result<PreparedTurn> {
        let params = request.params(self.defaults);
        params.validate()?;

        if request.system_message.as_deref().is_some_and(|s| !s.is_empty()) {
            tracing::debug!("Ignoring caller system message; configured instructions apply");
        }

        let retrieval = Arc::clone(&self.retrieval);
        let query = request.message.clone();
        let top_k = self.top_k;
        let retrieved = tokio::task::spawn_blocking(move || retrieval.retrieve(&query, top_k))
            .await
            .map_err(|e| Error::internal(format!("Retrieval task failed: {}", e)))??;

        let turns = self
            .prompt
            .build(&request.history, &request.message, &retrieved);

        tracing::debug!(
            "Context assembled: {} turns, {} passages",
            turns.len(),
            retrieved.len()
        );

        Ok(PreparedTurn {
            turns,
            params,
            retrieved,
        })
    }

    /// Stream a prepared turn. Every item is the full response so far.
    ///
    /// Backend failures and waits longer than the fragment timeout end the
    /// stream with a `Generation` error carrying the text produced so far.
    pub fn stream(&self, prepared: PreparedTurn) -> ResponseStream {
        let backend = Arc::clone(&self.backend);
        let limit = self.fragment_timeout;

        Box::pin(async_stream::try_stream! {
            let mut buffer = String::new();

            let started = match timeout(limit, backend.stream_chat(&prepared.turns, &prepared.params)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(limit)),
            };
            let mut fragments = started.map_err(|e| e.into_generation(""))?;

            loop {
                let step = match timeout(limit, fragments.next()).await {
                    Ok(None) => Ok(None),
                    Ok(Some(result)) => result.map(Some),
                    Err(_) => Err(Error::Timeout(limit)),
                };
                let Some(fragment) = step.map_err(|e| e.into_generation(&buffer))? else {
                    break;
                };

                if fragment.is_empty() {
                    continue;
                }
                buffer.push_str(&fragment);
                yield buffer.clone();
            }

            tracing::debug!("Completion finished: {} chars from {}", buffer.len(), backend.name());
        })
    }

    /// Prepare and stream in one step
    pub fn respond(&self, request: ChatRequest) -> ResponseStream {
        let orchestrator = self.clone();

        Box::pin(async_stream::try_stream! {
            let prepared = orchestrator.prepare(&request).await?;
            let mut responses = orchestrator.stream(prepared);
            while let Some(response) = responses.next().await {
                yield response?;
            }
        })
    }

    pub fn retrieval(&self) -> &Arc<RetrievalService> {
        &self.retrieval
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingProvider, HashingEmbedder};
    use crate::generation::FragmentStream;
    use crate::retrieval::NO_RELEVANT_DOCUMENTS;
    use crate::types::{PassageCollection, Role};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    enum Script {
        Fragments(Vec<Result<String>>),
        Stall,
    }

    struct ScriptedBackend {
        script: Mutex<Option<Script>>,
        seen: Mutex<Vec<Turn>>,
    }

    impl ScriptedBackend {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(Some(script)),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn stream_chat(
            &self,
            turns: &[Turn],
            _params: &GenerationParams,
        ) -> Result<FragmentStream> {
            *self.seen.lock() = turns.to_vec();
            match self.script.lock().take() {
                Some(Script::Fragments(items)) => Ok(Box::pin(futures_util::stream::iter(items))),
                Some(Script::Stall) => Ok(Box::pin(futures_util::stream::pending())),
                None => Err(Error::generation("script already consumed", "")),
            }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "script"
        }
    }

    fn orchestrator(pages: &[&str], backend: Arc<ScriptedBackend>) -> ConversationOrchestrator {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(128));
        let retrieval = RetrievalService::build(
            embedder,
            PassageCollection::from_pages(pages.iter().copied()),
        )
        .unwrap();
        ConversationOrchestrator::new(
            Arc::new(retrieval),
            backend,
            PromptBuilder::new("be a music guru"),
            3,
            GenerationParams {
                max_tokens: 64,
                temperature: 0.7,
                top_p: 0.95,
            },
            Duration::from_secs(5),
        )
    }

    fn fragments(items: &[&str]) -> Script {
        Script::Fragments(items.iter().map(|s| Ok(s.to_string())).collect())
    }

    #[tokio::test]
    async fn test_emits_growing_buffer() {
        let backend = ScriptedBackend::new(fragments(&["A", "B", "C"]));
        let orchestrator = orchestrator(&["page"], backend);

        let emitted: Vec<String> = orchestrator
            .respond(ChatRequest::new("hi"))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(emitted, vec!["A", "AB", "ABC"]);
    }

    #[tokio::test]
    async fn test_empty_fragments_are_not_emitted() {
        let backend = ScriptedBackend::new(fragments(&["", "Hi", "", "!"]));
        let orchestrator = orchestrator(&["page"], backend);

        let emitted: Vec<String> = orchestrator
            .respond(ChatRequest::new("hi"))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(emitted, vec!["Hi", "Hi!"]);
    }

    #[tokio::test]
    async fn test_turn_sequence_ends_with_context() {
        let backend = ScriptedBackend::new(fragments(&["ok"]));
        let orchestrator = orchestrator(&["only page"], Arc::clone(&backend));

        let request = ChatRequest::new("play something relaxing")
            .with_history([("hi", "hello!")]);
        let prepared = orchestrator.prepare(&request).await.unwrap();
        let _: Vec<_> = orchestrator.stream(prepared).collect().await;

        let seen = backend.seen.lock().clone();
        let roles: Vec<Role> = seen.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::System]
        );
        assert_eq!(seen[0].content, "be a music guru");
        assert_eq!(seen[3].content, "play something relaxing");
        assert_eq!(seen[4].content, "Relevant documents: only page");
    }

    #[tokio::test]
    async fn test_empty_corpus_uses_sentinel_context() {
        let backend = ScriptedBackend::new(fragments(&["ok"]));
        let orchestrator = orchestrator(&[], backend);

        let prepared = orchestrator.prepare(&ChatRequest::new("anything")).await.unwrap();
        assert_eq!(prepared.retrieved, vec![NO_RELEVANT_DOCUMENTS.to_string()]);
        assert_eq!(
            prepared.turns.last().unwrap().content,
            format!("Relevant documents: {}", NO_RELEVANT_DOCUMENTS)
        );
    }

    #[tokio::test]
    async fn test_caller_system_message_is_ignored() {
        let backend = ScriptedBackend::new(fragments(&["ok"]));
        let orchestrator = orchestrator(&["page"], backend);

        let request = ChatRequest {
            system_message: Some("you are a pirate".into()),
            ..ChatRequest::new("hi")
        };
        let prepared = orchestrator.prepare(&request).await.unwrap();
        assert!(prepared.turns.iter().all(|t| t.content != "you are a pirate"));
        assert_eq!(prepared.turns[0].content, "be a music guru");
    }

    #[tokio::test]
    async fn test_mid_stream_failure_carries_partial() {
        let backend = ScriptedBackend::new(Script::Fragments(vec![
            Ok("Try ".to_string()),
            Ok("jazz".to_string()),
            Err(Error::generation("connection reset", "")),
        ]));
        let orchestrator = orchestrator(&["page"], backend);

        let results: Vec<Result<String>> =
            orchestrator.respond(ChatRequest::new("hi")).collect().await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[1].as_ref().unwrap(), "Try jazz");

        let err = results[2].as_ref().unwrap_err();
        assert_eq!(err.partial_response(), Some("Try jazz"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_backend_times_out() {
        let backend = ScriptedBackend::new(Script::Stall);
        let orchestrator = orchestrator(&["page"], backend);

        let results: Vec<Result<String>> =
            orchestrator.respond(ChatRequest::new("hi")).collect().await;
        assert_eq!(results.len(), 1);

        let err = results[0].as_ref().unwrap_err();
        assert_eq!(err.partial_response(), Some(""));
        assert!(err.to_string().contains("Timed out"));
    }

    #[tokio::test]
    async fn test_invalid_params_rejected_before_streaming() {
        let backend = ScriptedBackend::new(fragments(&["never"]));
        let orchestrator = orchestrator(&["page"], Arc::clone(&backend));

        let request = ChatRequest {
            top_p: Some(1.5),
            ..ChatRequest::new("hi")
        };
        let err = orchestrator.prepare(&request).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(backend.seen.lock().is_empty());
    }
}
