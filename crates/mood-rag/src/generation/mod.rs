//! Grounded answer generation over streaming chat backends

mod backend;
mod huggingface;
mod ollama;
mod orchestrator;
mod prompt;

pub use backend::{create_chat_backend, ChatBackend, FragmentStream};
pub use huggingface::HuggingFaceChat;
pub use ollama::OllamaChat;
pub use orchestrator::{ConversationOrchestrator, PreparedTurn, ResponseStream};
pub use prompt::{PromptBuilder, CONTEXT_PREFIX};
