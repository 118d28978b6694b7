//! Configuration for the RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable that overrides the corpus document path
pub const DOCUMENT_ENV: &str = "MOOD_RAG_DOCUMENT";

/// Fixed behavioral instructions sent as the first system turn
pub const DEFAULT_INSTRUCTIONS: &str = "You are a Music Guru specializing in English pop music. \
You recommend upbeat tunes for energy boosts, soothing melodies for relaxation, and nostalgic \
songs for reflective moments. Share your mood or preferences, and let me suggest the perfect \
English pop track for you!";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Source document configuration
    pub corpus: CorpusConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Chat completion backend configuration
    pub llm: LlmConfig,
    /// Generation defaults and instructions
    pub generation: GenerationDefaults,
}

impl RagConfig {
    /// Parse a TOML configuration file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config '{}': {}", path.display(), e)))
    }

    /// Load from an optional file, then apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Ok(document) = std::env::var(DOCUMENT_ENV) {
            if !document.trim().is_empty() {
                config.corpus.source_path = PathBuf::from(document);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the pipeline unusable
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be at least 1".to_string()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be at least 1".to_string()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".to_string()));
        }
        if self.llm.timeout_secs == 0 || self.llm.first_token_timeout_secs == 0 {
            return Err(Error::Config("llm timeouts must be at least 1 second".to_string()));
        }
        self.generation.defaults().validate()
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7860,
            enable_cors: true,
        }
    }
}

/// Source document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Path of the single document served by this process
    pub source_path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("Mood_Based_Music_Recommendation_System.pdf"),
        }
    }
}

/// Which embedding implementation to run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Sentence-transformers model through ONNX Runtime
    #[default]
    Onnx,
    /// Offline feature-hashing embedder
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding implementation
    pub backend: EmbeddingBackend,
    /// Model to use (default: all-MiniLM-L6-v2)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length
    pub max_length: usize,
    /// Cache directory for models
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Onnx,
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mood-rag")
                .join("models"),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages retrieved per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Which chat completion service to stream from
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatBackendKind {
    /// Hugging Face Inference API (OpenAI-compatible chat completions)
    #[default]
    HuggingFace,
    /// Local Ollama server
    Ollama,
}

/// Chat completion backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend selection
    pub backend: ChatBackendKind,
    /// Base URL of the completion service
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Environment variable holding the bearer token (Hugging Face only)
    pub api_token_env: String,
    /// Connection timeout in seconds
    pub timeout_secs: u64,
    /// Maximum wait for the next streamed fragment in seconds; also the
    /// HTTP client's per-read timeout
    pub first_token_timeout_secs: u64,
    /// Number of retries for the initial request
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: ChatBackendKind::HuggingFace,
            base_url: "https://api-inference.huggingface.co/models/HuggingFaceH4/zephyr-7b-beta"
                .to_string(),
            model: "HuggingFaceH4/zephyr-7b-beta".to_string(),
            api_token_env: "HF_TOKEN".to_string(),
            timeout_secs: 300,
            first_token_timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl LlmConfig {
    /// Bound on the wait for any single streamed fragment
    pub fn fragment_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.first_token_timeout_secs)
    }
}

/// Generation defaults applied when a request leaves a parameter unset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationDefaults {
    /// System instructions; the caller-supplied system message never replaces these
    pub instructions: String,
    /// Maximum new tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling threshold
    pub top_p: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.95,
        }
    }
}

impl GenerationDefaults {
    /// Parameters built from these defaults
    pub fn defaults(&self) -> crate::types::GenerationParams {
        crate::types::GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }
}
