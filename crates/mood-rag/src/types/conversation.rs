//! Conversation turns, caller history and generation parameters

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Speaker of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message sent to the completion backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A prior `(user, assistant)` exchange, serialized as a two-element array.
///
/// Either side may be missing or empty, in which case it contributes no turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry(pub Option<String>, pub Option<String>);

impl HistoryEntry {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self(Some(user.into()), Some(assistant.into()))
    }

    /// User text, if present and non-empty
    pub fn user(&self) -> Option<&str> {
        self.0.as_deref().filter(|s| !s.is_empty())
    }

    /// Assistant text, if present and non-empty
    pub fn assistant(&self) -> Option<&str> {
        self.1.as_deref().filter(|s| !s.is_empty())
    }
}

impl<U: Into<String>, A: Into<String>> From<(U, A)> for HistoryEntry {
    fn from((user, assistant): (U, A)) -> Self {
        Self::new(user, assistant)
    }
}

/// Sampling parameters passed through to the completion backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl GenerationParams {
    /// Range sanity checks only; the backend owns the real limits
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(Error::invalid_request("max_tokens must be at least 1"));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(Error::invalid_request(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        if !self.top_p.is_finite() || self.top_p <= 0.0 || self.top_p > 1.0 {
            return Err(Error::invalid_request(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        Ok(())
    }
}

/// One conversation turn request from the UI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// New user message
    pub message: String,
    /// Prior exchanges, oldest first
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Accepted for interface compatibility; the configured instructions are always used
    #[serde(default)]
    pub system_message: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_history<I, H>(mut self, history: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<HistoryEntry>,
    {
        self.history = history.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve unset parameters against the configured defaults
    pub fn params(&self, defaults: GenerationParams) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
        }
    }
}
