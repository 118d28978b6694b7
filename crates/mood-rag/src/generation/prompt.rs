//! Conversation assembly for grounded chat turns

use crate::types::{HistoryEntry, Turn};

/// Prefix of the trailing system turn that carries retrieved passages
pub const CONTEXT_PREFIX: &str = "Relevant documents: ";

/// Builds the turn sequence sent to the completion backend
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instructions: String,
}

impl PromptBuilder {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    /// Instructions, then history (empty sides skipped), then the new user message
    pub fn conversation_turns(&self, history: &[HistoryEntry], message: &str) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(history.len() * 2 + 3);
        turns.push(Turn::system(self.instructions.as_str()));

        for entry in history {
            if let Some(user) = entry.user() {
                turns.push(Turn::user(user));
            }
            if let Some(assistant) = entry.assistant() {
                turns.push(Turn::assistant(assistant));
            }
        }

        turns.push(Turn::user(message));
        turns
    }

    /// System turn carrying the retrieved passages, one per line
    pub fn context_turn(passages: &[String]) -> Turn {
        Turn::system(format!("{}{}", CONTEXT_PREFIX, passages.join("\n")))
    }

    /// Full sequence: the context turn goes last, after the new user message
    pub fn build(&self, history: &[HistoryEntry], message: &str, passages: &[String]) -> Vec<Turn> {
        let mut turns = self.conversation_turns(history, message);
        turns.push(Self::context_turn(passages));
        turns
    }
}
