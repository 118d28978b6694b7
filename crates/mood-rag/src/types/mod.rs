//! Core types for the RAG pipeline

pub mod conversation;
pub mod passage;

pub use conversation::{ChatRequest, GenerationParams, HistoryEntry, Role, Turn};
pub use passage::{FileType, Passage, PassageCollection, RetrievedPassage};
