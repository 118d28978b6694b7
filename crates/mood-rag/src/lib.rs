//! mood-rag: page-level retrieval-augmented chat over a single document
//!
//! Pages of one document become passages, every passage is embedded once at
//! startup and indexed for exact L2 nearest-neighbor search, and each chat
//! turn streams a growing answer grounded in the closest pages.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod retrieval;
pub mod server;
pub mod service;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use service::RagService;
pub use types::{
    ChatRequest, GenerationParams, HistoryEntry, Passage, PassageCollection, RetrievedPassage,
    Role, Turn,
};
