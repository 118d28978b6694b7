//! Query-time retrieval over the indexed passages

mod service;

pub use service::{RetrievalService, NO_RELEVANT_DOCUMENTS};
