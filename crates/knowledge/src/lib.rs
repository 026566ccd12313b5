//! Knowledge layer for MediGuide.
//!
//! Turns a directory of medical PDFs into a persisted vector index and
//! answers questions against it:
//!
//! - [`document`]: PDF page extraction and reduction to `{content, source}`
//! - [`chunker`]: overlapping character chunks
//! - [`embeddings`]: provider-agnostic embedding generation
//! - [`index`]: SQLite persistence; [`vector_index`]: in-memory search
//! - [`retriever`] and [`rag`]: top-k retrieval and LLM answering

pub mod chunker;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod rag;
pub mod retriever;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use ingest::{index_documents, ingest};
pub use rag::{RagPipeline, RagResponse, RagSourceRef};
pub use retriever::{Retriever, DEFAULT_TOP_K};
pub use types::{
    Document, IndexManifest, IndexStats, IngestOptions, IngestStats, KnowledgeChunk,
    MinimalDocument, RetrievalResult,
};
pub use vector_index::{FlatIndex, VectorIndex};

use mediguide_core::AppResult;
use std::path::Path;

/// Get statistics for the index stored in `index_dir`.
pub fn stats(index_dir: &Path) -> AppResult<IndexStats> {
    let index_path = config::get_index_path(index_dir);
    tracing::info!("Getting stats for index {:?}", index_path);

    let conn = index::open_index(&index_path)?;
    let (sources_count, chunks_count) = index::get_stats(&conn)?;
    let manifest = index::read_manifest(&conn)?;

    let db_size_bytes = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);

    Ok(IndexStats {
        index_path,
        sources_count,
        chunks_count,
        db_size_bytes,
        manifest,
    })
}
