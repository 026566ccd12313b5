//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A page of extracted text with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Extracted page text
    pub page_content: String,

    /// Document metadata
    pub metadata: DocumentMetadata,
}

/// Metadata attached to an extracted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// File path the text was extracted from
    pub source: String,

    /// 0-based page number within the source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Total pages in the source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

/// A document reduced to content and source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimalDocument {
    pub content: String,
    pub source: String,
}

/// A source document recorded in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSource {
    /// Unique source identifier
    pub id: String,

    /// Source path as recorded during ingestion
    pub path: String,

    /// When this source was indexed
    pub learned_at: DateTime<Utc>,

    /// Bytes of extracted text
    pub size_bytes: u64,

    /// Number of chunks created from this source
    pub chunk_count: u32,
}

/// A text chunk with embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Source path the chunk was cut from
    pub source: String,

    /// Position within source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkCandidate {
    pub source: String,
    pub position: u32,
    pub text: String,
}

/// Embedding settings an index was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Embedding provider name
    pub provider: String,

    /// Embedding model identifier
    pub model: String,

    /// Embedding vector dimension
    pub dimensions: usize,

    /// When the index was built
    pub built_at: DateTime<Utc>,
}

/// Options for the ingest operation.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Directory scanned for PDF files
    pub data_dir: PathBuf,

    /// Index directory (holds `index.sqlite`)
    pub index_dir: PathBuf,

    /// Maximum characters per chunk
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Texts per embedding request
    pub batch_size: usize,
}

/// Statistics from an ingest operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    /// Number of PDF files that produced text
    pub sources_count: u32,

    /// Number of pages extracted
    pub documents_count: u32,

    /// Number of chunks written to the index
    pub chunks_count: u32,

    /// Total bytes of extracted text
    pub bytes_processed: u64,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Result from a knowledge retrieval.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Retrieved chunks (sorted by relevance)
    pub chunks: Vec<KnowledgeChunk>,

    /// Relevance scores
    pub scores: Vec<f32>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Texts of the retrieved chunks, best first.
    pub fn texts(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.text.as_str()).collect()
    }
}

/// Statistics for an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Index database path
    pub index_path: PathBuf,

    /// Number of sources
    pub sources_count: u32,

    /// Number of chunks
    pub chunks_count: u32,

    /// Database size in bytes
    pub db_size_bytes: u64,

    /// Embedding manifest, absent for an index never ingested into
    pub manifest: Option<IndexManifest>,
}
