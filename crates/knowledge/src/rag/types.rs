//! RAG response types.

use serde::{Deserialize, Serialize};

/// A single source reference used to answer a query.
///
/// This is the user-facing representation of where information came from.
/// Chunk IDs and embeddings are hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagSourceRef {
    /// Source file path (e.g., "data/Medical_book.pdf")
    pub source: String,

    /// Best similarity score among the chunks from this source
    pub score: f32,

    /// Short snippet showing the relevant evidence (truncated if needed)
    pub snippet: String,
}

/// Response from a RAG answering query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    /// Answer text returned by the LLM, trimmed
    pub answer: String,

    /// Sources of the retrieved passages, deduplicated, best first
    pub sources: Vec<RagSourceRef>,

    /// Internal: length of the prompt sent to the LLM, in characters
    #[serde(skip_serializing)]
    pub prompt_chars: usize,
}

impl RagResponse {
    /// Create a new RAG response.
    pub fn new(answer: String, sources: Vec<RagSourceRef>, prompt_chars: usize) -> Self {
        Self {
            answer,
            sources,
            prompt_chars,
        }
    }
}
