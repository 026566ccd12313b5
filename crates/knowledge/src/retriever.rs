//! Top-k similarity retrieval over a loaded vector index.

use crate::embeddings::EmbeddingProvider;
use crate::types::RetrievalResult;
use crate::vector_index::VectorIndex;
use mediguide_core::AppResult;
use std::sync::Arc;

/// Default number of chunks handed to the prompt.
pub const DEFAULT_TOP_K: usize = 3;

/// Embeds a question and returns its nearest chunks.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embeddings: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embeddings: Arc<dyn EmbeddingProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embeddings,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Number of chunks available to search.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Retrieve at most `top_k` chunks by descending similarity.
    pub async fn retrieve(&self, question: &str) -> AppResult<RetrievalResult> {
        if self.index.is_empty() {
            tracing::debug!("Index is empty, skipping query embedding");
            return Ok(RetrievalResult::default());
        }

        let query_embedding = self.embeddings.embed(question).await?;
        let results = self.index.search(&query_embedding, self.top_k)?;

        let (chunks, scores): (Vec<_>, Vec<_>) = results.into_iter().unzip();

        if let (Some(first), Some(last)) = (scores.first(), scores.last()) {
            tracing::debug!(
                "Retrieved {} chunks (top score: {:.3}, lowest: {:.3})",
                chunks.len(),
                first,
                last
            );
        }

        Ok(RetrievalResult { chunks, scores })
    }
}
