//! RAG answering orchestration.
//!
//! Retrieves relevant chunks, renders the prompt and asks the LLM.

use crate::rag::types::{RagResponse, RagSourceRef};
use crate::retriever::Retriever;
use crate::types::RetrievalResult;
use mediguide_core::{AppError, AppResult};
use mediguide_llm::{LlmClient, LlmRequest};
use mediguide_prompt::{build_prompt, PromptDefinition};
use std::collections::HashSet;
use std::sync::Arc;

/// Maximum snippet length for source references, in characters.
const MAX_SNIPPET_LENGTH: usize = 150;

/// Question in, grounded answer out.
///
/// Shared read-only between requests; nothing here is mutated after
/// construction.
#[derive(Clone)]
pub struct RagPipeline {
    retriever: Retriever,
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
}

impl RagPipeline {
    pub fn new(
        retriever: Retriever,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        model: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            llm,
            prompt,
            model: model.into(),
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer a question from the indexed documents.
    ///
    /// No retries: an embedding or LLM failure is returned as is.
    pub async fn answer(&self, question: &str) -> AppResult<RagResponse> {
        tracing::info!("User question: {}", question);

        let retrieved = self.retriever.retrieve(question).await?;
        tracing::info!("Docs found: {}", retrieved.len());
        for (i, chunk) in retrieved.chunks.iter().enumerate() {
            tracing::info!("Doc {} source: {}", i, chunk.source);
        }

        let built = build_prompt(&self.prompt, question, &retrieved.texts())?;
        let prompt_chars = built.char_len();
        tracing::info!("Prompt length: {}", prompt_chars);

        let request = LlmRequest::new(built.user, self.model.clone());
        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| match e {
                AppError::Llm(_) => e,
                other => AppError::Llm(other.to_string()),
            })?;
        tracing::info!("Response received");

        let answer = response.content.trim().to_string();
        let sources = map_chunks_to_sources(&retrieved);

        Ok(RagResponse::new(answer, sources, prompt_chars))
    }
}

/// Map retrieved chunks to source references, one per source.
fn map_chunks_to_sources(retrieved: &RetrievalResult) -> Vec<RagSourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for (chunk, score) in retrieved.chunks.iter().zip(&retrieved.scores) {
        if seen.insert(chunk.source.as_str()) {
            sources.push(RagSourceRef {
                source: chunk.source.clone(),
                score: *score,
                snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_LENGTH),
            });
        }
    }

    sources
}

/// Truncate snippet to at most `max_chars` characters plus an ellipsis.
fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();
    // Prefer a word boundary
    match truncated.rfind(char::is_whitespace) {
        Some(last_space) if last_space > 0 => format!("{}...", &truncated[..last_space]),
        _ => format!("{}...", truncated),
    }
}
