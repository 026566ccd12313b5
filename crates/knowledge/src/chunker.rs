//! Text chunking with configurable size and overlap.

use crate::types::{ChunkCandidate, MinimalDocument};
use mediguide_core::{AppError, AppResult};
use std::collections::HashMap;
use text_splitter::{ChunkConfig, TextSplitter};

/// Split documents into overlapping chunks of at most `chunk_size` characters.
///
/// Positions count up per source, so pages of one PDF share a sequence.
/// Whitespace-only chunks are dropped.
pub fn text_split(
    documents: &[MinimalDocument],
    chunk_size: usize,
    chunk_overlap: usize,
) -> AppResult<Vec<ChunkCandidate>> {
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(chunk_overlap)
        .map_err(|e| AppError::Ingest(format!("Invalid chunk configuration: {}", e)))?;
    let splitter = TextSplitter::new(config);

    let mut positions: HashMap<&str, u32> = HashMap::new();
    let mut chunks = Vec::new();

    for doc in documents {
        for text in splitter.chunks(&doc.content) {
            if text.trim().is_empty() {
                continue;
            }

            let position = positions.entry(doc.source.as_str()).or_insert(0);
            chunks.push(ChunkCandidate {
                source: doc.source.clone(),
                position: *position,
                text: text.to_string(),
            });
            *position += 1;
        }
    }

    tracing::debug!(
        "Split {} documents into {} chunks (size {}, overlap {})",
        documents.len(),
        chunks.len(),
        chunk_size,
        chunk_overlap
    );

    Ok(chunks)
}
