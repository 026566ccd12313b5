//! Offline ingestion: PDFs in, persisted vector index out.

use crate::chunker::text_split;
use crate::document::{filter_to_minimal_docs, load_pdf_files};
use crate::embeddings::{embed_in_batches, manifest_for, EmbeddingProvider};
use crate::index;
use crate::types::{IngestOptions, IngestStats, KnowledgeChunk, KnowledgeSource, MinimalDocument};
use chrono::Utc;
use mediguide_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::time::Instant;

/// Build the vector index from every PDF under the data directory.
pub async fn ingest(
    options: &IngestOptions,
    provider: &dyn EmbeddingProvider,
) -> AppResult<IngestStats> {
    tracing::info!(
        "Starting ingest from {:?} into {:?}",
        options.data_dir,
        options.index_dir
    );

    let documents = load_pdf_files(&options.data_dir).await?;
    let minimal = filter_to_minimal_docs(documents);

    index_documents(&minimal, options, provider).await
}

/// Split, embed and persist documents, replacing the index contents.
///
/// Embeddings are computed before the database is touched, so a failed
/// embedding call leaves the previous index intact. The write itself runs
/// in one transaction: the old contents are replaced atomically.
pub async fn index_documents(
    minimal: &[MinimalDocument],
    options: &IngestOptions,
    provider: &dyn EmbeddingProvider,
) -> AppResult<IngestStats> {
    let start = Instant::now();
    let documents_count = minimal.len() as u32;

    let mut bytes_per_source: BTreeMap<String, u64> = BTreeMap::new();
    for doc in minimal {
        *bytes_per_source.entry(doc.source.clone()).or_insert(0) += doc.content.len() as u64;
    }

    let candidates = text_split(minimal, options.chunk_size, options.chunk_overlap)?;
    tracing::info!(
        "Split {} pages into {} chunks",
        documents_count,
        candidates.len()
    );

    if candidates.is_empty() {
        tracing::warn!("No text extracted from {:?}; index will be empty", options.data_dir);
    }

    let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    let embeddings = embed_in_batches(provider, &texts, options.batch_size).await?;

    let chunks: Vec<KnowledgeChunk> = candidates
        .into_iter()
        .zip(embeddings)
        .map(|(candidate, embedding)| KnowledgeChunk {
            id: uuid::Uuid::new_v4().to_string(),
            source: candidate.source,
            position: candidate.position,
            text: candidate.text,
            embedding: Some(embedding),
        })
        .collect();

    let mut chunks_per_source: BTreeMap<&str, u32> = BTreeMap::new();
    for chunk in &chunks {
        *chunks_per_source.entry(chunk.source.as_str()).or_insert(0) += 1;
    }

    let db_path = crate::config::get_index_path(&options.index_dir);
    let mut conn = index::init_index(&db_path)?;
    let tx = conn
        .transaction()
        .map_err(|e| AppError::Knowledge(format!("Failed to start transaction: {}", e)))?;

    index::reset_index(&tx)?;

    let learned_at = Utc::now();
    for (path, size_bytes) in &bytes_per_source {
        let chunk_count = chunks_per_source.get(path.as_str()).copied().unwrap_or(0);
        index::insert_source(
            &tx,
            &KnowledgeSource {
                id: uuid::Uuid::new_v4().to_string(),
                path: path.clone(),
                learned_at,
                size_bytes: *size_bytes,
                chunk_count,
            },
        )?;
    }

    for chunk in &chunks {
        index::insert_chunk(&tx, chunk)?;
    }

    index::write_manifest(&tx, &manifest_for(provider))?;

    tx.commit()
        .map_err(|e| AppError::Knowledge(format!("Failed to commit index: {}", e)))?;

    let duration = start.elapsed();
    let stats = IngestStats {
        sources_count: bytes_per_source.len() as u32,
        documents_count,
        chunks_count: chunks.len() as u32,
        bytes_processed: bytes_per_source.values().sum(),
        duration_secs: duration.as_secs_f64(),
    };

    tracing::info!(
        "Ingest completed: {} sources, {} chunks, {} bytes in {:.2}s",
        stats.sources_count,
        stats.chunks_count,
        stats.bytes_processed,
        stats.duration_secs
    );

    Ok(stats)
}
