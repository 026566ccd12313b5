//! Vector index abstraction for knowledge chunks.
//!
//! The serving path only ever reads the index, so the trait exposes search
//! and size. [`FlatIndex`] keeps every embedding in memory and scores them
//! all with cosine similarity.

use crate::embeddings::{validate_manifest, EmbeddingProvider};
use crate::index;
use crate::types::{IndexManifest, KnowledgeChunk};
use mediguide_core::{AppError, AppResult};
use std::path::Path;

/// Trait for read-only vector index backends.
pub trait VectorIndex: Send + Sync {
    /// Search for the top-k most similar chunks to the query embedding.
    ///
    /// Returns at most `top_k` chunks ordered by descending similarity score.
    fn search(&self, query_embedding: &[f32], top_k: usize)
        -> AppResult<Vec<(KnowledgeChunk, f32)>>;

    /// Number of chunks in the index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exact in-memory index over normalized embeddings.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    chunks: Vec<KnowledgeChunk>,
    dimensions: usize,
}

impl FlatIndex {
    /// Build an index from chunks that all carry `dimensions`-long embeddings.
    pub fn from_chunks(chunks: Vec<KnowledgeChunk>, dimensions: usize) -> AppResult<Self> {
        for chunk in &chunks {
            match &chunk.embedding {
                Some(embedding) if embedding.len() == dimensions => {}
                Some(embedding) => {
                    return Err(AppError::Knowledge(format!(
                        "Chunk {} has {} dimensions, index expects {}",
                        chunk.id,
                        embedding.len(),
                        dimensions
                    )))
                }
                None => {
                    return Err(AppError::Knowledge(format!(
                        "Chunk {} has no embedding",
                        chunk.id
                    )))
                }
            }
        }

        Ok(Self { chunks, dimensions })
    }

    /// Load a persisted index, refusing one built with other embeddings.
    ///
    /// An index without a manifest was never ingested into and is rejected.
    pub fn load(index_dir: &Path, provider: &dyn EmbeddingProvider) -> AppResult<Self> {
        let db_path = crate::config::get_index_path(index_dir);
        let conn = index::open_index(&db_path)?;

        let manifest = index::read_manifest(&conn)?.ok_or_else(|| {
            AppError::Knowledge(format!(
                "Index at {:?} has no manifest. Run 'mediguide ingest' to rebuild it.",
                db_path
            ))
        })?;
        validate_manifest(provider, &manifest)?;

        let chunks = index::load_chunks(&conn)?;
        let flat = Self::from_chunks(chunks, manifest.dimensions)?;

        log_loaded(&manifest, flat.len());
        Ok(flat)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn log_loaded(manifest: &IndexManifest, chunks: usize) {
    tracing::info!(
        "Loaded vector index: {} chunks ({} / {}, {} dims, built {})",
        chunks,
        manifest.provider,
        manifest.model,
        manifest.dimensions,
        manifest.built_at.format("%Y-%m-%d %H:%M:%S")
    );
}

impl VectorIndex for FlatIndex {
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
        if query_embedding.len() != self.dimensions {
            return Err(AppError::Knowledge(format!(
                "Query embedding has {} dimensions, index expects {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| {
                chunk
                    .embedding
                    .as_ref()
                    .map(|e| (i, cosine_similarity(query_embedding, e)))
            })
            .collect();

        // Sort by score descending, ties keep insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            scored.len(),
            top_k
        );

        Ok(scored
            .into_iter()
            .map(|(i, score)| (self.chunks[i].clone(), score))
            .collect())
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot_product / (norm_a * norm_b);
    // NaN components score as unrelated
    if score.is_nan() {
        0.0
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            source: "a.pdf".to_string(),
            position: 0,
            text: id.to_string(),
            embedding: Some(embedding),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::NAN, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_from_chunks_rejects_wrong_dimensions() {
        let result = FlatIndex::from_chunks(vec![chunk("c1", vec![1.0, 0.0, 0.0])], 2);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_chunks_rejects_missing_embedding() {
        let mut c = chunk("c1", vec![1.0]);
        c.embedding = None;
        assert!(FlatIndex::from_chunks(vec![c], 1).is_err());
    }

    #[test]
    fn test_search_orders_by_score() {
        let index = FlatIndex::from_chunks(
            vec![
                chunk("far", vec![0.0, 1.0]),
                chunk("near", vec![1.0, 0.1]),
                chunk("mid", vec![1.0, 1.0]),
            ],
            2,
        )
        .unwrap();

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = results.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!(results[0].1 >= results[1].1 && results[1].1 >= results[2].1);
    }

    #[test]
    fn test_nan_embedding_ranks_below_real_matches() {
        let index = FlatIndex::from_chunks(
            vec![
                chunk("broken", vec![f32::NAN, 1.0]),
                chunk("near", vec![1.0, 0.1]),
                chunk("far", vec![0.0, 1.0]),
            ],
            2,
        )
        .unwrap();

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0.id, "near");
        assert!(results.iter().all(|(_, score)| !score.is_nan()));
        assert!(results[0].1 >= results[1].1 && results[1].1 >= results[2].1);
    }

    #[test]
    fn test_search_never_exceeds_top_k() {
        let chunks = (0..10).map(|i| chunk(&i.to_string(), vec![1.0, i as f32])).collect();
        let index = FlatIndex::from_chunks(chunks, 2).unwrap();

        assert_eq!(index.search(&[1.0, 0.0], 3).unwrap().len(), 3);
        assert_eq!(index.search(&[1.0, 0.0], 0).unwrap().len(), 0);
        assert_eq!(index.search(&[1.0, 0.0], 50).unwrap().len(), 10);
    }

    #[test]
    fn test_search_empty_index() {
        let index = FlatIndex::from_chunks(Vec::new(), 4).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_search_rejects_query_dimension_mismatch() {
        let index = FlatIndex::from_chunks(vec![chunk("c1", vec![1.0, 0.0])], 2).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 3).is_err());
    }
}
