//! Embedding engine for the vector index.
//!
//! Provides provider-agnostic embedding generation behind the
//! [`EmbeddingProvider`] trait.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, manifest_for, validate_manifest, EmbeddingProvider};

use mediguide_core::{AppError, AppResult};

/// Embed texts in batches of at most `batch_size`, preserving order.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        "Embedding {} texts using provider '{}' (model: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let mut embeddings = Vec::with_capacity(texts.len());
    for (i, batch) in texts.chunks(batch_size.max(1)).enumerate() {
        let batch_embeddings = provider.embed_batch(batch).await?;
        if batch_embeddings.len() != batch.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding batch {} returned {} vectors for {} texts",
                i,
                batch_embeddings.len(),
                batch.len()
            )));
        }
        tracing::debug!("Embedded batch {} ({} texts)", i, batch.len());
        embeddings.extend(batch_embeddings);
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        embeddings.len(),
        provider.dimensions()
    );

    Ok(embeddings)
}
