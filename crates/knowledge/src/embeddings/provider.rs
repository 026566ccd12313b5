//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{GeminiProvider, OllamaProvider, TrigramProvider};
use crate::types::IndexManifest;
use chrono::Utc;
use mediguide_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama", "gemini")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::Knowledge(
            "Embedding dimensions must be at least 1".to_string(),
        ));
    }

    match config.provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(config.dimensions))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),

        "gemini" => {
            let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                AppError::Config("Gemini embeddings require GOOGLE_API_KEY".to_string())
            })?;
            Ok(Arc::new(GeminiProvider::new(config, api_key)?))
        }

        _ => Err(AppError::Knowledge(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama, gemini",
            config.provider
        ))),
    }
}

/// Describe a provider as an index manifest.
pub fn manifest_for(provider: &dyn EmbeddingProvider) -> IndexManifest {
    IndexManifest {
        provider: provider.provider_name().to_string(),
        model: provider.model_name().to_string(),
        dimensions: provider.dimensions(),
        built_at: Utc::now(),
    }
}

/// Check that an index was built with the same embeddings a provider produces.
pub fn validate_manifest(
    provider: &dyn EmbeddingProvider,
    manifest: &IndexManifest,
) -> AppResult<()> {
    if provider.provider_name() != manifest.provider {
        return Err(AppError::Knowledge(format!(
            "Provider mismatch: index built with '{}', configured '{}'",
            manifest.provider,
            provider.provider_name()
        )));
    }

    if provider.model_name() != manifest.model {
        return Err(AppError::Knowledge(format!(
            "Model mismatch: index built with '{}', configured '{}'",
            manifest.model,
            provider.model_name()
        )));
    }

    if provider.dimensions() != manifest.dimensions {
        return Err(AppError::Knowledge(format!(
            "Dimension mismatch: index built with {}, configured {}",
            manifest.dimensions,
            provider.dimensions()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(provider: &str, model: &str, dimensions: usize) -> IndexManifest {
        IndexManifest {
            provider: provider.to_string(),
            model: model.to_string(),
            dimensions,
            built_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_trigram_provider() {
        let provider = create_provider(&EmbeddingConfig::default(), None).unwrap();
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_ollama_provider() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            ..Default::default()
        };
        let provider = create_provider(&config, None).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let config = EmbeddingConfig {
            provider: "gemini".to_string(),
            model: "text-embedding-004".to_string(),
            dimensions: 768,
            ..Default::default()
        };

        let result = create_provider(&config, None);
        assert!(matches!(result, Err(AppError::Config(_))));

        let provider = create_provider(&config, Some("key")).unwrap();
        assert_eq!(provider.provider_name(), "gemini");
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "unknown".to_string(),
            ..Default::default()
        };

        let result = create_provider(&config, None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let config = EmbeddingConfig {
            dimensions: 0,
            ..Default::default()
        };
        assert!(create_provider(&config, None).is_err());
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&EmbeddingConfig::default(), None).unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }

    #[test]
    fn test_manifest_roundtrip_validates() {
        let provider = TrigramProvider::new(384);
        let manifest = manifest_for(&provider);
        assert_eq!(manifest.provider, "trigram");
        assert!(validate_manifest(&provider, &manifest).is_ok());
    }

    #[test]
    fn test_validate_manifest_mismatches() {
        let provider = TrigramProvider::new(384);

        let cases = [
            (manifest("gemini", "trigram-v1", 384), "Provider mismatch"),
            (manifest("trigram", "other", 384), "Model mismatch"),
            (manifest("trigram", "trigram-v1", 768), "Dimension mismatch"),
        ];
        for (stored, expected) in cases {
            let err = validate_manifest(&provider, &stored).unwrap_err();
            assert!(err.to_string().contains(expected), "{}", err);
        }
    }
}
