//! Shared application state.

use mediguide_core::{AppConfig, AppError, AppResult};
use mediguide_knowledge::{create_provider, EmbeddingConfig, FlatIndex, RagPipeline, Retriever};
use mediguide_llm::create_client;
use mediguide_prompt::load_or_default;
use std::sync::Arc;

/// State shared by every handler. Read-only after startup.
pub struct AppState {
    pub rag: RagPipeline,
}

impl AppState {
    pub fn new(rag: RagPipeline) -> Self {
        Self { rag }
    }
}

/// Assemble the answering pipeline from configuration.
///
/// Loads the persisted index into memory and fails if it was built with
/// different embeddings than the ones configured.
pub fn build_pipeline(config: &AppConfig) -> AppResult<RagPipeline> {
    let api_key = config.google_api_key.as_deref();

    let embedding_config = EmbeddingConfig::from(&config.embedding);
    let embeddings = create_provider(&embedding_config, api_key)?;

    let index = FlatIndex::load(&config.index_path(), embeddings.as_ref())?;
    let retriever = Retriever::new(Arc::new(index), embeddings, config.index.top_k);

    let llm = create_client(
        &config.llm.provider,
        config.llm.endpoint.as_deref(),
        api_key,
        config.llm.timeout_secs,
    )
    .map_err(AppError::Config)?;

    let prompt = load_or_default(config.prompt_template_path().as_deref())?;
    tracing::debug!("Using prompt '{}' ({})", prompt.id, prompt.api_version);

    Ok(RagPipeline::new(
        retriever,
        llm,
        prompt,
        config.llm.model.clone(),
    ))
}
