//! Ingest command handler.
//!
//! Builds the vector index from a directory of PDFs.

use clap::Args;
use mediguide_core::{config::AppConfig, AppResult};
use mediguide_knowledge::{create_provider, EmbeddingConfig, IngestOptions};
use std::path::PathBuf;

/// Build the vector index from PDF documents
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Directory containing PDF files (default: data/)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Index directory to write (default: medical_index/)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Maximum characters per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared between consecutive chunks
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");

        let options = self.options(config);
        validate_chunking(&options)?;

        let embedding_config = EmbeddingConfig::from(&config.embedding);
        let provider = create_provider(&embedding_config, config.google_api_key.as_deref())?;

        let stats = mediguide_knowledge::ingest(&options, provider.as_ref()).await?;

        if self.json {
            let output = serde_json::json!({
                "dataDir": options.data_dir,
                "index": options.index_dir,
                "sourcesCount": stats.sources_count,
                "documentsCount": stats.documents_count,
                "chunksCount": stats.chunks_count,
                "bytesProcessed": stats.bytes_processed,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} sources ({} pages, {} chunks, {} bytes) in {:.2}s",
                stats.sources_count,
                stats.documents_count,
                stats.chunks_count,
                stats.bytes_processed,
                stats.duration_secs
            );
            println!("Index written to {}", options.index_dir.display());
        }

        Ok(())
    }

    fn options(&self, config: &AppConfig) -> IngestOptions {
        IngestOptions {
            data_dir: self
                .data_dir
                .as_ref()
                .map(|p| config.resolve_path(p))
                .unwrap_or_else(|| config.data_dir()),
            index_dir: self
                .index
                .as_ref()
                .map(|p| config.resolve_path(p))
                .unwrap_or_else(|| config.index_path()),
            chunk_size: self.chunk_size.unwrap_or(config.ingest.chunk_size),
            chunk_overlap: self.chunk_overlap.unwrap_or(config.ingest.chunk_overlap),
            batch_size: config.embedding.batch_size,
        }
    }
}

/// Flag overrides bypass `AppConfig::validate`, so check them again.
fn validate_chunking(options: &IngestOptions) -> AppResult<()> {
    if options.chunk_size == 0 || options.chunk_overlap >= options.chunk_size {
        return Err(mediguide_core::AppError::Config(format!(
            "--chunk-overlap ({}) must be smaller than --chunk-size ({})",
            options.chunk_overlap, options.chunk_size
        )));
    }
    Ok(())
}
