//! Stats command handler.
//!
//! Shows what the persisted index contains.

use clap::Args;
use mediguide_core::{config::AppConfig, AppResult};
use std::path::PathBuf;

/// Show vector index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Index directory (default: medical_index/)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let index_dir = self
            .index
            .as_ref()
            .map(|p| config.resolve_path(p))
            .unwrap_or_else(|| config.index_path());

        let stats = mediguide_knowledge::stats(&index_dir)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Index: {}", stats.index_path.display());
            println!("  Sources: {}", stats.sources_count);
            println!("  Chunks: {}", stats.chunks_count);
            println!("  DB size: {} bytes", stats.db_size_bytes);
            match stats.manifest {
                Some(manifest) => {
                    println!(
                        "  Embeddings: {} / {} ({} dims)",
                        manifest.provider, manifest.model, manifest.dimensions
                    );
                    println!("  Built: {}", manifest.built_at);
                }
                None => println!("  Embeddings: (no manifest, run 'mediguide ingest')"),
            }
        }

        Ok(())
    }
}
