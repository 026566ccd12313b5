//! Ask command handler.
//!
//! Answers one question from the command line with the same pipeline the
//! server uses.

use clap::Args;
use mediguide_core::{config::AppConfig, AppResult};

/// Ask a medical question against the index
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let question = self.question.trim();
        if question.is_empty() {
            return Err(mediguide_core::AppError::Config(
                "No question provided".to_string(),
            ));
        }

        let rag = mediguide_server::build_pipeline(config)?;
        let response = rag.answer(question).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            println!("{}", response.answer);
            println!();

            if response.sources.is_empty() {
                println!("Sources: (no sources available)");
            } else {
                println!("Sources:");
                for source_ref in &response.sources {
                    println!("- {} (score {:.3})", source_ref.source, source_ref.score);
                }
            }
        }

        Ok(())
    }
}
