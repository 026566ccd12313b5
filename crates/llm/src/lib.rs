//! LLM integration crate for MediGuide.
//!
//! This crate provides a provider-agnostic abstraction for the answer
//! generation step. Every provider implements [`LlmClient`], so the RAG
//! pipeline and the HTTP server never depend on a concrete backend.
//!
//! # Providers
//! - **Gemini**: Google Generative Language API (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use mediguide_llm::{LlmClient, LlmRequest, providers::GeminiClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new("my-api-key", Duration::from_secs(120))?;
//! let request = LlmRequest::new("What is diabetes?", "gemini-2.5-flash");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GeminiClient, OllamaClient};
pub use types::{ProviderType, DEFAULT_GEMINI_MODEL};
