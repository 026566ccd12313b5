//! RAG (Retrieval-Augmented Generation) answering.
//!
//! Provides natural language answering over the indexed medical documents.

pub mod ask;
pub mod types;

pub use ask::RagPipeline;
pub use types::{RagResponse, RagSourceRef};
