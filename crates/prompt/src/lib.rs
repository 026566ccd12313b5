//! Prompt system for MediGuide.
//!
//! This crate provides structured prompt management with:
//! - A built-in MediGuide answer template
//! - Optional YAML prompt definitions
//! - Handlebars template rendering with retrieved context injection

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, format_context, DEFAULT_TEMPLATE, NO_CONTEXT};
pub use loader::{load_or_default, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
