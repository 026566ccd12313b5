//! Prompt types for MediGuide.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};

/// A prompt definition, either built in or loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Template string with Handlebars syntax.
    ///
    /// Receives `question` and `context_text`.
    pub template: String,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered prompt text
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Number of retrieved passages placed in the context
    #[serde(rename = "contextChunks")]
    pub context_chunks: usize,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(user: String, source_prompt_id: String, context_chunks: usize) -> Self {
        Self {
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                context_chunks,
            },
        }
    }

    /// Length of the rendered prompt in characters.
    pub fn char_len(&self) -> usize {
        self.user.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: mediguide.answer.short
title: Short answers
apiVersion: "1.0"
createdBy: clinic
template: "Q: {{question}}\nC: {{context_text}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "mediguide.answer.short");
        assert_eq!(def.api_version, "1.0");
        assert_eq!(def.created_by, "clinic");
        assert!(def.description.is_none());
    }

    #[test]
    fn test_built_prompt_creation() {
        let built = BuiltPrompt::new("Prompt é".to_string(), "test.prompt".to_string(), 2);

        assert_eq!(built.user, "Prompt é");
        assert_eq!(built.char_len(), 8);
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
        assert_eq!(built.metadata.context_chunks, 2);
    }
}
