//! Prompt builder for rendering templates and injecting retrieved context.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use mediguide_core::{AppError, AppResult};
use std::collections::HashMap;

/// Context text used when retrieval yields nothing.
pub const NO_CONTEXT: &str = "No context found.";

/// Identifier of the built-in template.
pub const DEFAULT_PROMPT_ID: &str = "mediguide.answer";

/// Built-in MediGuide answer template.
pub const DEFAULT_TEMPLATE: &str = "Your name is 'MediGuide', an intelligent medical assistant. \
Use **only** the information provided below to accurately and concisely answer the user's question.\n\n\
Question:\n{{question}}\n\n\
Available Information:\n{{context_text}}\n\n\
Answer:";

impl Default for PromptDefinition {
    fn default() -> Self {
        Self {
            id: DEFAULT_PROMPT_ID.to_string(),
            title: "MediGuide answer".to_string(),
            api_version: "1.0".to_string(),
            created_by: "mediguide".to_string(),
            description: Some("Answer strictly from retrieved passages".to_string()),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Join retrieved passages into the context block.
///
/// Passages are separated by a blank line; an empty slice yields [`NO_CONTEXT`].
pub fn format_context<S: AsRef<str>>(passages: &[S]) -> String {
    if passages.is_empty() {
        return NO_CONTEXT.to_string();
    }

    passages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build a prompt from a definition, a question and retrieved passages.
///
/// Rendering is deterministic: identical inputs give a byte-identical prompt.
/// Oversized contexts are not truncated.
///
/// # Example
/// ```
/// use mediguide_prompt::{build_prompt, PromptDefinition};
///
/// let definition = PromptDefinition::default();
/// let built = build_prompt(&definition, "What is acne?", &["Acne is..."]).unwrap();
/// assert!(built.user.contains("Question:\nWhat is acne?"));
/// ```
pub fn build_prompt<S: AsRef<str>>(
    definition: &PromptDefinition,
    question: &str,
    passages: &[S],
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut variables = HashMap::new();
    variables.insert("question".to_string(), question.to_string());
    variables.insert("context_text".to_string(), format_context(passages));

    let rendered = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        rendered,
        definition.id.clone(),
        passages.len(),
    ))
}

/// Render a Handlebars template with variables.
pub(crate) fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text output; medical passages must reach the model verbatim
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
