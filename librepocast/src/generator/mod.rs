//! Content generation
//!
//! Generation is best-effort. A backend failure or a rejected output falls
//! back to the deterministic template, so the pipeline never loses a
//! candidate to its content step.

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::types::Candidate;

pub mod ollama;

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, candidate: &Candidate) -> Result<String, GenerationError>;
}

/// Strip model artifacts: anything after a code fence, bold markers, padding.
pub fn sanitize(text: &str) -> String {
    text.split("```")
        .next()
        .unwrap_or_default()
        .replace("**", "")
        .trim()
        .to_string()
}

/// Reject content the publish target would refuse outright.
pub fn validate(content: &str, character_limit: usize) -> Result<(), GenerationError> {
    if content.is_empty() {
        return Err(GenerationError::Rejected("empty content".to_string()));
    }
    let length = content.chars().count();
    if length > character_limit {
        return Err(GenerationError::Rejected(format!(
            "content is {} characters, limit is {}",
            length, character_limit
        )));
    }
    Ok(())
}

/// Deterministic fallback used whenever generation fails or its output is
/// rejected. Keyed off the candidate fields only.
pub fn fallback_content(candidate: &Candidate, character_limit: usize) -> String {
    let description: String = candidate.description.chars().take(100).collect();
    let language = candidate.language.as_deref().unwrap_or("Unknown");

    let content = format!(
        "🚀 Check out {} - {}\n\n⭐ {} stars | {}\n#OpenSource #GitHub",
        candidate.name, description, candidate.stars, language
    );
    content.chars().take(character_limit).collect()
}
