//! Ollama-backed content generator

use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::Ollama;
use tracing::debug;

use crate::error::GenerationError;
use crate::types::Candidate;

use super::{sanitize, ContentGenerator};

pub struct OllamaGenerator {
    client: Ollama,
    model: String,
    character_limit: usize,
}

impl OllamaGenerator {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        model: impl Into<String>,
        character_limit: usize,
    ) -> Self {
        Self {
            client: Ollama::new(host.into(), port),
            model: model.into(),
            character_limit,
        }
    }

    fn prompt(&self, candidate: &Candidate) -> String {
        format!(
            "Create an engaging technical post about this open-source project:\n\
             - Project: {}\n\
             - Language: {}\n\
             - Stars: {}\n\
             - Description: {}\n\
             - URL: {}\n\n\
             Guidelines:\n\
             - Keep under {} characters\n\
             - Highlight technical merits\n\
             - Include relevant hashtags (max 3)\n\
             - Emphasize why developers should check it out\n\
             - Use emojis sparingly",
            candidate.name,
            candidate.language.as_deref().unwrap_or("Unknown"),
            candidate.stars,
            candidate.description,
            candidate.id,
            self.character_limit,
        )
    }
}

#[async_trait]
impl ContentGenerator for OllamaGenerator {
    async fn generate(&self, candidate: &Candidate) -> Result<String, GenerationError> {
        debug!("Generating content for {} with {}", candidate.id, self.model);

        let request = GenerationRequest::new(self.model.clone(), self.prompt(candidate));
        let response = self
            .client
            .generate(request)
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        Ok(sanitize(&response.response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate {
            id: "https://github.com/tokio-rs/tokio".to_string(),
            name: "tokio-rs/tokio".to_string(),
            description: "A runtime for asynchronous applications".to_string(),
            stars: 28_154,
            language: Some("Rust".to_string()),
        }
    }

    #[test]
    fn test_prompt_includes_candidate_fields() {
        let generator = OllamaGenerator::new("http://localhost", 11434, "deepseek-coder", 500);
        let prompt = generator.prompt(&candidate());

        assert!(prompt.contains("tokio-rs/tokio"));
        assert!(prompt.contains("Rust"));
        assert!(prompt.contains("28154"));
        assert!(prompt.contains("https://github.com/tokio-rs/tokio"));
        assert!(prompt.contains("under 500 characters"));
    }

    #[test]
    fn test_prompt_handles_missing_language() {
        let generator = OllamaGenerator::new("http://localhost", 11434, "deepseek-coder", 500);
        let mut candidate = candidate();
        candidate.language = None;
        assert!(generator.prompt(&candidate).contains("Language: Unknown"));
    }
}
