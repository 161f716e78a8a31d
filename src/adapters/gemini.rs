//! Gemini adapter for text generation.
//!
//! Calls the `generateContent` REST endpoint directly with reqwest.
//! Endpoint: POST {endpoint}/models/{model}:generateContent
//! Auth: `x-goog-api-key` header

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{GenerationOutput, TextGenerator};
use crate::config::GenerationSettings;
use crate::domain::GenerationRequest;

/// Public Gemini API base URL
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Max characters of an error body kept in error messages
const MAX_ERROR_BODY: usize = 300;

/// Gemini REST client
pub struct GeminiClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

/// Response from generateContent
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

impl GeminiClient {
    /// Create a new client against the public endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key)
    }

    /// Create a client against a custom endpoint (proxies, tests)
    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from resolved settings
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .context("GENAI_API_KEY is required for the Gemini generator")?;
        Ok(Self::with_endpoint(settings.endpoint.clone(), api_key))
    }

    /// Build the generateContent URL for a model
    fn api_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        deadline: Duration,
    ) -> Result<GenerationOutput> {
        let url = self.api_url(&request.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(deadline)
            .json(&serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": request.prompt }],
                }],
            }))
            .send()
            .await
            .with_context(|| format!("Failed to call Gemini model '{}'", request.model))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            anyhow::bail!("Gemini API error {}: {}", status, body.trim());
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            anyhow::bail!("Gemini blocked the prompt: {}", reason);
        }

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.trim().is_empty())
            .context("Gemini returned no text")?;

        let tokens_used = parsed.usage_metadata.and_then(|u| u.total_token_count);
        debug!(model = %request.model, tokens_used = ?tokens_used, "Gemini response received");

        Ok(GenerationOutput {
            content,
            tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url() {
        let client = GeminiClient::with_endpoint("http://localhost:9999/v1beta/", "KEY");
        assert_eq!(
            client.api_url("gemini-2.5-flash"),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_default_endpoint() {
        let client = GeminiClient::new("KEY");
        assert_eq!(client.name(), "gemini");
        assert!(client.api_url("m").starts_with(DEFAULT_ENDPOINT));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "candidates": [{"content": {"parts": [{"text": "SELECT * "}, {"text": "FROM alimentos"}]}}],
            "usageMetadata": {"totalTokenCount": 42}
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(parsed.usage_metadata.unwrap().total_token_count, Some(42));
    }

    #[test]
    fn test_from_settings_requires_key() {
        let settings = GenerationSettings {
            api_key: None,
            ..Default::default()
        };
        assert!(GeminiClient::from_settings(&settings).is_err());
    }
}
