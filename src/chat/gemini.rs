//! Google Gemini API client.
//!
//! Sends a single user turn to `generateContent` with a fixed generation
//! config (one candidate, stop sequences, short output, temperature 0).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::ChatGateway;
use crate::SkydashError;
use crate::config::ChatConfig;

const PROVIDER: &str = "Gemini";

/// Gemini API client.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    generation: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    candidate_count: u32,
    stop_sequences: Vec<String>,
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.is_empty() { None } else { Some(text) }
    }
}

impl GeminiClient {
    pub fn new(config: &ChatConfig) -> crate::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .build()
            .map_err(|e| SkydashError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
            generation: GenerationConfig {
                candidate_count: 1,
                stop_sequences: config.stop_sequences.clone(),
                max_output_tokens: config.max_output_tokens,
                temperature: config.temperature,
            },
        })
    }

    fn api_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Generate a completion for a single user turn.
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    pub async fn generate(&self, prompt: &str) -> crate::Result<Option<String>> {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: &self.generation,
        };

        debug!("Gemini API request");

        let response = self
            .http
            .post(self.api_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SkydashError::provider(PROVIDER, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SkydashError::provider(
                PROVIDER,
                format!("HTTP {status}: {text}"),
            ));
        }

        let response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SkydashError::provider(PROVIDER, format!("failed to parse response: {e}")))?;

        Ok(response.text())
    }
}

#[async_trait]
impl ChatGateway for GeminiClient {
    async fn complete(&self, prompt: &str) -> crate::Result<Option<String>> {
        self.generate(prompt).await
    }
}
