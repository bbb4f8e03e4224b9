//! Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{GenerationRequest, TextGenerator};
use crate::config::ScribeConfig;
use crate::error::{Result, StyleError};
use crate::retry::{send_with_retry, RetryPolicy};

/// HTTP client for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        timeout: std::time::Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(StyleError::Configuration("missing Gemini API key".into()));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| StyleError::Configuration("invalid Gemini API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| StyleError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// Build a client from config, reading the key from the configured env var.
    pub fn from_config(config: &ScribeConfig) -> Result<Self> {
        let var = &config.generation.api_key_env;
        let api_key = std::env::var(var).map_err(|_| {
            StyleError::Configuration(format!("{var} environment variable not set"))
        })?;
        Self::new(
            &api_key,
            &config.generation.base_url,
            config.network.request_timeout(),
            RetryPolicy::from_config(&config.network),
        )
    }

    fn endpoint(&self, model_id: &str) -> String {
        format!("{}/models/{model_id}:generateContent", self.base_url)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![PartIn { text: &request.prompt_text }],
            }],
            generation_config: GenerationConfigBody {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };
        let endpoint = self.endpoint(&request.model_id);

        let response = send_with_retry(&self.retry, "generateContent", || {
            self.client.post(&endpoint).json(&body)
        })
        .await?;

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| StyleError::Generation(format!("failed to parse Gemini response: {e}")))?;

        let text = parsed.text();
        tracing::debug!(model = %request.model_id, chars = text.len(), "generation complete");
        Ok(text)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfigBody,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<PartIn<'a>>,
}

#[derive(Serialize)]
struct PartIn<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigBody {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize, Default)]
struct GenerateContentResponse {
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
    parts: Vec<PartOut>,
}

#[derive(Debug, Deserialize)]
struct PartOut {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, trimmed.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}
