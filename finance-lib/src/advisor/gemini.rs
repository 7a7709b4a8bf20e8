use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::advisor::{LanguageModel, LanguageModelError};
use crate::config::GeminiConfig;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Google Gemini `generateContent` client. The API key is sent as a header.
pub struct GeminiClient {
    client: Client,
    url: String,
    api_key: String,
}

impl GeminiClient {
    const TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(config: &GeminiConfig) -> Result<GeminiClient, anyhow::Error> {
        Self::with_base_url(config, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(config: &GeminiConfig, base_url: &str) -> Result<GeminiClient, anyhow::Error> {
        let client = Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .context("Unable to create HTTP client")?;

        Ok(GeminiClient {
            client,
            url: format!(
                "{}/v1beta/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    #[instrument(skip_all)]
    async fn generate(&self, prompt: &str) -> Result<String, LanguageModelError> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(LanguageModelError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Gemini request failed");
            return Err(LanguageModelError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(LanguageModelError::InvalidResponse)?;
        body.into_text()
            .filter(|text| !text.trim().is_empty())
            .ok_or(LanguageModelError::EmptyResponse)
    }
}
