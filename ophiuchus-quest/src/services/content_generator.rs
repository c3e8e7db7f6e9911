//! Content generator client
//!
//! Produces free-text puzzle content (riddles, trivia answers, vignettes)
//! from natural-language prompts. Failures are not retried; they surface
//! to the caller as generation errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use ophiuchus_common::config::GeneratorConfig;
use ophiuchus_common::{Error, Result};

/// Generative text collaborator
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Produce free-text content for a prompt. Non-deterministic.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// HTTP-backed content generator
pub struct HttpContentGenerator {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpContentGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Generation(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(endpoint = %self.endpoint, "Requesting generated content");

        let mut request = self
            .http_client
            .post(&self.endpoint)
            .json(&GenerateRequest { prompt });

        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Generation(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "Generator returned {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("Invalid response body: {}", e)))?;

        let text = body.text.trim().to_string();
        if text.is_empty() {
            return Err(Error::Generation("Generator returned empty text".to_string()));
        }

        Ok(text)
    }
}
