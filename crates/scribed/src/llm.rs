//! HTTP text generator.
//!
//! Calls an OpenAI-compatible chat completions endpoint (Ollama and hosted
//! providers both expose one) with JSON response format. A request timeout
//! maps to [`LlmError::Timeout`] so the pipeline stages treat it exactly
//! like a parse failure.

use async_trait::async_trait;
use scribe_common::llm::{LlmConfig, LlmError, TextGenerator};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Real text generator backed by an OpenAI-compatible HTTP API
pub struct HttpTextGenerator {
    config: LlmConfig,
    http: reqwest::Client,
}

impl HttpTextGenerator {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.config.endpoint);

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "response_format": {"type": "json_object"},
        });

        info!(
            "LLM call [{}] ({} system chars, {} user chars)",
            self.config.model,
            system_prompt.len(),
            user_prompt.len()
        );

        let mut request = self.http.post(&url).json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.config.timeout_secs)
            } else {
                LlmError::Http(format!("Request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(LlmError::Http(format!("HTTP {}", response.status())));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Http(format!("Failed to read response: {}", e)))?;

        let text = response_json
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .ok_or(LlmError::Empty)?;

        debug!("LLM response ({} chars)", text.len());

        Ok(text.to_string())
    }
}
