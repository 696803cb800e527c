//! LLM client abstraction.
//!
//! Provides a generic interface for calling a text-generation backend and
//! parsing structured JSON back. Fence stripping, prose trimming and schema
//! coercion live here once, instead of being repeated per pipeline stage.
//! Supports real HTTP implementations and a scripted client for testing.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// LLM backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// LLM errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("LLM returned empty response")]
    Empty,

    #[error("Failed to parse LLM response: {0}")]
    Parse(String),
}

/// Generic text-generation backend.
///
/// Every model-backed pipeline stage is built on this single seam, so tests
/// can inject a [`ScriptedGenerator`] and no stage holds a hidden client.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for a system + user prompt pair
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// Call the generator and parse its answer into `T`.
///
/// Tolerates code fences and surrounding prose. A timeout or parse failure
/// surfaces as `Err`; the calling stage applies its own conservative
/// fallback.
pub async fn generate_structured<T: DeserializeOwned>(
    generator: &dyn TextGenerator,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<T, LlmError> {
    let raw = generator.generate(system_prompt, user_prompt).await?;
    parse_structured(&raw)
}

/// Parse model output into `T`, stripping fences and prose as needed.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    if let Ok(value) = serde_json::from_str::<T>(raw.trim()) {
        return Ok(value);
    }

    let candidate = slice_json(strip_fences(raw));
    serde_json::from_str::<T>(candidate).map_err(|e| LlmError::Parse(e.to_string()))
}

/// Strip a ```json (or bare ```) fence, returning the fenced body.
fn strip_fences(text: &str) -> &str {
    for marker in ["```json", "```"] {
        if let Some(start) = text.find(marker) {
            let body = &text[start + marker.len()..];
            if let Some(end) = body.find("```") {
                return &body[..end];
            }
            return body;
        }
    }
    text
}

/// Slice from the first JSON opener to its matching last closer.
///
/// Handles models that wrap JSON in prose ("Here is the array: [...]").
fn slice_json(text: &str) -> &str {
    let obj = text.find('{');
    let arr = text.find('[');

    let (open, close) = match (obj, arr) {
        (Some(o), Some(a)) if a < o => (a, ']'),
        (Some(o), _) => (o, '}'),
        (None, Some(a)) => (a, ']'),
        (None, None) => return text,
    };

    match text.rfind(close) {
        Some(end) if end > open => &text[open..=end],
        _ => text,
    }
}

/// Scripted generator for tests.
///
/// Returns queued responses in order; the last response repeats once the
/// queue runs down to one entry. Counts calls so tests can assert that a
/// stage skipped the model entirely.
pub struct ScriptedGenerator {
    responses: std::sync::Mutex<Vec<Result<String, LlmError>>>,
    call_count: std::sync::Mutex<usize>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            call_count: std::sync::Mutex::new(0),
        }
    }

    /// Generator that always returns the same body
    pub fn always(body: impl Into<String>) -> Self {
        Self::new(vec![Ok(body.into())])
    }

    /// Generator that always fails with the given error
    pub fn always_error(error: LlmError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, LlmError> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(LlmError::Empty);
        }
        if responses.len() == 1 {
            responses[0].clone()
        } else {
            responses.remove(0)
        }
    }
}
