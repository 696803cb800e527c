//! Configuration for the scribe pipeline daemon.
//!
//! Loads settings from the user config directory (`scribe/config.toml`) or
//! falls back to defaults. API keys can be supplied through the environment
//! so they never need to live in the file.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Environment variable overriding the LLM API key
pub const ENV_LLM_API_KEY: &str = "SCRIBE_LLM_API_KEY";

/// Environment variable overriding the web search API key
pub const ENV_SEARCH_API_KEY: &str = "SCRIBE_SEARCH_API_KEY";

/// LLM backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmSection {
    pub fn to_llm_config(&self) -> scribe_common::llm::LlmConfig {
        scribe_common::llm::LlmConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Standards retrieval backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSection {
    /// Base URL of the standards search service
    #[serde(default = "default_retrieval_endpoint")]
    pub endpoint: String,

    /// RPC function name exposed by the vector store
    #[serde(default = "default_rpc_function")]
    pub rpc_function: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Minimum similarity for a passage to count as a match
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    #[serde(default = "default_retrieval_timeout")]
    pub timeout_secs: u64,
}

fn default_retrieval_endpoint() -> String {
    "http://localhost:8000".to_string()
}

fn default_rpc_function() -> String {
    "match_sol_standards".to_string()
}

fn default_match_threshold() -> f64 {
    0.5
}

fn default_retrieval_timeout() -> u64 {
    10
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            endpoint: default_retrieval_endpoint(),
            rpc_function: default_rpc_function(),
            api_key: None,
            match_threshold: default_match_threshold(),
            timeout_secs: default_retrieval_timeout(),
        }
    }
}

/// Web fallback search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchSection {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_search_max_results")]
    pub max_results: usize,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_search_max_results() -> usize {
    5
}

fn default_search_timeout() -> u64 {
    10
}

impl Default for WebSearchSection {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key: None,
            max_results: default_search_max_results(),
            timeout_secs: default_search_timeout(),
        }
    }
}

/// Pipeline behavior knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Student text is truncated to this many chars before analysis
    #[serde(default = "default_student_text_cap")]
    pub student_text_cap: usize,

    /// Concatenated standards text cap for the sufficiency check
    #[serde(default = "default_standards_text_cap")]
    pub standards_text_cap: usize,

    /// Result count for the initial retrieval
    #[serde(default = "default_match_count")]
    pub match_count: usize,

    /// Result count for the recall-oriented synonym re-query
    #[serde(default = "default_expanded_match_count")]
    pub expanded_match_count: usize,
}

fn default_student_text_cap() -> usize {
    2_000
}

fn default_standards_text_cap() -> usize {
    4_000
}

fn default_match_count() -> usize {
    5
}

fn default_expanded_match_count() -> usize {
    8
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            student_text_cap: default_student_text_cap(),
            standards_text_cap: default_standards_text_cap(),
            match_count: default_match_count(),
            expanded_match_count: default_expanded_match_count(),
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoachConfig {
    #[serde(default)]
    pub llm: LlmSection,

    #[serde(default)]
    pub retrieval: RetrievalSection,

    #[serde(default)]
    pub web_search: WebSearchSection,

    #[serde(default)]
    pub pipeline: PipelineSection,
}

impl CoachConfig {
    /// Load from the default config path, falling back to defaults.
    pub fn load() -> Self {
        let path = Self::config_path();
        let mut config = Self::load_from(&path);
        config.apply_env_overrides();
        config
    }

    /// Default config file location
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("scribe")
            .join("config.toml")
    }

    /// Load from a specific path; missing or malformed files fall back to
    /// defaults with a warning rather than failing startup.
    pub fn load_from(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<CoachConfig>(&contents) {
                Ok(config) => {
                    info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {:?}: {} - using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Apply API key overrides from the environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(ENV_LLM_API_KEY) {
            if !key.is_empty() {
                self.llm.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var(ENV_SEARCH_API_KEY) {
            if !key.is_empty() {
                self.web_search.api_key = Some(key);
            }
        }
    }

    /// Save current config (used to write an initial file for editing)
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
