//! Web fallback search.
//!
//! Keyword search against a Tavily-style API, constrained to an educational
//! audience: the query is extended with grade and standards hints and
//! social-media domains are excluded. Results are formatted like retrieval
//! passages so downstream stages cannot tell the two sources apart.

use crate::config::WebSearchSection;
use async_trait::async_trait;
use scribe_common::collab::WebSearcher;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Domains never surfaced to a student-facing pipeline
const EXCLUDED_DOMAINS: &[&str] = &[
    "reddit.com",
    "quora.com",
    "twitter.com",
    "facebook.com",
    "tiktok.com",
];

/// Excerpt cap applied to each result's content
const EXCERPT_CHARS: usize = 500;

/// Web search client for the expansion fallback
pub struct HttpWebSearcher {
    config: WebSearchSection,
    http: reqwest::Client,
}

impl HttpWebSearcher {
    pub fn new(config: WebSearchSection) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, http })
    }

    /// Build the safety-constrained query string
    fn build_query(query: &str, grade_level: &str) -> String {
        format!(
            "{} grade {} writing standards site:.edu OR site:.org safe for kids education",
            query, grade_level
        )
    }
}

#[async_trait]
impl WebSearcher for HttpWebSearcher {
    async fn search(&self, query: &str, grade_level: &str) -> Vec<String> {
        let api_key = match &self.config.api_key {
            Some(key) => key.clone(),
            None => {
                warn!("Web search API key not configured, skipping fallback search");
                return Vec::new();
            }
        };

        let final_query = Self::build_query(query, grade_level);
        info!("Web fallback search: '{}'", final_query);

        let request_body = serde_json::json!({
            "api_key": api_key,
            "query": final_query,
            "search_depth": "advanced",
            "max_results": self.config.max_results,
            "exclude_domains": EXCLUDED_DOMAINS,
        });

        let response = match self.http.post(&self.config.endpoint).json(&request_body).send().await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!("Web search returned HTTP {}", r.status());
                return Vec::new();
            }
            Err(e) => {
                warn!("Web search failed: {}", e);
                return Vec::new();
            }
        };

        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("Web search response unreadable: {}", e);
                return Vec::new();
            }
        };

        let results: Vec<String> = body
            .get("results")
            .and_then(|r| r.as_array())
            .map(|rows| rows.iter().map(format_result).collect())
            .unwrap_or_default();

        info!("Web fallback retrieved {} results", results.len());

        results
    }
}

/// Format one search hit as `[title](url): excerpt`
fn format_result(row: &Value) -> String {
    let title = row.get("title").and_then(|v| v.as_str()).unwrap_or("Web Result");
    let url = row.get("url").and_then(|v| v.as_str()).unwrap_or("#");
    let content = row.get("content").and_then(|v| v.as_str()).unwrap_or("");

    let excerpt: String = content.chars().take(EXCERPT_CHARS).collect();

    format!("[{}]({}): {}", title, url, excerpt)
}
