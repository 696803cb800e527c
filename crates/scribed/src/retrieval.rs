//! HTTP standards retriever.
//!
//! Posts to a pgvector-style RPC (`match_sol_standards`) with a similarity
//! threshold and a grade metadata filter. Backend trouble degrades to an
//! empty result list; the expansion controller decides what that means.

use crate::config::RetrievalSection;
use async_trait::async_trait;
use scribe_common::collab::StandardsRetriever;
use scribe_common::types::Stage;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Standards search client against a vector-store RPC endpoint
pub struct HttpStandardsRetriever {
    config: RetrievalSection,
    http: reqwest::Client,
}

impl HttpStandardsRetriever {
    pub fn new(config: RetrievalSection) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, http })
    }
}

#[async_trait]
impl StandardsRetriever for HttpStandardsRetriever {
    async fn retrieve(
        &self,
        query: &str,
        grade_level: &str,
        stage: Stage,
        match_count: usize,
    ) -> Vec<String> {
        let url = format!("{}/rpc/{}", self.config.endpoint, self.config.rpc_function);

        let request_body = serde_json::json!({
            "query": query,
            "match_threshold": self.config.match_threshold,
            "match_count": match_count,
            "filter_metadata": {"grade": grade_level},
        });

        let mut request = self.http.post(&url).json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = match request.send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!("Standards retrieval returned HTTP {}", r.status());
                return Vec::new();
            }
            Err(e) => {
                warn!("Standards retrieval failed: {}", e);
                return Vec::new();
            }
        };

        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("Standards retrieval response unreadable: {}", e);
                return Vec::new();
            }
        };

        let passages: Vec<String> = body
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.get("content").and_then(|c| c.as_str()))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        info!(
            "Retrieved {} standards for '{}' (grade {}, stage {})",
            passages.len(),
            query,
            grade_level,
            stage
        );

        passages
    }
}
