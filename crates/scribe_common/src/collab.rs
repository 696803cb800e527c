//! Collaborator interfaces for standards retrieval and web fallback search.
//!
//! Both collaborators degrade to empty result lists instead of raising;
//! the expansion controller treats "nothing came back" as an insufficiency
//! signal, never as a fault.

use crate::types::Stage;
use async_trait::async_trait;

/// Semantic search over a standards corpus.
#[async_trait]
pub trait StandardsRetriever: Send + Sync {
    /// Retrieve up to `match_count` standard passages for a query,
    /// filtered by grade. Returns an empty list when nothing matches or
    /// the backend is unavailable.
    async fn retrieve(
        &self,
        query: &str,
        grade_level: &str,
        stage: Stage,
        match_count: usize,
    ) -> Vec<String>;
}

/// Keyword web search restricted to trusted educational domains.
///
/// Results are formatted like retrieval passages: `"[title](url): excerpt"`.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str, grade_level: &str) -> Vec<String>;
}

/// Vec-backed retriever for tests; records the queries it was asked.
#[derive(Default)]
pub struct FakeRetriever {
    /// Result batches returned in order; the last batch repeats.
    batches: std::sync::Mutex<Vec<Vec<String>>>,
    queries: std::sync::Mutex<Vec<String>>,
}

impl FakeRetriever {
    pub fn new(batches: Vec<Vec<String>>) -> Self {
        Self {
            batches: std::sync::Mutex::new(batches),
            queries: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Retriever that always returns the same passages
    pub fn always(passages: Vec<String>) -> Self {
        Self::new(vec![passages])
    }

    /// Retriever that never finds anything
    pub fn empty() -> Self {
        Self::new(vec![vec![]])
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl StandardsRetriever for FakeRetriever {
    async fn retrieve(
        &self,
        query: &str,
        _grade_level: &str,
        _stage: Stage,
        _match_count: usize,
    ) -> Vec<String> {
        self.queries.lock().unwrap().push(query.to_string());

        let mut batches = self.batches.lock().unwrap();
        if batches.is_empty() {
            return Vec::new();
        }
        if batches.len() == 1 {
            batches[0].clone()
        } else {
            batches.remove(0)
        }
    }
}

/// Vec-backed web searcher for tests.
#[derive(Default)]
pub struct FakeWebSearcher {
    results: Vec<String>,
    queries: std::sync::Mutex<Vec<String>>,
}

impl FakeWebSearcher {
    pub fn new(results: Vec<String>) -> Self {
        Self {
            results,
            queries: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl WebSearcher for FakeWebSearcher {
    async fn search(&self, query: &str, _grade_level: &str) -> Vec<String> {
        self.queries.lock().unwrap().push(query.to_string());
        self.results.clone()
    }
}
