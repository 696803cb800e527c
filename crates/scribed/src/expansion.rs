//! Bounded context expansion.
//!
//! When the sufficiency check rejects the retrieved standards, expansion
//! widens the search in two tiers before giving up: first a synonym re-query
//! of the standards store with higher recall, then a filtered web search.
//! The grade filter never loosens; a wrong-grade standard is worse than none.
//!
//! The lifecycle is an explicit state machine with a pure transition
//! function so the retry bound can be tested without any I/O.

use scribe_common::collab::{StandardsRetriever, WebSearcher};
use scribe_common::types::{PipelineState, RagStatus, Stage, StandardReference};
use std::sync::Arc;
use tracing::{debug, info};

/// Where an expansion run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionState {
    /// No sufficiency check has run yet
    Idle,
    /// A sufficiency check is in flight
    Checking,
    /// Check failed, running expansion attempt `n` (0-based)
    Expanding(u8),
    /// Context accepted, analysis may proceed
    Sufficient,
    /// All attempts spent, proceed with whatever context exists
    Exhausted,
}

/// Result of a sufficiency check, as seen by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Failed,
    /// Caller supplied already-expanded context, skip re-validation
    PreExpanded,
}

/// Hard cap on expansion attempts
pub const MAX_ATTEMPTS: u8 = 2;

impl ExpansionState {
    /// Advance the state machine on a check outcome.
    pub fn next(self, outcome: CheckOutcome) -> ExpansionState {
        match (self, outcome) {
            (_, CheckOutcome::PreExpanded) => ExpansionState::Sufficient,
            (ExpansionState::Idle | ExpansionState::Checking, CheckOutcome::Passed) => {
                ExpansionState::Sufficient
            }
            (ExpansionState::Idle | ExpansionState::Checking, CheckOutcome::Failed) => {
                ExpansionState::Expanding(0)
            }
            (ExpansionState::Expanding(_), CheckOutcome::Passed) => ExpansionState::Sufficient,
            (ExpansionState::Expanding(n), CheckOutcome::Failed) => {
                if n + 1 >= MAX_ATTEMPTS {
                    ExpansionState::Exhausted
                } else {
                    ExpansionState::Expanding(n + 1)
                }
            }
            // Terminal states absorb further outcomes
            (terminal, _) => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExpansionState::Sufficient | ExpansionState::Exhausted)
    }
}

/// Stage synonyms used for the tier-one re-query.
fn stage_synonyms(stage: Stage) -> &'static str {
    match stage {
        Stage::Prewriting => "brainstorming, planning, outlining, organizing ideas",
        Stage::Drafting => "writing paragraphs, sentence structure, elaboration, drafting",
        Stage::Revising => "improving content, organization, clarity, flow, revision",
        Stage::Editing => "grammar, punctuation, capitalization, spelling, editing",
        Stage::Publishing => "presentation, formatting, sharing, publishing",
    }
}

/// Runs the tiered expansion strategy against the injected collaborators.
pub struct ExpansionController {
    retriever: Arc<dyn StandardsRetriever>,
    web: Arc<dyn WebSearcher>,
    expanded_match_count: usize,
}

impl ExpansionController {
    pub fn new(
        retriever: Arc<dyn StandardsRetriever>,
        web: Arc<dyn WebSearcher>,
        expanded_match_count: usize,
    ) -> Self {
        Self {
            retriever,
            web,
            expanded_match_count,
        }
    }

    /// Run expansion attempt `attempt` and return the newly found standards.
    ///
    /// Attempt 0 re-queries the standards store with stage synonyms and
    /// higher recall. Attempt 1 falls back to web search. Anything past the
    /// cap returns nothing; the caller is expected to stop asking.
    pub async fn expand(&self, attempt: u8, grade_level: &str, stage: Stage) -> Vec<StandardReference> {
        match attempt {
            0 => {
                let query = format!("{} skills grade {grade_level}", stage_synonyms(stage));
                info!(attempt, query = %query, "expanding context via synonym re-query");
                let results = self
                    .retriever
                    .retrieve(&query, grade_level, stage, self.expanded_match_count)
                    .await;
                pack(results, "expanded_db")
            }
            1 => {
                info!(attempt, "expanding context via web search fallback");
                let results = self.web.search(&stage.to_string(), grade_level).await;
                pack(results, "web_search")
            }
            _ => {
                debug!(attempt, "expansion attempts exhausted");
                Vec::new()
            }
        }
    }

    /// Drive one expansion step against the caller-owned session state.
    ///
    /// Spends one attempt: merges anything found into `retrieved_standards`
    /// and marks the context `Expanded` so the router re-runs the stage with
    /// the widened pool. Once the cap is spent the status is forced
    /// `Sufficient` and the caller proceeds with whatever context exists.
    pub async fn expand_state(&self, state: &mut PipelineState) {
        let attempt = state.retrieval_attempts;
        if attempt >= MAX_ATTEMPTS {
            info!(attempt, "max expansion attempts reached, forcing sufficient");
            state.rag_status = RagStatus::Sufficient;
            state.retrieval_attempts = attempt.saturating_add(1);
            return;
        }

        let found = self
            .expand(attempt, &state.grade_level, state.current_stage)
            .await;
        state.retrieved_standards.extend(found);
        state.rag_status = RagStatus::Expanded;
        state.retrieval_attempts = attempt + 1;
    }
}

fn pack(contents: Vec<String>, source: &str) -> Vec<StandardReference> {
    contents
        .into_iter()
        .map(|content| StandardReference {
            content,
            grade_band: None,
            skill: None,
            source: Some(source.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_common::collab::{FakeRetriever, FakeWebSearcher};

    #[test]
    fn test_pass_on_first_check() {
        let state = ExpansionState::Idle.next(CheckOutcome::Passed);
        assert_eq!(state, ExpansionState::Sufficient);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_two_failures_then_exhausted() {
        let mut state = ExpansionState::Idle;
        state = state.next(CheckOutcome::Failed);
        assert_eq!(state, ExpansionState::Expanding(0));
        state = state.next(CheckOutcome::Failed);
        assert_eq!(state, ExpansionState::Expanding(1));
        state = state.next(CheckOutcome::Failed);
        assert_eq!(state, ExpansionState::Exhausted);
    }

    #[test]
    fn test_recovery_mid_expansion() {
        let state = ExpansionState::Expanding(1).next(CheckOutcome::Passed);
        assert_eq!(state, ExpansionState::Sufficient);
    }

    #[test]
    fn test_pre_expanded_short_circuits() {
        assert_eq!(
            ExpansionState::Idle.next(CheckOutcome::PreExpanded),
            ExpansionState::Sufficient
        );
    }

    #[test]
    fn test_terminal_states_absorb() {
        assert_eq!(
            ExpansionState::Exhausted.next(CheckOutcome::Failed),
            ExpansionState::Exhausted
        );
        assert_eq!(
            ExpansionState::Sufficient.next(CheckOutcome::Failed),
            ExpansionState::Sufficient
        );
    }

    #[tokio::test]
    async fn test_attempt_zero_uses_synonym_query() {
        let retriever = Arc::new(FakeRetriever::new(vec![vec![
            "4.7 Write complete sentences".to_string(),
        ]]));
        let web = Arc::new(FakeWebSearcher::new(vec![]));
        let controller = ExpansionController::new(retriever.clone(), web.clone(), 8);

        let standards = controller.expand(0, "4", Stage::Editing).await;
        assert_eq!(standards.len(), 1);
        assert_eq!(standards[0].source.as_deref(), Some("expanded_db"));

        let queries = retriever.queries();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("grammar, punctuation"));
        assert!(queries[0].contains("grade 4"));
        assert_eq!(web.call_count(), 0);
    }

    #[tokio::test]
    async fn test_attempt_one_falls_back_to_web() {
        let retriever = Arc::new(FakeRetriever::new(vec![]));
        let web = Arc::new(FakeWebSearcher::new(vec![
            "[VDOE](https://doe.virginia.gov): grade 4 editing standards".to_string(),
        ]));
        let controller = ExpansionController::new(retriever.clone(), web.clone(), 8);

        let standards = controller.expand(1, "4", Stage::Editing).await;
        assert_eq!(standards.len(), 1);
        assert_eq!(standards[0].source.as_deref(), Some("web_search"));
        assert_eq!(retriever.call_count(), 0);
        assert_eq!(web.call_count(), 1);
    }

    #[tokio::test]
    async fn test_expand_state_merges_and_counts() {
        let retriever = Arc::new(FakeRetriever::always(vec![
            "4.7 expanded standard".to_string(),
        ]));
        let web = Arc::new(FakeWebSearcher::empty());
        let controller = ExpansionController::new(retriever, web, 8);

        let mut state = PipelineState::new("s1", "4", Stage::Editing);
        state.rag_status = RagStatus::Insufficient;
        state
            .retrieved_standards
            .push(StandardReference::from_content("4.1 original standard"));

        controller.expand_state(&mut state).await;

        assert_eq!(state.retrieval_attempts, 1);
        assert_eq!(state.rag_status, RagStatus::Expanded);
        assert_eq!(state.retrieved_standards.len(), 2);
        assert_eq!(state.retrieved_standards[1].content, "4.7 expanded standard");
    }

    #[tokio::test]
    async fn test_session_walk_ends_forced_sufficient() {
        use crate::router::{self, RouteDecision};
        use scribe_common::types::Gap;

        let retriever = Arc::new(FakeRetriever::empty());
        let web = Arc::new(FakeWebSearcher::empty());
        let controller = ExpansionController::new(retriever, web, 8);

        let mut state = PipelineState::new("s1", "3", Stage::Drafting);
        state.apply_analysis_outcome(&[Gap::insufficient_context("wrong grade")]);

        // Two real expansion rounds, each re-flagged insufficient
        for expected_attempts in [1, 2] {
            assert_eq!(router::route(&state), RouteDecision::ExpandContext);
            controller.expand_state(&mut state).await;
            assert_eq!(state.retrieval_attempts, expected_attempts);
            assert_eq!(state.rag_status, RagStatus::Expanded);
            state.apply_analysis_outcome(&[Gap::insufficient_context("still wrong")]);
        }

        // Third round: the cap forces sufficient and routing resumes the stage
        assert_eq!(router::route(&state), RouteDecision::ExpandContext);
        controller.expand_state(&mut state).await;
        assert_eq!(state.rag_status, RagStatus::Sufficient);
        assert_eq!(router::route(&state), RouteDecision::RunStage(Stage::Drafting));
    }

    #[tokio::test]
    async fn test_past_cap_returns_nothing() {
        let retriever = Arc::new(FakeRetriever::new(vec![vec!["x".to_string()]]));
        let web = Arc::new(FakeWebSearcher::new(vec!["y".to_string()]));
        let controller = ExpansionController::new(retriever.clone(), web.clone(), 8);

        assert!(controller.expand(2, "4", Stage::Drafting).await.is_empty());
        assert_eq!(retriever.call_count(), 0);
        assert_eq!(web.call_count(), 0);
    }
}
