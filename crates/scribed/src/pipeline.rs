//! The instructional gap pipeline.
//!
//! Sequential chain: retrieval, sufficiency check with bounded expansion,
//! expectation extraction, evidence analysis, gap computation, ranking,
//! deduplication. Every model-backed stage recovers locally with its own
//! conservative fallback; the only hard error at this boundary is malformed
//! caller input. Callers must check for the `SYSTEM/INSUFFICIENT_CONTEXT`
//! sentinel before treating the gap list as real coaching content.

use anyhow::{bail, Result};
use scribe_common::collab::{StandardsRetriever, WebSearcher};
use scribe_common::llm::TextGenerator;
use scribe_common::types::{Gap, Stage, StandardReference};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PipelineSection;
use crate::expansion::{CheckOutcome, ExpansionController, ExpansionState};
use crate::session::SessionLocks;
use crate::{dedup, evidence, expectations, gaps, prompts, ranking, sufficiency};

pub struct GapPipeline {
    generator: Arc<dyn TextGenerator>,
    retriever: Arc<dyn StandardsRetriever>,
    expansion: ExpansionController,
    config: PipelineSection,
    sessions: SessionLocks,
}

impl GapPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        retriever: Arc<dyn StandardsRetriever>,
        web: Arc<dyn WebSearcher>,
        config: PipelineSection,
    ) -> Self {
        let expansion =
            ExpansionController::new(retriever.clone(), web, config.expanded_match_count);
        Self {
            generator,
            retriever,
            expansion,
            config,
            sessions: SessionLocks::new(),
        }
    }

    /// Run the pipeline under a session's lock. No two computations for the
    /// same learner interleave; different learners never wait on each other.
    pub async fn compute_for_session(
        &self,
        session_id: &str,
        student_text: &str,
        grade_level: &str,
        stage: Stage,
        pre_retrieved: Option<Vec<String>>,
    ) -> Result<(Vec<Gap>, Vec<StandardReference>)> {
        let lock = self.sessions.lock_for(session_id);
        let _guard = lock.lock().await;
        self.compute_instructional_gaps(student_text, grade_level, stage, pre_retrieved)
            .await
    }

    /// Complete gap computation for one piece of writing.
    ///
    /// `pre_retrieved` standards (from a prior expansion round trip) are
    /// trusted as-is; the sufficiency check only runs on fresh retrievals.
    /// Returns ranked, deduplicated gaps plus the standards they reference.
    pub async fn compute_instructional_gaps(
        &self,
        student_text: &str,
        grade_level: &str,
        stage: Stage,
        pre_retrieved: Option<Vec<String>>,
    ) -> Result<(Vec<Gap>, Vec<StandardReference>)> {
        if grade_level.trim().is_empty() {
            bail!("grade level must not be empty");
        }

        info!(%stage, grade_level, "starting gap analysis");

        let pre_provided = pre_retrieved.as_ref().is_some_and(|s| !s.is_empty());

        let mut standards: Vec<StandardReference> = match pre_retrieved {
            Some(provided) if !provided.is_empty() => provided
                .into_iter()
                .map(StandardReference::from_content)
                .collect(),
            _ => {
                let query = format!("{stage} writing skills grade {grade_level}");
                self.retriever
                    .retrieve(&query, grade_level, stage, self.config.match_count)
                    .await
                    .into_iter()
                    .map(StandardReference::from_content)
                    .collect()
            }
        };

        if standards.is_empty() {
            debug!("no standards retrieved, nothing to analyze");
            return Ok((Vec::new(), Vec::new()));
        }

        // Sufficiency gate with bounded expansion
        let mut state = if pre_provided {
            ExpansionState::Idle.next(CheckOutcome::PreExpanded)
        } else {
            ExpansionState::Idle
        };
        let mut last_reason = String::new();
        let mut expansion_found_any = false;

        while !state.is_terminal() {
            let standards_text = joined_contents(&standards);
            let capped = prompts::truncate_chars(&standards_text, self.config.standards_text_cap);
            let verdict =
                sufficiency::check_sufficiency(self.generator.as_ref(), capped, grade_level, stage)
                    .await;

            let outcome = if verdict.sufficient {
                CheckOutcome::Passed
            } else {
                last_reason = verdict.reason;
                CheckOutcome::Failed
            };

            state = state.next(outcome);
            if let ExpansionState::Expanding(attempt) = state {
                let found = self.expansion.expand(attempt, grade_level, stage).await;
                if !found.is_empty() {
                    expansion_found_any = true;
                    standards.extend(found);
                }
            }
        }

        if state == ExpansionState::Exhausted && !expansion_found_any {
            info!(reason = %last_reason, "context exhausted without usable standards");
            return Ok((vec![Gap::insufficient_context(last_reason)], Vec::new()));
        }

        let standards_text = joined_contents(&standards);

        let expectations =
            expectations::extract_expectations(self.generator.as_ref(), &standards_text, grade_level, stage)
                .await;

        let capped_text = prompts::truncate_chars(student_text, self.config.student_text_cap);
        let evidence =
            evidence::analyze_evidence(self.generator.as_ref(), capped_text, grade_level, &expectations)
                .await;

        // Validation runs against the full text: a quote past the prompt cap
        // is still a real quote.
        let raw_gaps = gaps::compute_gaps(&expectations, &evidence, student_text);

        let ranked =
            ranking::rank_gaps(self.generator.as_ref(), raw_gaps, grade_level, stage).await;

        let gaps = dedup::dedup_gaps(ranked);
        let standards = dedup::dedup_standards(standards);

        info!(gap_count = gaps.len(), standard_count = standards.len(), "gap analysis complete");
        Ok((gaps, standards))
    }

    /// Forget a session's lock once its run ends.
    pub fn end_session(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}

fn joined_contents(standards: &[StandardReference]) -> String {
    standards
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
