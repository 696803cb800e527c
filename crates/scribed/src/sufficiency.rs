//! Context sufficiency check.
//!
//! Fast gate run before expectation extraction: does the retrieved standards
//! text actually cover what this stage teaches at this grade? The check fails
//! open. A broken validator must never block analysis of context that might
//! well be fine.

use scribe_common::llm::{generate_structured, TextGenerator};
use scribe_common::types::{Stage, SufficiencyVerdict};
use tracing::{debug, warn};

use crate::prompts;

/// Judge whether `standards_text` is sufficient for the given grade and stage.
pub async fn check_sufficiency(
    generator: &dyn TextGenerator,
    standards_text: &str,
    grade_level: &str,
    stage: Stage,
) -> SufficiencyVerdict {
    if standards_text.trim().is_empty() {
        return SufficiencyVerdict {
            sufficient: false,
            reason: "No standards retrieved".to_string(),
            missing_elements: format!("{stage} standards for grade {grade_level}"),
        };
    }

    let prompt = prompts::build_sufficiency_prompt(standards_text, grade_level, stage);

    match generate_structured::<SufficiencyVerdict>(generator, prompts::SUFFICIENCY_SYSTEM, &prompt)
        .await
    {
        Ok(verdict) => {
            debug!(
                sufficient = verdict.sufficient,
                reason = %verdict.reason,
                "sufficiency check complete"
            );
            verdict
        }
        Err(e) => {
            warn!("sufficiency check failed, treating context as sufficient: {e}");
            SufficiencyVerdict::fail_open(format!("validation error: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_common::llm::{LlmError, ScriptedGenerator};

    #[tokio::test]
    async fn test_empty_standards_insufficient_without_model() {
        let llm = ScriptedGenerator::always_error(LlmError::Empty);
        let verdict = check_sufficiency(&llm, "   ", "4", Stage::Editing).await;
        assert!(!verdict.sufficient);
        assert_eq!(llm.call_count(), 0);
        assert!(!verdict.missing_elements.is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_verdict_passes_through() {
        let llm = ScriptedGenerator::always(
            r#"{"sufficient": false, "reason": "covers reading, not writing",
                "missing_elements": "conventions standards"}"#,
        );
        let verdict = check_sufficiency(&llm, "reading fluency standards", "4", Stage::Editing).await;
        assert!(!verdict.sufficient);
        assert_eq!(verdict.missing_elements, "conventions standards");
    }

    #[tokio::test]
    async fn test_sufficient_verdict_passes_through() {
        let llm = ScriptedGenerator::always(r#"{"sufficient": true, "reason": "on topic"}"#);
        let verdict =
            check_sufficiency(&llm, "grade 4 grammar and punctuation", "4", Stage::Editing).await;
        assert!(verdict.sufficient);
    }

    #[tokio::test]
    async fn test_model_failure_fails_open() {
        let llm = ScriptedGenerator::always_error(LlmError::Timeout(30));
        let verdict = check_sufficiency(&llm, "some standards", "4", Stage::Drafting).await;
        assert!(verdict.sufficient);
        assert!(verdict.reason.contains("validation error"));
    }

    #[tokio::test]
    async fn test_garbage_output_fails_open() {
        let llm = ScriptedGenerator::always("I am not sure about this one.");
        let verdict = check_sufficiency(&llm, "some standards", "4", Stage::Drafting).await;
        assert!(verdict.sufficient);
    }
}
