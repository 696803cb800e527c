//! Evidence analysis stage.
//!
//! Scans the student's text for evidence of each expectation. Two fallback
//! modes, deliberately different: blank text means "no evidence anywhere"
//! (all `no`, no model call), while a parse failure means "could not judge"
//! (all `partially` with empty example lists) so false negatives never reach
//! the student.

use crate::prompts;
use scribe_common::llm::{generate_structured, TextGenerator};
use scribe_common::types::{EvidenceLevel, EvidenceRecord, Expectation};
use tracing::{debug, warn};

/// Analyze the student's writing for evidence of each expectation.
///
/// `student_text` must already be capped by the caller's pipeline config.
pub async fn analyze_evidence(
    generator: &dyn TextGenerator,
    student_text: &str,
    grade_level: &str,
    expectations: &[Expectation],
) -> Vec<EvidenceRecord> {
    if student_text.trim().is_empty() {
        // No text means no evidence, never "unable to analyze"
        debug!("Blank student text - synthesizing all-no evidence records");
        return expectations.iter().map(no_evidence_record).collect();
    }

    let prompt = prompts::build_evidence_prompt(student_text, grade_level, expectations);

    match generate_structured::<Vec<EvidenceRecord>>(generator, prompts::EVIDENCE_SYSTEM, &prompt)
        .await
    {
        Ok(records) => {
            debug!("Evidence analysis produced {} records", records.len());
            records
        }
        Err(e) => {
            warn!("Evidence analysis failed: {} - using conservative fallback", e);
            expectations.iter().map(unable_to_analyze_record).collect()
        }
    }
}

/// Blank-text record: the skill is simply not demonstrated
fn no_evidence_record(expectation: &Expectation) -> EvidenceRecord {
    EvidenceRecord {
        skill_domain: expectation.skill_domain,
        evidence_level: EvidenceLevel::No,
        positive_examples: Vec::new(),
        negative_examples: Vec::new(),
        missing: if expectation.expectation.is_empty() {
            "No writing provided".to_string()
        } else {
            expectation.expectation.clone()
        },
    }
}

/// Parse-failure record: conservative `partially` with no quotes
fn unable_to_analyze_record(expectation: &Expectation) -> EvidenceRecord {
    EvidenceRecord {
        skill_domain: expectation.skill_domain,
        evidence_level: EvidenceLevel::Partially,
        positive_examples: Vec::new(),
        negative_examples: Vec::new(),
        missing: "Unable to analyze".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_common::llm::ScriptedGenerator;
    use scribe_common::types::SkillDomain;

    fn expectations() -> Vec<Expectation> {
        vec![
            Expectation {
                skill_domain: SkillDomain::Ideas,
                expectation: "Develop a central idea".to_string(),
                indicators: vec![],
            },
            Expectation {
                skill_domain: SkillDomain::Conventions,
                expectation: "Use correct spelling".to_string(),
                indicators: vec![],
            },
        ]
    }

    #[tokio::test]
    async fn test_blank_text_skips_model_and_yields_all_no() {
        let generator = ScriptedGenerator::always("[]");

        let records = analyze_evidence(&generator, "   \n ", "3", &expectations()).await;

        assert_eq!(generator.call_count(), 0);
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.evidence_level, EvidenceLevel::No);
            assert!(record.negative_examples.is_empty());
        }
        assert_eq!(records[0].missing, "Develop a central idea");
    }

    #[tokio::test]
    async fn test_parses_model_records() {
        let generator = ScriptedGenerator::always(
            r#"[{"skill_domain": "ideas", "evidence_level": "yes", "positive_examples": ["The big red barn"], "negative_examples": [], "missing": ""}]"#,
        );

        let records = analyze_evidence(&generator, "The big red barn.", "3", &expectations()).await;

        assert_eq!(generator.call_count(), 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].evidence_level, EvidenceLevel::Yes);
        assert_eq!(records[0].positive_examples[0], "The big red barn");
    }

    #[tokio::test]
    async fn test_parse_failure_is_conservative_partially() {
        let generator = ScriptedGenerator::always("I looked at the writing and it seems fine");

        let records = analyze_evidence(&generator, "Some writing.", "3", &expectations()).await;

        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.evidence_level, EvidenceLevel::Partially);
            assert!(record.positive_examples.is_empty());
            assert!(record.negative_examples.is_empty());
            assert_eq!(record.missing, "Unable to analyze");
        }
    }
}
