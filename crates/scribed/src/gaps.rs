//! Gap computation stage.
//!
//! Pure diff of expectations against evidence records. The `yes` gate is
//! strict: mastered skills never produce a gap. Every negative-example quote
//! is validated against the student's actual text before it can appear as
//! gap evidence; unverifiable quotes are dropped and the record's `missing`
//! summary stands in as a weak-evidence signal for the ranker.

use scribe_common::types::{EvidenceLevel, EvidenceRecord, Expectation, Gap, Severity, SkillDomain};
use std::collections::HashMap;

/// Quote prefix length checked against the student text
const QUOTE_CHECK_CHARS: usize = 25;

/// True when `quote` is verifiably drawn from `student_text`.
///
/// Case-insensitive, whitespace-collapsed, first 25 characters - tolerant of
/// trailing punctuation drift in model quotes but strict about invention.
pub fn quote_matches(quote: &str, student_text: &str) -> bool {
    if quote.trim().is_empty() || student_text.trim().is_empty() {
        return false;
    }

    let normalized_quote = normalize(quote);
    let normalized_student = normalize(student_text);

    let check_portion: String = normalized_quote.chars().take(QUOTE_CHECK_CHARS).collect();
    normalized_student.contains(&check_portion)
}

fn normalize(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compute candidate gaps from expectations and observed evidence.
///
/// Evidence records are keyed by skill domain, last write wins. Expectations
/// without a matching record are treated as undemonstrated.
pub fn compute_gaps(
    expectations: &[Expectation],
    evidence: &[EvidenceRecord],
    student_text: &str,
) -> Vec<Gap> {
    let mut evidence_map: HashMap<SkillDomain, &EvidenceRecord> = HashMap::new();
    for record in evidence {
        evidence_map.insert(record.skill_domain, record);
    }

    let empty = EvidenceRecord::default();
    let mut gaps = Vec::new();

    for expectation in expectations {
        let record = evidence_map
            .get(&expectation.skill_domain)
            .copied()
            .unwrap_or(&empty);

        if record.evidence_level == EvidenceLevel::Yes {
            continue;
        }

        let validated: Vec<&str> = if student_text.trim().is_empty() {
            record.negative_examples.iter().map(String::as_str).collect()
        } else {
            record
                .negative_examples
                .iter()
                .filter(|quote| quote_matches(quote, student_text))
                .map(String::as_str)
                .collect()
        };

        let evidence_str = if validated.is_empty() {
            if record.missing.is_empty() {
                "No specific errors cited".to_string()
            } else {
                record.missing.clone()
            }
        } else {
            validated.join(", ")
        };

        let description = if record.missing.is_empty() {
            expectation.expectation.clone()
        } else {
            record.missing.clone()
        };

        gaps.push(Gap {
            skill_domain: expectation.skill_domain,
            description,
            sol_reference: Some(expectation.expectation.clone()),
            evidence: Some(evidence_str),
            severity: Severity::Medium,
        });
    }

    gaps
}
