//! Expectation extraction stage.
//!
//! Turns raw standard text into structured per-skill expectations. Failure
//! is non-fatal: a parse error or timeout degrades to a single low-specificity
//! `general` expectation so the rest of the pipeline can continue.

use crate::prompts;
use scribe_common::llm::{generate_structured, TextGenerator};
use scribe_common::types::{Expectation, SkillDomain, Stage};
use tracing::{debug, warn};

/// Prefix length for the fallback expectation text
const FALLBACK_PREFIX_CHARS: usize = 100;

/// Extract structured expectations from standards text.
pub async fn extract_expectations(
    generator: &dyn TextGenerator,
    standards_text: &str,
    grade_level: &str,
    stage: Stage,
) -> Vec<Expectation> {
    let prompt = prompts::build_extraction_prompt(standards_text, grade_level, stage);

    match generate_structured::<Vec<Expectation>>(generator, prompts::EXTRACTION_SYSTEM, &prompt)
        .await
    {
        Ok(expectations) => {
            debug!("Extracted {} expectations", expectations.len());
            expectations
        }
        Err(e) => {
            warn!("Expectation extraction failed: {} - using general fallback", e);
            vec![fallback_expectation(standards_text)]
        }
    }
}

/// Single low-specificity expectation used when extraction fails
fn fallback_expectation(standards_text: &str) -> Expectation {
    let prefix = prompts::truncate_chars(standards_text, FALLBACK_PREFIX_CHARS);
    Expectation {
        skill_domain: SkillDomain::General,
        expectation: format!("{}...", prefix),
        indicators: Vec::new(),
    }
}
