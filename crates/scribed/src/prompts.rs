//! Prompt building for the model-backed pipeline stages.
//!
//! The quote-literalness rules are load-bearing: the frontend highlights
//! negative-example quotes verbatim in the student's text, so the evidence
//! prompt must forbid paraphrased or invented quotes outright. Inputs are
//! capped before they reach a builder; the helpers here only assemble text.

use scribe_common::types::{Expectation, Gap, Stage};

pub const EXTRACTION_SYSTEM: &str =
    "You are an educational standards analyst. Return only valid JSON.";

pub const EVIDENCE_SYSTEM: &str =
    "You are an educational writing analyst. Return only valid JSON.";

pub const RANKING_SYSTEM: &str = "You are an educational coach. Return only valid JSON.";

pub const SUFFICIENCY_SYSTEM: &str =
    "You are a strict data validation assistant. Return only valid JSON.";

/// Topical focus of each writing stage, used by the sufficiency check.
pub fn stage_topics(stage: Stage) -> &'static str {
    match stage {
        Stage::Prewriting => "Ideas, planning, brainstorming",
        Stage::Drafting => "Writing sentences, structure, elaboration",
        Stage::Revising => "Content, organization, voice, improvements",
        Stage::Editing => "Grammar, punctuation, spelling (conventions)",
        Stage::Publishing => "Presentation, sharing",
    }
}

/// Truncate to a character budget without splitting a code point.
pub fn truncate_chars(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Expectation extraction prompt (standards text -> per-skill expectations)
pub fn build_extraction_prompt(standards_text: &str, grade_level: &str, stage: Stage) -> String {
    format!(
        r#"Given the following curriculum standards for Grade {grade_level} students in the {stage} stage of writing, extract the specific skill expectations.

Standards:
{standards_text}

For each standard, identify:
1. The skill domain (one of: ideas, organization, voice, word_choice, sentence_fluency, conventions, focus, elaboration)
2. What the student should be able to do at this grade level
3. Observable indicators of mastery

Return a JSON array of expectations:
[
  {{
    "skill_domain": "...",
    "expectation": "What the student should do",
    "indicators": ["Observable sign 1", "Observable sign 2"]
  }}
]

Only return the JSON array, no other text."#
    )
}

/// Evidence analysis prompt (student text + expectations -> evidence records)
pub fn build_evidence_prompt(
    student_text: &str,
    grade_level: &str,
    expectations: &[Expectation],
) -> String {
    let expectations_json =
        serde_json::to_string_pretty(expectations).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Analyze this Grade {grade_level} student's writing for evidence of the following skills.

Student's Writing:
{student_text}

Skills to Look For:
{expectations_json}

INSTRUCTIONS:
For each skill, look for ANY evidence.
- Descriptive adjectives or character traits count as evidence for elaboration and word choice.
- Do NOT require perfect mastery. One good detail earns "yes" or "partially".
- Only mark "no" if the skill is completely absent.

RULES FOR CONVENTIONS (spelling/grammar):
- Never flag correct text as an error. Common words and proper nouns are not misspellings.
- Only mark 'partially' or 'no' when there are clear, objective errors.
- If in doubt about a spelling, assume it is correct.

RULES FOR ORGANIZATION (transitions):
- Transitions include phrases like "Of course", "In addition", "Later that day", not just single words.
- If the student connects ideas with such phrases, mark organization or sentence fluency "yes" or "partially".
- Do not flag "lack of transitions" when these conversational bridges are present.

RULES FOR QUOTES (strictly enforced):
- Every positive_example and negative_example MUST be a word-for-word substring of the student's writing above.
- Copy the text exactly. Do not fix spelling or punctuation inside a quote.
- For an omission, quote the word before the missing element.
- NEVER write analysis language ("The student uses...") as if it were a quote.
- If you cannot find exact text to quote, use an empty array [].

Return a JSON array:
[
  {{
    "skill_domain": "...",
    "evidence_level": "yes|partially|no",
    "positive_examples": ["exact quote showing the skill"],
    "negative_examples": ["exact quote showing the error"],
    "missing": "What needs improvement"
  }}
]

Only return the JSON array, no other text."#
    )
}

/// Gap ranking prompt (candidate gaps -> prioritized gaps with severity)
pub fn build_ranking_prompt(gaps: &[Gap], grade_level: &str, stage: Stage) -> String {
    let gaps_json = serde_json::to_string_pretty(gaps).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are prioritizing learning gaps for a Grade {grade_level} student in the {stage} stage of writing.

Identified Gaps:
{gaps_json}

Rank these gaps from most to least important to address NOW, considering:
1. What is most developmentally appropriate for this grade
2. What will have the biggest impact on the writing (ideas/organization usually outrank conventions)
3. What is most relevant to the {stage} stage
4. DEPRIORITIZE gaps with weak evidence (no validated quote, or only 1-2 minor instances)
5. DEPRIORITIZE "transitions" gaps when the student already uses natural connective phrases, unless the writing is markedly choppy

Return a JSON array of the gaps in priority order (highest first), with severity added:
[
  {{
    "skill_domain": "...",
    "description": "What they need to work on",
    "sol_reference": "The expectation they're not meeting",
    "severity": "high|medium|low",
    "evidence": "What was observed"
  }}
]

Only return the JSON array, no other text."#
    )
}

/// Sufficiency check prompt (retrieved standards -> verdict)
pub fn build_sufficiency_prompt(standards_text: &str, grade_level: &str, stage: Stage) -> String {
    let topics = stage_topics(stage);

    format!(
        r#"Determine if the retrieved curriculum standards are SUFFICIENT and RELEVANT for the current task.

Task Context:
- Grade Level: {grade_level}
- Writing Stage: {stage} ({topics})

Retrieved Standards:
{standards_text}

Constraints:
1. Grade Level Match: the standards MUST strictly match Grade {grade_level}.
2. Stage Relevance: the standards MUST be relevant to the '{stage}' stage topics listed above.

Return a JSON object:
{{
  "sufficient": true|false,
  "reason": "Brief explanation",
  "missing_elements": "What is missing (e.g. 'Grade {grade_level} standards missing')"
}}

Only return the JSON object."#
    )
}
