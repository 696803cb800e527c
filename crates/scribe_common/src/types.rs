//! Core vocabulary for the instructional gap pipeline.
//!
//! Typed records shared between the pipeline stages and their callers.
//! Skill domains, evidence levels and severities are closed enums so that
//! model output is coerced into a known vocabulary instead of carrying free
//! strings through the pipeline.

use serde::{Deserialize, Serialize};

/// Description used by the sentinel gap when retrieval context is unusable.
pub const INSUFFICIENT_CONTEXT: &str = "INSUFFICIENT_CONTEXT";

/// Writing skill domains the pipeline can flag.
///
/// Unknown strings from model output deserialize to `General` rather than
/// failing the whole stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillDomain {
    /// Generating and developing ideas
    Ideas,
    /// Structure and flow
    Organization,
    /// Author's voice and audience awareness
    Voice,
    /// Vocabulary and language use
    WordChoice,
    /// Sentence variety and flow
    SentenceFluency,
    /// Grammar, spelling, punctuation
    Conventions,
    /// Staying on topic
    Focus,
    /// Adding details and examples
    Elaboration,
    /// Reserved for pipeline-level signals, never produced by analysis
    #[serde(rename = "SYSTEM")]
    System,
    /// Catch-all when the model names a domain outside the closed set
    #[serde(other)]
    General,
}

impl Default for SkillDomain {
    fn default() -> Self {
        Self::General
    }
}

impl std::fmt::Display for SkillDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ideas => "ideas",
            Self::Organization => "organization",
            Self::Voice => "voice",
            Self::WordChoice => "word_choice",
            Self::SentenceFluency => "sentence_fluency",
            Self::Conventions => "conventions",
            Self::Focus => "focus",
            Self::Elaboration => "elaboration",
            Self::System => "SYSTEM",
            Self::General => "general",
        };
        write!(f, "{}", s)
    }
}

/// Categorical judgment of whether a skill is demonstrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceLevel {
    Yes,
    Partially,
    No,
}

impl Default for EvidenceLevel {
    fn default() -> Self {
        Self::No
    }
}

/// Gap priority assigned during ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Default for Severity {
    fn default() -> Self {
        Self::Medium
    }
}

/// Writing process stage driving retrieval queries and ranking context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Prewriting,
    Drafting,
    Revising,
    Editing,
    Publishing,
}

impl Stage {
    /// Parse from string (lenient, for caller input)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "prewriting" => Some(Self::Prewriting),
            "drafting" => Some(Self::Drafting),
            "revising" => Some(Self::Revising),
            "editing" => Some(Self::Editing),
            "publishing" => Some(Self::Publishing),
            _ => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Prewriting => "prewriting",
            Self::Drafting => "drafting",
            Self::Revising => "revising",
            Self::Editing => "editing",
            Self::Publishing => "publishing",
        };
        write!(f, "{}", s)
    }
}

/// Retrieval sufficiency status carried in the caller-owned state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RagStatus {
    Pending,
    Sufficient,
    Insufficient,
    Expanded,
}

impl Default for RagStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// A retrieved curriculum standard passage.
///
/// Immutable once retrieved; identity for deduplication is the exact
/// `content` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardReference {
    /// The standard text content
    pub content: String,
    /// Grade band tag, e.g. "K1", "2_3", "4_6"
    #[serde(default)]
    pub grade_band: Option<String>,
    /// Skill area tag
    #[serde(default)]
    pub skill: Option<String>,
    /// Source document or backend name
    #[serde(default)]
    pub source: Option<String>,
}

impl StandardReference {
    /// Wrap a plain retrieved passage with no metadata
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            grade_band: None,
            skill: None,
            source: None,
        }
    }
}

/// A per-skill expectation extracted from standard text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(default)]
    pub skill_domain: SkillDomain,
    /// What the student should be able to do at this grade level
    #[serde(default)]
    pub expectation: String,
    /// Observable indicators of mastery
    #[serde(default)]
    pub indicators: Vec<String>,
}

/// Evidence observed for one skill domain in a single analysis pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceRecord {
    #[serde(default)]
    pub skill_domain: SkillDomain,
    #[serde(default)]
    pub evidence_level: EvidenceLevel,
    /// Quotes showing the skill is present
    #[serde(default)]
    pub positive_examples: Vec<String>,
    /// Quotes showing errors or missing parts; must be literal student text
    #[serde(default)]
    pub negative_examples: Vec<String>,
    /// What needs development
    #[serde(default)]
    pub missing: String,
}

/// A computed deficiency between a standard expectation and student evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    #[serde(default)]
    pub skill_domain: SkillDomain,
    /// What the student is missing or needs to develop
    #[serde(default)]
    pub description: String,
    /// The standard expectation text this gap is measured against
    #[serde(default)]
    pub sol_reference: Option<String>,
    /// Validated quotes from the student text, or the missing-skill summary
    #[serde(default)]
    pub evidence: Option<String>,
    #[serde(default)]
    pub severity: Severity,
}

impl Gap {
    /// Sentinel returned when retrieval context is unusable after expansion.
    ///
    /// Callers must check for this before treating the gap list as
    /// pedagogical content.
    pub fn insufficient_context(reason: impl Into<String>) -> Self {
        Self {
            skill_domain: SkillDomain::System,
            description: INSUFFICIENT_CONTEXT.to_string(),
            sol_reference: None,
            evidence: Some(reason.into()),
            severity: Severity::High,
        }
    }

    /// True for the `SYSTEM/INSUFFICIENT_CONTEXT` sentinel
    pub fn is_sentinel(&self) -> bool {
        self.skill_domain == SkillDomain::System && self.description == INSUFFICIENT_CONTEXT
    }
}

/// Verdict from the retrieval sufficiency check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SufficiencyVerdict {
    /// Whether the retrieved standards cover the grade and stage
    #[serde(default = "default_sufficient")]
    pub sufficient: bool,
    /// Brief explanation
    #[serde(default)]
    pub reason: String,
    /// What is missing, e.g. "Grade 3 standards missing"
    #[serde(default)]
    pub missing_elements: String,
}

fn default_sufficient() -> bool {
    // Sufficiency is a quality gate, not a hard dependency - a malformed
    // verdict fails open.
    true
}

impl SufficiencyVerdict {
    pub fn fail_open(reason: impl Into<String>) -> Self {
        Self {
            sufficient: true,
            reason: reason.into(),
            missing_elements: String::new(),
        }
    }
}

/// Session state owned by the calling stage machine.
///
/// The analysis side writes `rag_status`, `retrieval_attempts` and
/// `retrieved_standards`; everything else belongs to the caller.
/// Session-scoped, never process-wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub session_id: String,
    pub grade_level: String,
    pub current_stage: Stage,
    #[serde(default)]
    pub rag_status: RagStatus,
    /// Expansion attempts used so far, capped at 2
    #[serde(default)]
    pub retrieval_attempts: u8,
    /// Standards carried across an expansion round trip
    #[serde(default)]
    pub retrieved_standards: Vec<StandardReference>,
}

impl PipelineState {
    pub fn new(session_id: impl Into<String>, grade_level: impl Into<String>, stage: Stage) -> Self {
        Self {
            session_id: session_id.into(),
            grade_level: grade_level.into(),
            current_stage: stage,
            rag_status: RagStatus::Pending,
            retrieval_attempts: 0,
            retrieved_standards: Vec::new(),
        }
    }

    /// Record the outcome of an analysis pass.
    ///
    /// A sentinel gap marks the retrieved context insufficient; any other
    /// result, including an empty gap list, marks it sufficient.
    pub fn apply_analysis_outcome(&mut self, gaps: &[Gap]) {
        self.rag_status = if gaps.iter().any(Gap::is_sentinel) {
            RagStatus::Insufficient
        } else {
            RagStatus::Sufficient
        };
    }
}
