//! Shared vocabulary for the scribe writing-coach pipeline.
//!
//! Typed records, the LLM structured-decoding primitive, and the
//! collaborator traits (with fakes) that the pipeline stages are built on.

pub mod collab;
pub mod llm;
pub mod types;

pub use collab::{FakeRetriever, FakeWebSearcher, StandardsRetriever, WebSearcher};
pub use llm::{
    generate_structured, parse_structured, LlmConfig, LlmError, ScriptedGenerator, TextGenerator,
};
pub use types::{
    EvidenceLevel, EvidenceRecord, Expectation, Gap, PipelineState, RagStatus, Severity,
    SkillDomain, Stage, StandardReference, SufficiencyVerdict, INSUFFICIENT_CONTEXT,
};
