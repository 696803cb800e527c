//! Scribe daemon library - exposes modules for testing.

pub mod config;
pub mod dedup;
pub mod evidence;
pub mod expansion;
pub mod expectations;
pub mod gaps;
pub mod llm;
pub mod pipeline;
#[cfg(test)]
mod pipeline_tests;
pub mod prompts;
pub mod ranking;
pub mod retrieval;
pub mod router;
pub mod session;
pub mod sufficiency;
pub mod web_search;
