//! Stage routing over the pipeline state.
//!
//! Pure decision functions: the caller holds the state and performs the
//! work, the router only says what comes next. An insufficiency signal
//! preempts stage work, and publishing terminates the run since it is a
//! presentation activity with no analysis to do.

use scribe_common::types::{PipelineState, RagStatus, Stage};

/// What the orchestrator should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Run the analysis pipeline for this writing stage
    RunStage(Stage),
    /// Retrieved context was judged insufficient, expand it
    ExpandContext,
    /// Nothing left to do for this session
    Terminal,
}

/// Entry routing: pick the next action for a session's current state.
pub fn route(state: &PipelineState) -> RouteDecision {
    if state.rag_status == RagStatus::Insufficient {
        return RouteDecision::ExpandContext;
    }

    match state.current_stage {
        Stage::Publishing => RouteDecision::Terminal,
        stage => RouteDecision::RunStage(stage),
    }
}

/// Post-stage routing: after a stage runs, expansion is the only reason to
/// keep going.
pub fn after_stage(state: &PipelineState) -> RouteDecision {
    if state.rag_status == RagStatus::Insufficient {
        RouteDecision::ExpandContext
    } else {
        RouteDecision::Terminal
    }
}
