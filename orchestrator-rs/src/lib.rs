//! Planner/Synthesizer Pipeline
//!
//! Per-session orchestration of one question: local policy checks, a planner
//! call (or a learned template), tool execution with fallback search,
//! narration with deterministic guards, context summarization and exactly
//! one outcome record per turn.
//!
//! Sessions are explicit: the [`Analyst`] owns a [`SessionRegistry`] keyed by
//! session id and holds no process-wide state.

pub mod analyst;
pub mod context;
pub mod examples;
pub mod failure;
pub mod narration;
mod prompts;
pub mod session;

#[cfg(test)]
mod tests;

pub use analyst::{Analyst, AnalystError, AnalystResponse, Generators, CLARIFICATION_TOOL, CONVERSATIONAL_TOOL};
pub use context::{
    ContextSummarizer, HeuristicSummarizer, KeywordTopicDetector, ModelSummarizer, TopicChangeDetector, TurnSummary,
};
pub use examples::{ExampleBank, InMemoryExampleBank};
pub use failure::{PipelineStage, TurnFailureLog};
pub use session::{SessionRegistry, SessionState};
