// llm-client-rs/src/lib.rs
//
// Generative call contract used by the planner, the synthesizer and the
// model-backed context summarizer, plus an OpenAI-compatible HTTP client.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

mod client;

pub use client::{ClientSettings, OpenAiCompatibleClient};

/// Which pipeline step a generation belongs to. Selects the model and is
/// carried into logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Planner,
    Synthesizer,
    Summarizer,
    AdminPlanner,
    AdminSynthesizer,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Planner => "planner",
            Phase::Synthesizer => "synthesizer",
            Phase::Summarizer => "summarizer",
            Phase::AdminPlanner => "admin_planner",
            Phase::AdminSynthesizer => "admin_synthesizer",
        }
    }

    /// Planning-style phases run on the planner model, narration on the
    /// synthesizer model.
    pub fn uses_planner_model(&self) -> bool {
        matches!(self, Phase::Planner | Phase::Summarizer | Phase::AdminPlanner)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("unknown error: {0}")]
    UnknownError(String),
}

impl LlmError {
    /// Server, network and rate-limit failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::ServerError(_) | LlmError::NetworkError(_) | LlmError::RateLimitExceeded(_)
        )
    }
}

/// Opaque text generation: system instruction plus user instruction in,
/// text out, optionally biased toward a single JSON object.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        json_mode: bool,
        phase: Phase,
    ) -> Result<String, LlmError>;

    /// Model identifier used for `phase`, recorded in the query log.
    fn model_name(&self, phase: Phase) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::ServerError("502".into()).is_retryable());
        assert!(LlmError::NetworkError("reset".into()).is_retryable());
        assert!(LlmError::RateLimitExceeded("slow down".into()).is_retryable());
        assert!(!LlmError::InvalidRequest("401".into()).is_retryable());
        assert!(!LlmError::ParseError("bad".into()).is_retryable());
    }

    #[test]
    fn test_phase_model_selection() {
        assert!(Phase::Planner.uses_planner_model());
        assert!(Phase::AdminPlanner.uses_planner_model());
        assert!(!Phase::Synthesizer.uses_planner_model());
        assert_eq!(Phase::AdminSynthesizer.to_string(), "admin_synthesizer");
    }
}
