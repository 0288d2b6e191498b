// shared-types-rs/src/outcome.rs
// Terminal classification of a processed query and its log record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::Plan;

/// Terminal classification assigned once per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    SuccessDirect,
    SuccessFallback,
    SuccessConversational,
    FailEmpty,
    FailPlanner,
    FailExecution,
    FailUnknown,
}

impl Outcome {
    pub const ALL: [Outcome; 7] = [
        Outcome::SuccessDirect,
        Outcome::SuccessFallback,
        Outcome::SuccessConversational,
        Outcome::FailEmpty,
        Outcome::FailPlanner,
        Outcome::FailExecution,
        Outcome::FailUnknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::SuccessDirect => "SUCCESS_DIRECT",
            Outcome::SuccessFallback => "SUCCESS_FALLBACK",
            Outcome::SuccessConversational => "SUCCESS_CONVERSATIONAL",
            Outcome::FailEmpty => "FAIL_EMPTY",
            Outcome::FailPlanner => "FAIL_PLANNER",
            Outcome::FailExecution => "FAIL_EXECUTION",
            Outcome::FailUnknown => "FAIL_UNKNOWN",
        }
    }

    /// Human readable explanation used in the training report.
    pub fn description(&self) -> &'static str {
        match self {
            Outcome::SuccessDirect => "Primary tool succeeded.",
            Outcome::SuccessFallback => "Primary tool failed, but fallback search found results.",
            Outcome::SuccessConversational => "A conversational query was handled directly.",
            Outcome::FailEmpty => "Tool and fallback ran correctly but found no data.",
            Outcome::FailPlanner => "AI Planner failed to choose a tool.",
            Outcome::FailExecution => "An unexpected error occurred during tool execution.",
            Outcome::FailUnknown => "An unknown failure occurred.",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::SuccessDirect | Outcome::SuccessFallback | Outcome::SuccessConversational
        )
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::FailUnknown
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Outcome::ALL
            .iter()
            .copied()
            .find(|outcome| outcome.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown outcome: {}", s))
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("execution mode must be 'online' or 'offline', got '{0}'")]
pub struct ModeParseError(pub String);

/// Which model endpoints a session routes its generative calls to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Online,
    Offline,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Online => write!(f, "online"),
            ExecutionMode::Offline => write!(f, "offline"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(ExecutionMode::Online),
            "offline" => Ok(ExecutionMode::Offline),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

/// Durations of each pipeline stage, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub planner: f64,
    pub retrieval: f64,
    pub synthesis: f64,
    pub total: f64,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Immutable record of one processed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub query: String,
    pub plan: Option<Plan>,
    pub plan_hash: Option<String>,
    pub outcome: Outcome,
    pub execution_mode: ExecutionMode,
    pub results_count: usize,
    pub planner_duration: f64,
    pub retrieval_duration: f64,
    pub synth_duration: f64,
    pub total_duration: f64,
    pub planner_model: Option<String>,
    pub synth_model: Option<String>,
    pub final_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corruption_details: Option<Vec<String>>,
}

impl QueryLogRecord {
    /// Start a record with the `FAIL_UNKNOWN` default outcome.
    pub fn new(session_id: impl Into<String>, query: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session_id.into(),
            query: query.into(),
            plan: None,
            plan_hash: None,
            outcome: Outcome::FailUnknown,
            execution_mode: mode,
            results_count: 0,
            planner_duration: 0.0,
            retrieval_duration: 0.0,
            synth_duration: 0.0,
            total_duration: 0.0,
            planner_model: None,
            synth_model: None,
            final_answer: String::new(),
            error_message: None,
            corruption_details: None,
        }
    }

    /// Copy stage durations into the record, rounded to 4 decimal places.
    pub fn set_timings(&mut self, timings: StageTimings) {
        self.planner_duration = round4(timings.planner);
        self.retrieval_duration = round4(timings.retrieval);
        self.synth_duration = round4(timings.synthesis);
        self.total_duration = round4(timings.total);
    }
}
