// orchestrator-rs/src/failure.rs
// Pipeline stages and the structured failure line emitted for failed turns.

use std::fmt;

use chrono::Utc;
use serde::Serialize;

use shared_types_rs::Outcome;

/// Linear per-query state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    Received,
    Planned,
    Executed,
    Synthesized,
    Logged,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Serialize)]
pub struct TurnFailureLog {
    pub event_type: String, // always "TURN_FAILURE"
    pub service: String,
    pub timestamp: String,
    pub session_id: String,
    /// Last stage reached before the failure.
    pub stage: String,
    pub outcome: String,
    pub error_message: String,
    pub tool_name: Option<String>,
}

impl TurnFailureLog {
    pub fn new(
        session_id: &str,
        stage: PipelineStage,
        outcome: Outcome,
        error_message: &str,
        tool_name: Option<&str>,
    ) -> Self {
        Self {
            event_type: "TURN_FAILURE".to_string(),
            service: "analyst-orchestrator".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            session_id: session_id.to_string(),
            stage: stage.to_string(),
            outcome: outcome.to_string(),
            error_message: error_message.to_string(),
            tool_name: tool_name.map(str::to_string),
        }
    }

    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => log::error!("{}", json),
            Err(e) => log::error!(
                "Turn failure in session {} at {} ({}): {} [log serialization failed: {}]",
                self.session_id,
                self.stage,
                self.outcome,
                self.error_message,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_log_serializes() {
        let entry = TurnFailureLog::new(
            "s-1",
            PipelineStage::Executed,
            Outcome::FailExecution,
            "Tool 'find_people' failed: boom",
            Some("find_people"),
        );
        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();
        assert_eq!(json["event_type"], "TURN_FAILURE");
        assert_eq!(json["stage"], "Executed");
        assert_eq!(json["outcome"], "FAIL_EXECUTION");
        assert_eq!(json["tool_name"], "find_people");
    }
}
