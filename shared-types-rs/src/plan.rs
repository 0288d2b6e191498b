// shared-types-rs/src/plan.rs
// Plan structure and best-effort recovery of JSON from model output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PlanError {
    #[error("model output contained no JSON object")]
    NoJson,

    #[error("plan is missing a tool_name")]
    MissingToolName,

    #[error("plan parameters must be an object, got {0}")]
    InvalidParameters(String),
}

/// Decision about which retrieval operation to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub tool_name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Plan {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Build a plan from an already repaired JSON object.
    ///
    /// `tool_name` must be a non-empty string. A missing or null
    /// `parameters` field is treated as an empty mapping.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, PlanError> {
        let tool_name = object
            .get("tool_name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(PlanError::MissingToolName)?;

        let parameters = match object.get("parameters") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => return Err(PlanError::InvalidParameters(other.to_string())),
        };

        Ok(Self {
            tool_name: tool_name.to_string(),
            parameters,
        })
    }

    /// Repair raw model output and build a plan from it.
    pub fn from_model_output(text: &str) -> Result<Self, PlanError> {
        let object = repair_json(text).ok_or(PlanError::NoJson)?;
        Self::from_object(&object)
    }

    /// Keys whose values are plain scalars (string, number, bool).
    pub fn scalar_parameters(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.parameters
            .iter()
            .filter(|(_, v)| matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_)))
    }
}

/// Extract the span from the first `{` to the last `}` and parse it strictly.
///
/// No bracket balancing is attempted: prose around a single object is
/// tolerated, anything else yields `None`.
pub fn repair_json(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<Map<String, Value>>(&text[start..=end]).ok()
}
