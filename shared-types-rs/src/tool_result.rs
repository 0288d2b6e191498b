// shared-types-rs/src/tool_result.rs
// Tagged result returned by every tool.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Empty,
    Error,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolStatus::Success => write!(f, "success"),
            ToolStatus::Empty => write!(f, "empty"),
            ToolStatus::Error => write!(f, "error"),
        }
    }
}

/// Outcome of a single tool invocation.
///
/// Serialized as `{status, data, summary}` so the synthesizer always sees the
/// same shape regardless of variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ToolResultWire", from = "ToolResultWire")]
pub enum ToolResult {
    Success {
        data: Vec<Document>,
        summary: Option<String>,
    },
    Empty {
        summary: String,
    },
    Error {
        summary: String,
    },
}

impl ToolResult {
    pub fn success(data: Vec<Document>) -> Self {
        ToolResult::Success { data, summary: None }
    }

    pub fn success_with_summary(data: Vec<Document>, summary: impl Into<String>) -> Self {
        ToolResult::Success {
            data,
            summary: Some(summary.into()),
        }
    }

    pub fn empty(summary: impl Into<String>) -> Self {
        ToolResult::Empty {
            summary: summary.into(),
        }
    }

    pub fn error(summary: impl Into<String>) -> Self {
        ToolResult::Error {
            summary: summary.into(),
        }
    }

    /// `success` when `data` has rows, otherwise `empty` with the given summary.
    pub fn from_documents(data: Vec<Document>, empty_summary: impl Into<String>) -> Self {
        if data.is_empty() {
            Self::empty(empty_summary)
        } else {
            Self::success(data)
        }
    }

    pub fn status(&self) -> ToolStatus {
        match self {
            ToolResult::Success { .. } => ToolStatus::Success,
            ToolResult::Empty { .. } => ToolStatus::Empty,
            ToolResult::Error { .. } => ToolStatus::Error,
        }
    }

    pub fn data(&self) -> &[Document] {
        match self {
            ToolResult::Success { data, .. } => data,
            _ => &[],
        }
    }

    pub fn into_data(self) -> Vec<Document> {
        match self {
            ToolResult::Success { data, .. } => data,
            _ => Vec::new(),
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            ToolResult::Success { summary, .. } => summary.as_deref(),
            ToolResult::Empty { summary } | ToolResult::Error { summary } => Some(summary),
        }
    }

    /// True only for a success carrying at least one row.
    pub fn has_rows(&self) -> bool {
        !self.data().is_empty()
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error { .. })
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(ToolResultWire::from(self.clone())).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolResultWire {
    status: ToolStatus,
    #[serde(default)]
    data: Vec<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

impl From<ToolResult> for ToolResultWire {
    fn from(result: ToolResult) -> Self {
        match result {
            ToolResult::Success { data, summary } => ToolResultWire {
                status: ToolStatus::Success,
                data,
                summary,
            },
            ToolResult::Empty { summary } => ToolResultWire {
                status: ToolStatus::Empty,
                data: Vec::new(),
                summary: Some(summary),
            },
            ToolResult::Error { summary } => ToolResultWire {
                status: ToolStatus::Error,
                data: Vec::new(),
                summary: Some(summary),
            },
        }
    }
}

impl From<ToolResultWire> for ToolResult {
    fn from(wire: ToolResultWire) -> Self {
        match wire.status {
            ToolStatus::Success => ToolResult::Success {
                data: wire.data,
                summary: wire.summary,
            },
            ToolStatus::Empty => ToolResult::Empty {
                summary: wire.summary.unwrap_or_default(),
            },
            ToolStatus::Error => ToolResult::Error {
                summary: wire
                    .summary
                    .unwrap_or_else(|| "Tool reported an error without details.".to_string()),
            },
        }
    }
}
