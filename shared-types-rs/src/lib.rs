//! Types shared by every crate of the analyst pipeline.
//!
//! The planner, the tool registry, the outcome logger and the insight
//! aggregator all exchange the structures defined here, so this crate holds
//! no behaviour beyond construction helpers, plan repair and config loading.

pub mod config;
pub mod context;
pub mod outcome;
pub mod plan;
pub mod tool_result;

pub use config::{AnalystConfig, ConfigError, ModelEndpoint, ModelsConfig, PipelineConfig, StoreConfig};
pub use context::{ConversationContext, ExampleRecord};
pub use outcome::{ExecutionMode, ModeParseError, Outcome, QueryLogRecord, StageTimings};
pub use plan::{repair_json, Plan, PlanError};
pub use tool_result::{ToolResult, ToolStatus};

/// A schemaless record as stored in, and returned from, the document store.
pub type Document = serde_json::Map<String, serde_json::Value>;
