//! Insight Aggregator
//!
//! Read-only analytics over the query log for administrators, exposed as a
//! small plan → execute → synthesize pipeline of its own:
//! - `get_most_frequent_field`: most requested planner parameter values
//! - `get_system_health_stats`: outcome counts with average response time
//! - `get_tool_usage_report`: tool popularity

mod analyst;
mod insights;
mod prompts;

pub use analyst::{AdminAnalyst, AdminResponse, InsightError};
pub use insights::{
    register_insight_tools, ChartDatum, MostFrequentFieldTool, SystemHealthTool, ToolUsageTool,
    MAX_FREQUENT_VALUES,
};
