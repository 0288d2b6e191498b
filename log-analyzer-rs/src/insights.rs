// log-analyzer-rs/src/insights.rs
// Aggregation tools over the query log collection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use document_store::{Accumulator, DocumentStore, Filter, GroupKey, Stage};
use shared_types_rs::{Document, ToolResult};
use tool_registry::{
    ParamType, ParameterDefinition, RegistryError, Tool, ToolArguments, ToolError, ToolMetadata,
    ToolRegistry,
};

pub const MAX_FREQUENT_VALUES: usize = 50;
const CATEGORY: &str = "insights";

static FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field name regex"));

/// Chart-ready rows emitted by the insight tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartDatum {
    Health {
        outcome: String,
        count: u64,
        avg_response_time: f64,
    },
    ToolUsage {
        tool_name: String,
        count: u64,
    },
    Frequency {
        value: String,
        count: u64,
    },
}

impl ChartDatum {
    fn into_document(self) -> Document {
        match serde_json::to_value(self) {
            Ok(Value::Object(doc)) => doc,
            _ => Document::new(),
        }
    }
}

pub fn register_insight_tools(
    registry: &ToolRegistry,
    store: Arc<dyn DocumentStore>,
    collection: &str,
) -> Result<(), RegistryError> {
    registry.register_tool(Arc::new(MostFrequentFieldTool::new(store.clone(), collection)))?;
    registry.register_tool(Arc::new(SystemHealthTool::new(store.clone(), collection)))?;
    registry.register_tool(Arc::new(ToolUsageTool::new(store, collection)))?;
    Ok(())
}

fn time_range_parameter() -> ParameterDefinition {
    ParameterDefinition::optional(
        "time_range_days",
        ParamType::Integer,
        "Number of past days to analyze; 0 means all time",
    )
    .with_default(json!(0))
}

/// Empty pipeline prefix when `days <= 0`.
fn time_window(days: i64) -> Vec<Stage> {
    if days <= 0 {
        return Vec::new();
    }
    let start = Utc::now() - Duration::days(days);
    vec![Stage::Match(Filter::AtLeast(
        "timestamp".to_string(),
        json!(start.to_rfc3339()),
    ))]
}

fn time_description(days: i64) -> String {
    if days > 0 {
        format!("in the last {} days", days)
    } else {
        "in total".to_string()
    }
}

fn count_of(doc: &Document) -> u64 {
    doc.get("count").and_then(Value::as_u64).unwrap_or(0)
}

fn id_text(doc: &Document) -> String {
    doc.get("_id")
        .and_then(document_store::value_text)
        .unwrap_or_else(|| "unknown".to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Most frequently requested values of one planner parameter.
pub struct MostFrequentFieldTool {
    metadata: ToolMetadata,
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl MostFrequentFieldTool {
    pub fn new(store: Arc<dyn DocumentStore>, collection: &str) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "get_most_frequent_field".to_string(),
                description: "Most frequently queried values of a planner parameter such as person_name, program, year_level or department. Answers 'what is the most...' and 'top N' questions.".to_string(),
                category: CATEGORY.to_string(),
                parameters: vec![
                    ParameterDefinition::required(
                        "field_name",
                        ParamType::String,
                        "Parameter to analyze: person_name, program, year_level, department, section, position",
                    ),
                    time_range_parameter(),
                ],
            },
            store,
            collection: collection.to_string(),
        }
    }
}

#[async_trait]
impl Tool for MostFrequentFieldTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolResult, ToolError> {
        let field = args.require_str(&self.metadata.name, "field_name")?;
        if !FIELD_NAME_RE.is_match(field) {
            return Err(ToolError::InvalidParameter {
                parameter: "field_name".to_string(),
                expected: ParamType::String,
                got: field.to_string(),
            });
        }
        let days = args.i64("time_range_days").unwrap_or(0);
        let path = format!("plan.parameters.{}", field);

        let mut pipeline = time_window(days);
        pipeline.extend([
            Stage::Match(Filter::NotEmpty(path.clone())),
            Stage::Unwind(path.clone()),
            Stage::Match(Filter::NotEmpty(path.clone())),
            Stage::Group {
                key: GroupKey::LowercaseText(path),
                accumulators: vec![("count".to_string(), Accumulator::Count)],
            },
            Stage::Sort {
                field: "count".to_string(),
                descending: true,
            },
            Stage::Limit(MAX_FREQUENT_VALUES),
        ]);

        let groups = match self.store.aggregate(&self.collection, &pipeline).await {
            Ok(groups) => groups,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Database error analyzing '{}': {}",
                    field, e
                )))
            }
        };

        let rows: Vec<Document> = groups
            .iter()
            .map(|g| {
                ChartDatum::Frequency {
                    value: id_text(g),
                    count: count_of(g),
                }
                .into_document()
            })
            .collect();

        Ok(ToolResult::from_documents(
            rows,
            format!("No data found for '{}' {}.", field, time_description(days)),
        ))
    }
}

/// Outcome breakdown with average end-to-end latency.
pub struct SystemHealthTool {
    metadata: ToolMetadata,
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl SystemHealthTool {
    pub fn new(store: Arc<dyn DocumentStore>, collection: &str) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "get_system_health_stats".to_string(),
                description: "Query outcomes (successes, failures) with average response time. Use for performance, success rate and failure questions.".to_string(),
                category: CATEGORY.to_string(),
                parameters: vec![time_range_parameter()],
            },
            store,
            collection: collection.to_string(),
        }
    }
}

#[async_trait]
impl Tool for SystemHealthTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolResult, ToolError> {
        let days = args.i64("time_range_days").unwrap_or(0);

        let mut pipeline = time_window(days);
        pipeline.extend([
            Stage::Group {
                key: GroupKey::Field("outcome".to_string()),
                accumulators: vec![
                    ("count".to_string(), Accumulator::Count),
                    (
                        "avg_response_time".to_string(),
                        Accumulator::Avg("total_duration".to_string()),
                    ),
                ],
            },
            Stage::Sort {
                field: "count".to_string(),
                descending: true,
            },
        ]);

        let groups = match self.store.aggregate(&self.collection, &pipeline).await {
            Ok(groups) => groups,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Database error analyzing health stats: {}",
                    e
                )))
            }
        };

        let rows: Vec<Document> = groups
            .iter()
            .map(|g| {
                ChartDatum::Health {
                    outcome: id_text(g),
                    count: count_of(g),
                    avg_response_time: round2(
                        g.get("avg_response_time").and_then(Value::as_f64).unwrap_or(0.0),
                    ),
                }
                .into_document()
            })
            .collect();

        Ok(ToolResult::from_documents(
            rows,
            format!("No health stats found {}.", time_description(days)),
        ))
    }
}

/// Tool popularity ranking.
pub struct ToolUsageTool {
    metadata: ToolMetadata,
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl ToolUsageTool {
    pub fn new(store: Arc<dyn DocumentStore>, collection: &str) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "get_tool_usage_report".to_string(),
                description: "Which tools users trigger most often. Use for 'most used features' and 'what do users do most'.".to_string(),
                category: CATEGORY.to_string(),
                parameters: vec![time_range_parameter()],
            },
            store,
            collection: collection.to_string(),
        }
    }
}

#[async_trait]
impl Tool for ToolUsageTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolResult, ToolError> {
        let days = args.i64("time_range_days").unwrap_or(0);

        let mut pipeline = time_window(days);
        pipeline.extend([
            Stage::Match(Filter::NotEmpty("plan.tool_name".to_string())),
            Stage::Group {
                key: GroupKey::Field("plan.tool_name".to_string()),
                accumulators: vec![("count".to_string(), Accumulator::Count)],
            },
            Stage::Sort {
                field: "count".to_string(),
                descending: true,
            },
        ]);

        let groups = match self.store.aggregate(&self.collection, &pipeline).await {
            Ok(groups) => groups,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Database error analyzing tool usage: {}",
                    e
                )))
            }
        };

        let rows: Vec<Document> = groups
            .iter()
            .map(|g| {
                ChartDatum::ToolUsage {
                    tool_name: id_text(g),
                    count: count_of(g),
                }
                .into_document()
            })
            .collect();

        Ok(ToolResult::from_documents(
            rows,
            format!("No tool usage stats found {}.", time_description(days)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::MemoryDocumentStore;
    use serde_json::Map;

    fn log_entry(days_ago: i64, tool: &str, params: Value, outcome: &str, total: f64) -> Document {
        json!({
            "timestamp": (Utc::now() - Duration::days(days_ago)).to_rfc3339(),
            "session_id": "s1",
            "query": "q",
            "plan": {"tool_name": tool, "parameters": params},
            "outcome": outcome,
            "total_duration": total,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    async fn registry() -> ToolRegistry {
        let store = MemoryDocumentStore::new();
        store
            .insert_many(
                "query_logs",
                vec![
                    log_entry(1, "find_people", json!({"program": "BSCS", "year_level": 2}), "SUCCESS_DIRECT", 1.0),
                    log_entry(2, "find_people", json!({"program": "bscs", "year_level": "2"}), "SUCCESS_DIRECT", 2.0),
                    log_entry(3, "get_person_schedule", json!({"program": ["BSIT", "BSCS"]}), "FAIL_EMPTY", 0.5),
                    log_entry(40, "query_curriculum", json!({"program": "BSIT"}), "FAIL_PLANNER", 0.25),
                    log_entry(1, "find_people", json!({"program": ""}), "SUCCESS_DIRECT", 3.0),
                ],
            )
            .await
            .unwrap();

        let registry = ToolRegistry::new();
        register_insight_tools(&registry, Arc::new(store), "query_logs").unwrap();
        registry
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_most_frequent_normalizes_case_and_lists() {
        let registry = registry().await;
        let result = registry
            .execute_tool("get_most_frequent_field", &params(json!({"field_name": "program"})))
            .await
            .unwrap();

        let data = result.data();
        assert_eq!(data[0].get("value"), Some(&json!("bscs")));
        assert_eq!(data[0].get("count"), Some(&json!(3)));
        assert_eq!(data[1].get("value"), Some(&json!("bsit")));
        assert_eq!(data[1].get("count"), Some(&json!(2)));
        assert_eq!(data.len(), 2);
    }

    #[tokio::test]
    async fn test_most_frequent_merges_numbers_and_strings() {
        let registry = registry().await;
        let result = registry
            .execute_tool("get_most_frequent_field", &params(json!({"field_name": "year_level"})))
            .await
            .unwrap();
        assert_eq!(result.data().len(), 1);
        assert_eq!(result.data()[0].get("value"), Some(&json!("2")));
        assert_eq!(result.data()[0].get("count"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_most_frequent_time_window_and_empty_summary() {
        let registry = registry().await;
        let windowed = registry
            .execute_tool(
                "get_most_frequent_field",
                &params(json!({"field_name": "program", "time_range_days": 7})),
            )
            .await
            .unwrap();
        let bsit = windowed
            .data()
            .iter()
            .find(|d| d.get("value") == Some(&json!("bsit")))
            .unwrap();
        assert_eq!(bsit.get("count"), Some(&json!(1)));

        let empty = registry
            .execute_tool(
                "get_most_frequent_field",
                &params(json!({"field_name": "department", "time_range_days": 7})),
            )
            .await
            .unwrap();
        assert_eq!(empty.summary(), Some("No data found for 'department' in the last 7 days."));
    }

    #[tokio::test]
    async fn test_invalid_field_name_is_error_result() {
        let registry = registry().await;
        let result = registry
            .execute_tool("get_most_frequent_field", &params(json!({"field_name": "a.b"})))
            .await
            .unwrap();
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn test_health_stats() {
        let registry = registry().await;
        let result = registry
            .execute_tool("get_system_health_stats", &Map::new())
            .await
            .unwrap();

        let first = &result.data()[0];
        assert_eq!(first.get("outcome"), Some(&json!("SUCCESS_DIRECT")));
        assert_eq!(first.get("count"), Some(&json!(3)));
        assert_eq!(first.get("avg_response_time"), Some(&json!(2.0)));
        assert_eq!(result.data().len(), 3);
    }

    #[tokio::test]
    async fn test_tool_usage_report() {
        let registry = registry().await;
        let result = registry
            .execute_tool("get_tool_usage_report", &params(json!({"time_range_days": 30})))
            .await
            .unwrap();

        let data = result.data();
        assert_eq!(data[0].get("tool_name"), Some(&json!("find_people")));
        assert_eq!(data[0].get("count"), Some(&json!(3)));
        assert!(data.iter().all(|d| d.get("tool_name") != Some(&json!("query_curriculum"))));
    }

    #[test]
    fn test_chart_datum_shapes() {
        let datum: ChartDatum = serde_json::from_value(json!({"value": "bscs", "count": 4})).unwrap();
        assert_eq!(datum, ChartDatum::Frequency { value: "bscs".into(), count: 4 });

        let health: ChartDatum =
            serde_json::from_value(json!({"outcome": "FAIL_EMPTY", "count": 1, "avg_response_time": 0.5})).unwrap();
        assert!(matches!(health, ChartDatum::Health { .. }));
    }
}
