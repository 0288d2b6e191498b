// log-analyzer-rs/src/analyst.rs
// Admin analyst: planner → insight tool → synthesizer.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use document_store::DocumentStore;
use llm_client::{Generator, LlmError, Phase};
use shared_types_rs::{repair_json, Plan};
use tool_registry::{RegistryError, ToolRegistry};

use crate::insights::register_insight_tools;
use crate::prompts::{planner_system_prompt, synthesis_user_prompt, SYNTHESIS_SYSTEM_PROMPT};

pub const SYNTHESIS_FAILED_REPORT: &str = "AI Synthesizer failed. Returning raw data.";

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("AdminPlanner failed to return valid JSON. Got: {0}")]
    InvalidPlan(String),

    #[error("AdminPlanner selected an unknown tool: '{0}'")]
    UnknownTool(String),

    #[error("registry error: {0}")]
    Registry(RegistryError),

    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminResponse {
    pub report: String,
    pub chart_data: Vec<Value>,
}

impl AdminResponse {
    fn text_only(report: impl Into<String>) -> Self {
        Self {
            report: report.into(),
            chart_data: Vec::new(),
        }
    }
}

pub struct AdminAnalyst {
    generator: Arc<dyn Generator>,
    registry: ToolRegistry,
    generation_timeout: Duration,
}

impl AdminAnalyst {
    /// Analyst over the log collection `collection` of `store`.
    pub fn new(
        generator: Arc<dyn Generator>,
        store: Arc<dyn DocumentStore>,
        collection: &str,
        generation_timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let registry = ToolRegistry::new();
        register_insight_tools(&registry, store, collection)?;
        Ok(Self {
            generator,
            registry,
            generation_timeout,
        })
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer an admin question. Never fails; errors become the report text.
    #[instrument(skip(self))]
    pub async fn execute_plan(&self, query: &str) -> AdminResponse {
        match self.run(query).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Admin query failed: {}", e);
                AdminResponse::text_only(format!("An internal error occurred: {}", e))
            }
        }
    }

    async fn run(&self, query: &str) -> Result<AdminResponse, InsightError> {
        let system = planner_system_prompt(&self.registry.catalogue());
        let raw_plan = self.generate(&system, query, Phase::AdminPlanner).await?;
        let plan = Plan::from_model_output(&raw_plan).map_err(|_| InsightError::InvalidPlan(raw_plan.clone()))?;

        log::debug!("Executing insight tool {} with {:?}", plan.tool_name, plan.parameters);
        let result = self
            .registry
            .execute_tool(&plan.tool_name, &plan.parameters)
            .await
            .map_err(|e| match e {
                RegistryError::UnknownTool(name) => InsightError::UnknownTool(name),
                other => InsightError::Registry(other),
            })?;

        if !result.has_rows() {
            return Ok(AdminResponse::text_only(result.summary().unwrap_or_default()));
        }

        let raw_data: Vec<Value> = result.data().iter().cloned().map(Value::Object).collect();
        let context = serde_json::to_string_pretty(&result.to_value()).unwrap_or_default();
        let user = synthesis_user_prompt(&context, query);

        let report = match self.generate(SYNTHESIS_SYSTEM_PROMPT, &user, Phase::AdminSynthesizer).await {
            Ok(raw) => repair_json(&raw)
                .and_then(|json| json.get("report").and_then(Value::as_str).map(str::to_string)),
            Err(e) => {
                log::warn!("Admin synthesizer failed: {}", e);
                None
            }
        };

        Ok(match report {
            Some(report) => AdminResponse {
                report,
                chart_data: raw_data,
            },
            None => AdminResponse {
                report: SYNTHESIS_FAILED_REPORT.to_string(),
                chart_data: raw_data,
            },
        })
    }

    async fn generate(&self, system: &str, user: &str, phase: Phase) -> Result<String, InsightError> {
        match tokio::time::timeout(
            self.generation_timeout,
            self.generator.generate(system, user, true, phase),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(InsightError::Timeout(self.generation_timeout)),
        }
    }
}
