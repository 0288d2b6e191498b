// orchestrator-rs/src/analyst.rs
// Planner/synthesizer pipeline over per-session state.
//
// RECEIVED -> PLANNED -> EXECUTED -> SYNTHESIZED -> LOGGED, with failure
// exits at PLANNED and EXECUTED. Every turn is logged exactly once.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::instrument;

use document_store::{value_text, Document, DocumentStore};
use llm_client::{Generator, LlmError, OpenAiCompatibleClient, Phase};
use policy_engine::{contains_placeholder, normalize, Intent, LexiconAnnotator, NlpAnnotator, PolicyEngine, QueryAnalysis};
use query_log::OutcomeLogger;
use shared_types_rs::{
    repair_json, AnalystConfig, ExampleRecord, ExecutionMode, ModelsConfig, Outcome, Plan, PlanError,
    QueryLogRecord, StageTimings, ToolResult, ToolStatus,
};
use tool_registry::{register_directory_tools, DirectoryCollections, RegistryError, ToolRegistry, SEARCH_TOOL};

use crate::context::{
    ContextSummarizer, HeuristicSummarizer, KeywordTopicDetector, ModelSummarizer, TopicChangeDetector, TurnSummary,
};
use crate::examples::{ExampleBank, InMemoryExampleBank};
use crate::failure::{PipelineStage, TurnFailureLog};
use crate::narration::{
    clarification_question, distinct_entities, ensure_citation, ensure_complete_listing, is_enumeration, is_singular,
    narrow_superlative,
};
use crate::prompts::{
    conversational_reply, execution_apology, planner_system_prompt, synthesis_user_prompt, vague_clarification,
    GENERIC_APOLOGY, PLANNER_APOLOGY, SYNTHESIS_APOLOGY, SYNTHESIS_SYSTEM_PROMPT,
};
use crate::session::{SessionRegistry, SessionState};

/// Pseudo-tool recorded for small talk; never registered.
pub const CONVERSATIONAL_TOOL: &str = "answer_conversational_query";
/// Pseudo-tool recorded when a vague query is answered with a question.
pub const CLARIFICATION_TOOL: &str = "request_clarification";

const FALLBACK_STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "in", "on", "for", "and", "or", "to", "is", "are", "was", "who", "what", "which",
    "where", "when", "how", "show", "me", "list", "all", "give", "find", "tell", "about", "please", "can", "you",
];

#[derive(Debug, Error)]
pub enum AnalystError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("planner returned an unusable plan ({reason}): {raw}")]
    InvalidPlan { reason: PlanError, raw: String },

    #[error("planner selected an unknown tool: '{0}'")]
    UnknownTool(String),
}

/// What the caller gets back for one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalystResponse {
    pub report: String,
    pub chart_data: Vec<Value>,
    pub outcome: Outcome,
}

impl AnalystResponse {
    fn text(report: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            report: report.into(),
            chart_data: Vec::new(),
            outcome,
        }
    }
}

/// Model clients per execution mode.
#[derive(Clone)]
pub struct Generators {
    pub online: Arc<dyn Generator>,
    pub offline: Arc<dyn Generator>,
}

impl Generators {
    pub fn new(online: Arc<dyn Generator>, offline: Arc<dyn Generator>) -> Self {
        Self { online, offline }
    }

    /// The same client for both modes.
    pub fn single(generator: Arc<dyn Generator>) -> Self {
        Self {
            online: generator.clone(),
            offline: generator,
        }
    }

    /// HTTP clients for the configured endpoints. Offline settings read
    /// `OFFLINE_`-prefixed environment variables.
    pub fn from_config(models: &ModelsConfig) -> Self {
        Self {
            online: Arc::new(OpenAiCompatibleClient::from_endpoint(&models.online, "")),
            offline: Arc::new(OpenAiCompatibleClient::from_endpoint(&models.offline, "OFFLINE")),
        }
    }

    pub fn for_mode(&self, mode: ExecutionMode) -> &Arc<dyn Generator> {
        match mode {
            ExecutionMode::Online => &self.online,
            ExecutionMode::Offline => &self.offline,
        }
    }
}

/// Mutable bookkeeping for the turn being processed.
struct Turn {
    record: QueryLogRecord,
    stage: PipelineStage,
    timings: StageTimings,
}

impl Turn {
    fn new(session_id: &str, query: &str, mode: ExecutionMode) -> Self {
        Self {
            record: QueryLogRecord::new(session_id, query, mode),
            stage: PipelineStage::Received,
            timings: StageTimings::default(),
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.record.error_message = Some(message.into());
    }
}

pub struct Analyst {
    config: AnalystConfig,
    policy: PolicyEngine,
    registry: ToolRegistry,
    generators: Generators,
    logger: OutcomeLogger,
    sessions: SessionRegistry,
    examples: Arc<dyn ExampleBank>,
    summarizer: Arc<dyn ContextSummarizer>,
    topic_detector: Arc<dyn TopicChangeDetector>,
    generation_timeout: Duration,
}

impl Analyst {
    /// Build an analyst over `store`: registers the directory tools on the
    /// configured collections and logs outcomes to the configured collection.
    pub fn configure(
        config: AnalystConfig,
        store: Arc<dyn DocumentStore>,
        generators: Generators,
    ) -> Result<Self, AnalystError> {
        let collections =
            DirectoryCollections::default().with_searchable(config.store.directory_collections.clone());
        let registry = ToolRegistry::with_timeout(Duration::from_secs(config.pipeline.tool_timeout_secs));
        register_directory_tools(&registry, store.clone(), &collections)?;

        let generation_timeout = Duration::from_secs(config.pipeline.generation_timeout_secs);
        let summarizer: Arc<dyn ContextSummarizer> = match config.pipeline.summarizer.as_str() {
            "model" => Arc::new(ModelSummarizer::new(
                generators.online.clone(),
                generators.offline.clone(),
                generation_timeout,
            )),
            _ => Arc::new(HeuristicSummarizer),
        };

        log::info!(
            "Analyst configured: {} tools, default mode {}, logging to '{}'",
            registry.list_tools(None).len(),
            config.pipeline.default_mode,
            config.store.log_collection
        );

        Ok(Self {
            policy: PolicyEngine::new(Arc::new(LexiconAnnotator::new()), config.store.known_programs.clone()),
            registry,
            logger: OutcomeLogger::new(store, config.store.log_collection.clone()),
            sessions: SessionRegistry::new(
                config.pipeline.default_mode,
                Duration::from_secs(config.pipeline.session_idle_ttl_secs),
            ),
            examples: Arc::new(InMemoryExampleBank::default()),
            summarizer,
            topic_detector: Arc::new(KeywordTopicDetector),
            generation_timeout,
            generators,
            config,
        })
    }

    pub fn with_example_bank(mut self, examples: Arc<dyn ExampleBank>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn ContextSummarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_topic_detector(mut self, detector: Arc<dyn TopicChangeDetector>) -> Self {
        self.topic_detector = detector;
        self
    }

    pub fn with_annotator(mut self, annotator: Arc<dyn NlpAnnotator>) -> Self {
        self.policy = PolicyEngine::new(annotator, self.config.store.known_programs.clone());
        self
    }

    /// The tool catalogue; hosts may register additional tools here.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn logger(&self) -> &OutcomeLogger {
        &self.logger
    }

    pub fn examples(&self) -> &Arc<dyn ExampleBank> {
        &self.examples
    }

    pub fn config(&self) -> &AnalystConfig {
        &self.config
    }

    pub async fn set_mode(&self, session_id: &str, mode: ExecutionMode) {
        self.sessions.set_mode(session_id, mode).await;
    }

    pub fn end_session(&self, session_id: &str) -> bool {
        self.sessions.end_session(session_id)
    }

    /// Answer one question for `session_id`.
    ///
    /// Never fails: any error or panic escaping the pipeline becomes the
    /// generic apology with `FAIL_UNKNOWN`. Exactly one log record is written.
    #[instrument(skip(self), fields(session = %session_id))]
    pub async fn ask(&self, query: &str, session_id: &str) -> AnalystResponse {
        self.sessions.evict_idle();
        let session = self.sessions.session(session_id);
        let mut state = session.lock().await;
        state.touch();
        state.turns += 1;

        let started = Instant::now();
        let mut turn = Turn::new(session_id, query, state.mode);
        let result = AssertUnwindSafe(self.run_turn(query, &mut state, &mut turn))
            .catch_unwind()
            .await;

        let response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                log::error!("Pipeline error in session {}: {}", session_id, e);
                turn.fail(e.to_string());
                AnalystResponse::text(GENERIC_APOLOGY, Outcome::FailUnknown)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("Pipeline panicked in session {}: {}", session_id, message);
                turn.fail(format!("panic: {}", message));
                AnalystResponse::text(GENERIC_APOLOGY, Outcome::FailUnknown)
            }
        };

        turn.timings.total = started.elapsed().as_secs_f64();
        turn.record.set_timings(turn.timings);
        turn.record.outcome = response.outcome;
        turn.record.final_answer = response.report.clone();

        if !response.outcome.is_success() {
            let message = turn
                .record
                .error_message
                .clone()
                .unwrap_or_else(|| response.outcome.description().to_string());
            TurnFailureLog::new(
                session_id,
                turn.stage,
                response.outcome,
                &message,
                turn.record.plan.as_ref().map(|plan| plan.tool_name.as_str()),
            )
            .emit();
        }

        turn.stage = PipelineStage::Logged;
        log::info!(
            "Session {} turn {} finished with {} in {:.3}s",
            session_id,
            state.turns,
            response.outcome,
            turn.timings.total
        );
        self.logger.record(turn.record).await;
        response
    }

    async fn run_turn(
        &self,
        query: &str,
        state: &mut SessionState,
        turn: &mut Turn,
    ) -> Result<AnalystResponse, AnalystError> {
        let mut effective = normalize(query);

        let mut answered_clarification = false;
        if let Some(pending) = state.pending_clarification.take() {
            if !self.policy.is_interrogative(query) && self.policy.is_data_like(query) {
                effective = format!("{} {}", pending, effective);
                answered_clarification = true;
                log::info!("Treating reply as clarification: '{}'", effective);
            }
        }

        let analysis = self.policy.analyze(&effective);
        log::debug!("Policy analysis: {:?}", analysis);

        if !answered_clarification {
            if let Some(target) = &analysis.vague_target {
                turn.record.plan = Some(Plan::new(CLARIFICATION_TOOL).with_param("target", target.clone()));
                turn.stage = PipelineStage::Planned;
                state.pending_clarification = Some(effective.clone());
                return Ok(AnalystResponse::text(
                    vague_clarification(target),
                    Outcome::SuccessConversational,
                ));
            }
        }

        if analysis.intent == Some(Intent::AnswerConversationalQuery) {
            return Ok(self.conversational(Plan::new(CONVERSATIONAL_TOOL), &analysis, turn));
        }

        // Planning
        let planner_started = Instant::now();
        let planned = self.plan(&effective, &analysis, state, turn).await;
        turn.timings.planner = planner_started.elapsed().as_secs_f64();
        let (mut plan, from_template) = match planned {
            Ok(planned) => planned,
            Err(e) => {
                log::warn!("Planning failed: {}", e);
                turn.fail(e.to_string());
                return Ok(AnalystResponse::text(PLANNER_APOLOGY, Outcome::FailPlanner));
            }
        };

        if plan.tool_name == CONVERSATIONAL_TOOL {
            return Ok(self.conversational(plan, &analysis, turn));
        }
        if !self.registry.has_tool(&plan.tool_name) {
            let e = AnalystError::UnknownTool(plan.tool_name.clone());
            log::warn!("{}", e);
            turn.record.plan = Some(plan);
            turn.fail(e.to_string());
            return Ok(AnalystResponse::text(PLANNER_APOLOGY, Outcome::FailPlanner));
        }

        self.repair_placeholders(&effective, &mut plan, turn);
        let extracted = plan.clone();

        if self
            .topic_detector
            .is_new_topic(&effective, &state.context, state.last_tool.as_deref(), &plan)
        {
            if !state.context.active_filters.is_empty() {
                log::info!("Topic changed, clearing filters {:?}", state.context.active_filters);
            }
            state.context.clear_filters();
        }
        let overridden = state.context.apply_filters(&mut plan.parameters);
        if !overridden.is_empty() {
            log::debug!("Context filters overrode extracted {:?}", overridden);
        }
        turn.record.plan = Some(plan.clone());
        turn.stage = PipelineStage::Planned;

        // Execution
        let retrieval_started = Instant::now();
        let mut result = self.registry.execute_tool(&plan.tool_name, &plan.parameters).await?;
        let mut outcome = Outcome::SuccessDirect;
        if result.status() == ToolStatus::Empty
            && self.config.pipeline.fallback_enabled
            && plan.tool_name != SEARCH_TOOL
        {
            if let Some(found) = self.fallback(&effective, &plan).await? {
                result = found;
                outcome = Outcome::SuccessFallback;
            }
        }
        turn.timings.retrieval = retrieval_started.elapsed().as_secs_f64();
        turn.stage = PipelineStage::Executed;
        state.last_tool = Some(plan.tool_name.clone());

        let response = match result.status() {
            ToolStatus::Error => {
                let summary = result.summary().unwrap_or("tool reported an error").to_string();
                turn.fail(summary.clone());
                AnalystResponse::text(execution_apology(&summary), Outcome::FailExecution)
            }
            ToolStatus::Empty => AnalystResponse::text(
                result.summary().unwrap_or("No matching records were found."),
                Outcome::FailEmpty,
            ),
            ToolStatus::Success => {
                let rows = result.into_data();
                turn.record.results_count = rows.len();
                let synth_started = Instant::now();
                let response = self.narrate(&effective, rows, outcome, state, turn).await;
                turn.timings.synthesis = synth_started.elapsed().as_secs_f64();
                response
            }
        };

        let summary = TurnSummary {
            query: &effective,
            plan: Some(&plan),
            people: &analysis.people,
            outcome: response.outcome,
            mode: state.mode,
        };
        state.context = self.summarizer.summarize(&state.context, &summary).await;

        // A turn that ended in a clarification question has not been solved.
        let asked_back = state.pending_clarification.is_some();
        if response.outcome == Outcome::SuccessDirect
            && !asked_back
            && !from_template
            && !extracted.parameters.is_empty()
        {
            self.examples.add(self.policy.delexicalize(&effective, &extracted));
        }

        Ok(response)
    }

    /// Template fast path, else a planner call.
    async fn plan(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
        state: &SessionState,
        turn: &mut Turn,
    ) -> Result<(Plan, bool), AnalystError> {
        if let Some(plan) = self.policy.match_example(query, &self.examples.all()) {
            let same_intent = analysis
                .intent
                .map_or(true, |intent| intent.tool_name() == plan.tool_name);
            if same_intent {
                log::info!("Template fast path selected {}", plan.tool_name);
                return Ok((plan, true));
            }
        }

        let generator = self.generators.for_mode(state.mode);
        turn.record.planner_model = Some(generator.model_name(Phase::Planner));

        let examples: Vec<ExampleRecord> = self
            .examples
            .similar(query, self.config.pipeline.max_examples)
            .iter()
            .map(|record| self.policy.relexicalize(record, query))
            .collect();
        let context_json = serde_json::to_string_pretty(&state.context).unwrap_or_else(|_| "{}".to_string());
        let system = planner_system_prompt(
            &self.registry.catalogue(),
            &context_json,
            &examples,
            self.policy.known_programs(),
        );

        let raw = self.generate(generator, &system, query, Phase::Planner).await?;
        let plan = Plan::from_model_output(&raw).map_err(|reason| AnalystError::InvalidPlan {
            reason,
            raw: raw.chars().take(200).collect(),
        })?;
        log::info!("Planner selected {} with {:?}", plan.tool_name, plan.parameters);
        Ok((plan, false))
    }

    async fn generate(
        &self,
        generator: &Arc<dyn Generator>,
        system: &str,
        user: &str,
        phase: Phase,
    ) -> Result<String, AnalystError> {
        match tokio::time::timeout(self.generation_timeout, generator.generate(system, user, true, phase)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AnalystError::Timeout(self.generation_timeout)),
        }
    }

    fn conversational(&self, plan: Plan, analysis: &QueryAnalysis, turn: &mut Turn) -> AnalystResponse {
        let report = plan
            .parameters
            .get("response")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|reply| !reply.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| conversational_reply(&analysis.normalized.to_lowercase()).to_string());
        turn.record.plan = Some(plan);
        turn.stage = PipelineStage::Synthesized;
        AnalystResponse::text(report, Outcome::SuccessConversational)
    }

    /// Fill placeholder tokens the planner copied from few-shot examples
    /// with values from the current query, or drop the parameter.
    fn repair_placeholders(&self, query: &str, plan: &mut Plan, turn: &mut Turn) {
        let corrupted: Vec<(String, String)> = plan
            .parameters
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_str()
                    .filter(|text| contains_placeholder(text))
                    .map(|text| (key.clone(), text.to_string()))
            })
            .collect();
        if corrupted.is_empty() {
            return;
        }

        let mut only_corrupted = Map::new();
        for (key, text) in &corrupted {
            only_corrupted.insert(key.clone(), json!(text));
        }
        let repaired = self
            .policy
            .relexicalize(
                &ExampleRecord {
                    user_pattern: String::new(),
                    plan_template: Plan {
                        tool_name: plan.tool_name.clone(),
                        parameters: only_corrupted,
                    },
                },
                query,
            )
            .plan_template
            .parameters;

        let mut details = Vec::new();
        for (key, original) in corrupted {
            match repaired.get(&key) {
                Some(value) if !value.as_str().map(contains_placeholder).unwrap_or(false) => {
                    details.push(format!(
                        "parameter '{}' held placeholder '{}', filled with '{}'",
                        key,
                        original,
                        value_text(value).unwrap_or_default()
                    ));
                    plan.parameters.insert(key, value.clone());
                }
                _ => {
                    details.push(format!("parameter '{}' held placeholder '{}', dropped", key, original));
                    plan.parameters.remove(&key);
                }
            }
        }
        log::warn!("Corrupted plan repaired: {}", details.join("; "));
        turn.record.corruption_details = Some(details);
    }

    /// Broad search with the plan's values, or the query's content words.
    async fn fallback(&self, query: &str, plan: &Plan) -> Result<Option<ToolResult>, AnalystError> {
        let mut terms: Vec<String> = plan
            .scalar_parameters()
            .filter_map(|(_, value)| value_text(value))
            .filter(|text| !text.is_empty())
            .collect();
        if terms.is_empty() {
            terms = query
                .to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|word| word.len() > 1 && !FALLBACK_STOPWORDS.contains(word))
                .map(str::to_string)
                .collect();
        }
        if terms.is_empty() {
            return Ok(None);
        }

        let mut parameters = Map::new();
        parameters.insert("query".to_string(), json!(terms.join(" ")));
        log::info!("Primary tool {} found nothing, searching for '{}'", plan.tool_name, terms.join(" "));
        let result = self.registry.execute_tool(SEARCH_TOOL, &parameters).await?;
        match result.status() {
            ToolStatus::Success => Ok(Some(result)),
            ToolStatus::Empty => Ok(None),
            ToolStatus::Error => {
                log::warn!("Fallback search failed: {}", result.summary().unwrap_or_default());
                Ok(None)
            }
        }
    }

    /// Narrate non-empty rows: deterministic clarification for singular
    /// questions over several entities, otherwise a synthesizer call followed
    /// by the coverage and citation checks.
    async fn narrate(
        &self,
        query: &str,
        rows: Vec<Document>,
        outcome: Outcome,
        state: &mut SessionState,
        turn: &mut Turn,
    ) -> AnalystResponse {
        let rows = narrow_superlative(query, rows);
        if is_singular(query) && distinct_entities(&rows) > 1 {
            log::info!("Singular question matched {} entities, asking to clarify", distinct_entities(&rows));
            state.pending_clarification = Some(query.to_string());
            turn.stage = PipelineStage::Synthesized;
            return AnalystResponse::text(clarification_question(&rows), outcome);
        }

        let generator = self.generators.for_mode(state.mode);
        turn.record.synth_model = Some(generator.model_name(Phase::Synthesizer));

        let data_json = serde_json::to_string_pretty(&ToolResult::success(rows.clone()).to_value()).unwrap_or_default();
        let context_json = serde_json::to_string(&state.context).unwrap_or_else(|_| "{}".to_string());
        let user = synthesis_user_prompt(&data_json, &context_json, query);

        let raw = match self.generate(generator, SYNTHESIS_SYSTEM_PROMPT, &user, Phase::Synthesizer).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Synthesis failed: {}", e);
                turn.fail(format!("synthesis: {}", e));
                return AnalystResponse::text(SYNTHESIS_APOLOGY, Outcome::FailExecution);
            }
        };
        let Some((report, chart_data)) = parse_synthesis(&raw) else {
            turn.fail("synthesis: response had no report");
            return AnalystResponse::text(SYNTHESIS_APOLOGY, Outcome::FailExecution);
        };

        let report = if is_enumeration(query) {
            ensure_complete_listing(&report, &rows).0
        } else {
            report
        };
        turn.stage = PipelineStage::Synthesized;
        AnalystResponse {
            report: ensure_citation(&report, &rows),
            chart_data,
            outcome,
        }
    }
}

/// `{report, chart_data}` from synthesizer output. Plain prose without any
/// JSON object is taken as the report.
fn parse_synthesis(raw: &str) -> Option<(String, Vec<Value>)> {
    match repair_json(raw) {
        Some(object) => {
            let report = object
                .get("report")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|report| !report.is_empty())?
                .to_string();
            let chart_data = match object.get("chart_data") {
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            };
            Some((report, chart_data))
        }
        None => {
            let text = raw.trim();
            (!text.is_empty()).then(|| (text.to_string(), Vec::new()))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "pipeline panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_synthesis() {
        let (report, chart) =
            parse_synthesis(r#"Here you go: {"report": "Ana Cruz [students]", "chart_data": [{"label": "BSCS", "value": 1}]}"#)
                .unwrap();
        assert_eq!(report, "Ana Cruz [students]");
        assert_eq!(chart.len(), 1);

        assert_eq!(
            parse_synthesis("Ana Cruz is in BSCS."),
            Some(("Ana Cruz is in BSCS.".to_string(), Vec::new()))
        );
        assert_eq!(parse_synthesis(r#"{"chart_data": []}"#), None);
        assert_eq!(parse_synthesis("   "), None);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "pipeline panicked");
    }
}
