// orchestrator-rs/src/context.rs
// Topic-change detection and post-turn context summarization.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use document_store::value_text;
use llm_client::{Generator, Phase};
use shared_types_rs::{repair_json, ConversationContext, ExecutionMode, Outcome, Plan};

use crate::prompts::{summarizer_user_prompt, SUMMARIZER_SYSTEM_PROMPT};

/// Parameter keys worth remembering as confirmed filters.
/// Role words ("students") are left out: they pick a collection, not a subset.
pub const FILTER_KEYS: &[&str] = &["program", "year_level", "section", "department"];

static FOLLOW_UP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(and|also|what about|how about|then|same)\b|\b(he|she|they|them|his|her|their|those|these|that one)\b")
        .expect("valid follow-up regex")
});

/// Decides whether a turn starts an unrelated topic, in which case the
/// session's active filters are cleared before they are merged into the plan.
pub trait TopicChangeDetector: Send + Sync {
    fn is_new_topic(
        &self,
        query: &str,
        context: &ConversationContext,
        last_tool: Option<&str>,
        plan: &Plan,
    ) -> bool;
}

/// Deterministic default.
///
/// A turn continues the current topic when it opens with a follow-up cue or
/// uses a pronoun, when it mentions an active filter value or a known
/// entity, or when it plans the same tool as the previous turn. Anything
/// else is a new topic. The first turn of a session is never a new topic.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordTopicDetector;

impl TopicChangeDetector for KeywordTopicDetector {
    fn is_new_topic(
        &self,
        query: &str,
        context: &ConversationContext,
        last_tool: Option<&str>,
        plan: &Plan,
    ) -> bool {
        let Some(last_tool) = last_tool else {
            return false;
        };
        let query = query.to_lowercase();
        if FOLLOW_UP_RE.is_match(query.trim()) {
            return false;
        }
        let mentions_filter = context
            .active_filters
            .values()
            .filter_map(value_text)
            .any(|value| mentions(&query, &value));
        let mentions_entity = context
            .mentioned_entities
            .iter()
            .any(|entity| mentions(&query, entity));
        if mentions_filter || mentions_entity {
            return false;
        }
        last_tool != plan.tool_name
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whole-word, case-insensitive occurrence of `value` in `query`.
pub(crate) fn mentions(query: &str, value: &str) -> bool {
    let needle = words(value);
    if needle.is_empty() {
        return false;
    }
    words(query)
        .windows(needle.len())
        .any(|window| window == needle.as_slice())
}

/// What the summarizer sees of a finished turn.
#[derive(Debug, Clone)]
pub struct TurnSummary<'a> {
    pub query: &'a str,
    pub plan: Option<&'a Plan>,
    pub people: &'a [String],
    pub outcome: Outcome,
    pub mode: ExecutionMode,
}

/// Rewrites the session context after each turn.
#[async_trait]
pub trait ContextSummarizer: Send + Sync {
    async fn summarize(&self, previous: &ConversationContext, turn: &TurnSummary<'_>) -> ConversationContext;
}

/// Keeps the planned tool as the topic, remembers filter values the user
/// actually typed and appends recognised people.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicSummarizer;

#[async_trait]
impl ContextSummarizer for HeuristicSummarizer {
    async fn summarize(&self, previous: &ConversationContext, turn: &TurnSummary<'_>) -> ConversationContext {
        heuristic_summary(previous, turn)
    }
}

fn heuristic_summary(previous: &ConversationContext, turn: &TurnSummary<'_>) -> ConversationContext {
    let mut context = previous.clone();
    let query = turn.query.to_lowercase();

    if let Some(plan) = turn.plan {
        context.current_topic = plan.tool_name.clone();
        for key in FILTER_KEYS {
            let Some(value) = plan.parameters.get(*key) else {
                continue;
            };
            if value_text(value).map(|text| mentions(&query, &text)).unwrap_or(false) {
                context.set_filter(*key, value.clone());
            }
        }
    }
    for person in turn.people {
        context.add_entity(person);
    }
    context
}

/// Asks the planner model for the new context, falling back to the
/// heuristic when the call fails or returns no usable JSON.
pub struct ModelSummarizer {
    online: Arc<dyn Generator>,
    offline: Arc<dyn Generator>,
    timeout: Duration,
}

impl ModelSummarizer {
    pub fn new(online: Arc<dyn Generator>, offline: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self {
            online,
            offline,
            timeout,
        }
    }

    fn generator(&self, mode: ExecutionMode) -> &Arc<dyn Generator> {
        match mode {
            ExecutionMode::Online => &self.online,
            ExecutionMode::Offline => &self.offline,
        }
    }
}

#[async_trait]
impl ContextSummarizer for ModelSummarizer {
    async fn summarize(&self, previous: &ConversationContext, turn: &TurnSummary<'_>) -> ConversationContext {
        let fallback = heuristic_summary(previous, turn);
        let previous_json = serde_json::to_string(previous).unwrap_or_default();
        let plan_json = turn
            .plan
            .and_then(|plan| serde_json::to_string(plan).ok())
            .unwrap_or_else(|| "null".to_string());
        let user = summarizer_user_prompt(&previous_json, turn.query, &plan_json);

        let generation = tokio::time::timeout(
            self.timeout,
            self.generator(turn.mode)
                .generate(SUMMARIZER_SYSTEM_PROMPT, &user, true, Phase::Summarizer),
        )
        .await;

        let raw = match generation {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                log::warn!("Context summarizer failed, using heuristic: {}", e);
                return fallback;
            }
            Err(_) => {
                log::warn!("Context summarizer timed out, using heuristic");
                return fallback;
            }
        };

        match repair_json(&raw).map(Value::Object).map(serde_json::from_value::<ConversationContext>) {
            Some(Ok(mut context)) => {
                let filters = std::mem::take(&mut context.active_filters);
                for (key, value) in filters {
                    context.set_filter(key, value);
                }
                context
            }
            _ => {
                log::warn!("Context summarizer returned no usable JSON, using heuristic");
                fallback
            }
        }
    }
}
