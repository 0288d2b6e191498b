// shared-types-rs/src/context.rs
// Per-session conversation state and delexicalized example records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::plan::Plan;

/// Conversational state carried across turns of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    #[serde(default)]
    pub current_topic: String,
    #[serde(default)]
    pub active_filters: Map<String, Value>,
    #[serde(default)]
    pub mentioned_entities: Vec<String>,
}

impl ConversationContext {
    /// Merge confirmed filters into freshly extracted plan parameters.
    ///
    /// Filters win on overlapping keys. Returns the keys that were overridden.
    pub fn apply_filters(&self, parameters: &mut Map<String, Value>) -> Vec<String> {
        let mut overridden = Vec::new();
        for (key, value) in &self.active_filters {
            if is_blank(value) {
                continue;
            }
            match parameters.get(key) {
                Some(existing) if existing == value => {}
                Some(_) => {
                    overridden.push(key.clone());
                    parameters.insert(key.clone(), value.clone());
                }
                None => {
                    parameters.insert(key.clone(), value.clone());
                }
            }
        }
        overridden
    }

    /// Forget every confirmed filter (topic change).
    pub fn clear_filters(&mut self) {
        self.active_filters.clear();
    }

    /// Record a scalar filter; nested values are ignored.
    pub fn set_filter(&mut self, key: impl Into<String>, value: Value) {
        if matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) && !is_blank(&value) {
            self.active_filters.insert(key.into(), value);
        }
    }

    /// Append an entity unless an equal one (ignoring case) is already known.
    pub fn add_entity(&mut self, entity: &str) {
        let entity = entity.trim();
        if entity.is_empty() {
            return;
        }
        if !self
            .mentioned_entities
            .iter()
            .any(|known| known.eq_ignore_ascii_case(entity))
        {
            self.mentioned_entities.push(entity.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current_topic.is_empty()
            && self.active_filters.is_empty()
            && self.mentioned_entities.is_empty()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// A past query rewritten into a reusable pattern.
///
/// Placeholders in `user_pattern` use the same `{KEY}` tokens as the values
/// in `plan_template`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleRecord {
    pub user_pattern: String,
    pub plan_template: Plan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_filters_override_extracted_values() {
        let mut context = ConversationContext::default();
        context.set_filter("program", json!("BSCS"));

        let mut params = json!({"program": "BSIT", "year_level": 2})
            .as_object()
            .cloned()
            .unwrap();
        let overridden = context.apply_filters(&mut params);

        assert_eq!(params["program"], "BSCS");
        assert_eq!(params["year_level"], 2);
        assert_eq!(overridden, vec!["program".to_string()]);
    }

    #[test]
    fn cleared_filters_leave_extracted_values() {
        let mut context = ConversationContext::default();
        context.set_filter("program", json!("BSCS"));
        context.clear_filters();

        let mut params = json!({"program": "BSIT"}).as_object().cloned().unwrap();
        assert!(context.apply_filters(&mut params).is_empty());
        assert_eq!(params["program"], "BSIT");
    }

    #[test]
    fn set_filter_ignores_nested_and_blank_values() {
        let mut context = ConversationContext::default();
        context.set_filter("sections", json!(["A", "B"]));
        context.set_filter("program", json!("  "));
        context.set_filter("year_level", json!(3));
        assert_eq!(context.active_filters.len(), 1);
    }

    #[test]
    fn add_entity_deduplicates_case_insensitively() {
        let mut context = ConversationContext::default();
        context.add_entity("Juan Dela Cruz");
        context.add_entity("juan dela cruz");
        context.add_entity("Maria Santos");
        assert_eq!(context.mentioned_entities, vec!["Juan Dela Cruz", "Maria Santos"]);
    }
}
