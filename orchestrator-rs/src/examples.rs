// orchestrator-rs/src/examples.rs
// Example bank of delexicalized solved queries.

use std::collections::HashSet;
use std::sync::RwLock;

use policy_engine::{normalize, placeholders_in};
use shared_types_rs::ExampleRecord;

pub const DEFAULT_BANK_CAPACITY: usize = 500;

/// Source of few-shot examples and fast-path templates.
pub trait ExampleBank: Send + Sync {
    /// Store a record. Returns false when an equal pattern is already known.
    fn add(&self, record: ExampleRecord) -> bool;

    /// Up to `limit` records most similar to `query`, best first.
    fn similar(&self, query: &str, limit: usize) -> Vec<ExampleRecord>;

    /// Every stored record, oldest first.
    fn all(&self) -> Vec<ExampleRecord>;
}

/// Bounded in-process bank. The oldest record is dropped when full.
pub struct InMemoryExampleBank {
    records: RwLock<Vec<ExampleRecord>>,
    capacity: usize,
}

impl Default for InMemoryExampleBank {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BANK_CAPACITY)
    }
}

impl InMemoryExampleBank {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn seeded(records: Vec<ExampleRecord>) -> Self {
        let bank = Self::default();
        for record in records {
            bank.add(record);
        }
        bank
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExampleBank for InMemoryExampleBank {
    fn add(&self, record: ExampleRecord) -> bool {
        // Patterns without a single slot only ever match themselves.
        if placeholders_in(&record.user_pattern).is_empty() {
            return false;
        }
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let pattern = normalize(&record.user_pattern).to_lowercase();
        if records
            .iter()
            .any(|known| normalize(&known.user_pattern).to_lowercase() == pattern)
        {
            return false;
        }
        if records.len() >= self.capacity {
            records.remove(0);
        }
        log::debug!("Learned example '{}'", record.user_pattern);
        records.push(record);
        true
    }

    fn similar(&self, query: &str, limit: usize) -> Vec<ExampleRecord> {
        if limit == 0 {
            return Vec::new();
        }
        let query_terms = terms(query);
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());

        let mut scored: Vec<(f64, usize)> = records
            .iter()
            .enumerate()
            .map(|(index, record)| (jaccard(&query_terms, &terms(&record.user_pattern)), index))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        // Newer records win ties.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));

        scored
            .into_iter()
            .take(limit)
            .map(|(_, index)| records[index].clone())
            .collect()
    }

    fn all(&self) -> Vec<ExampleRecord> {
        self.records.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn terms(text: &str) -> HashSet<String> {
    normalize(text)
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '{' || c == '}' || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types_rs::Plan;

    fn example(pattern: &str, tool: &str) -> ExampleRecord {
        ExampleRecord {
            user_pattern: pattern.to_string(),
            plan_template: Plan::new(tool).with_param("program", json!("{PROGRAM}")),
        }
    }

    #[test]
    fn test_add_rejects_duplicates_and_literals() {
        let bank = InMemoryExampleBank::default();
        assert!(bank.add(example("list all {PROGRAM} students", "find_people")));
        assert!(!bank.add(example("List all {PROGRAM} students", "find_people")));
        assert!(!bank.add(example("hello there", "answer_conversational_query")));
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let bank = InMemoryExampleBank::with_capacity(2);
        bank.add(example("list {PROGRAM} students", "find_people"));
        bank.add(example("curriculum of {PROGRAM}", "query_curriculum"));
        bank.add(example("schedule of {PROGRAM} first years", "get_person_schedule"));

        let patterns: Vec<String> = bank.all().into_iter().map(|r| r.user_pattern).collect();
        assert_eq!(patterns, vec!["curriculum of {PROGRAM}", "schedule of {PROGRAM} first years"]);
    }

    #[test]
    fn test_similar_ranks_by_overlap() {
        let bank = InMemoryExampleBank::seeded(vec![
            example("curriculum of {PROGRAM}", "query_curriculum"),
            example("list all {PROGRAM} students", "find_people"),
        ]);

        let similar = bank.similar("list all bsit students", 2);
        assert_eq!(similar[0].plan_template.tool_name, "find_people");
        assert!(bank.similar("weather today", 3).is_empty());
        assert!(bank.similar("list all", 0).is_empty());
    }
}
