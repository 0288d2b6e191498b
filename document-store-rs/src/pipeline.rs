// document-store-rs/src/pipeline.rs
// In-process evaluation of aggregation pipelines.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

use crate::Document;

/// Record predicate. Paths are dot separated (`plan.parameters.program`).
///
/// When the addressed value is an array, a predicate matches if any element
/// matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    /// Present, not null, not an empty string and not an empty array.
    NotEmpty(String),
    Equals(String, Value),
    /// Case-insensitive comparison of the textual rendering.
    EqualsIgnoreCase(String, String),
    /// Case-insensitive substring of the textual rendering.
    Contains(String, String),
    /// Greater than or equal. Numbers compare numerically, RFC 3339 strings
    /// as instants, other strings lexically.
    AtLeast(String, Value),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    Field(String),
    /// Lowercased text of the value, so `"BSCS"`/`"bscs"` and `2`/`"2"` collapse.
    LowercaseText(String),
    /// Single group over every record.
    Constant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count,
    Sum(String),
    Avg(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    /// One output record per array element; scalars pass through, missing,
    /// null and empty arrays are dropped.
    Unwind(String),
    /// Output records are `{"_id": key, <name>: <accumulated>}`.
    Group {
        key: GroupKey,
        accumulators: Vec<(String, Accumulator)>,
    },
    Sort {
        field: String,
        descending: bool,
    },
    Limit(usize),
}

pub fn run_pipeline(mut docs: Vec<Document>, stages: &[Stage]) -> Vec<Document> {
    for stage in stages {
        docs = match stage {
            Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
            Stage::Unwind(path) => unwind(docs, path),
            Stage::Group { key, accumulators } => group(docs, key, accumulators),
            Stage::Sort { field, descending } => {
                docs.sort_by(|a, b| {
                    let ord = compare_values(lookup_path(a, field), lookup_path(b, field));
                    if *descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
                docs
            }
            Stage::Limit(n) => {
                docs.truncate(*n);
                docs
            }
        };
    }
    docs
}

impl Filter {
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::NotEmpty(path) => lookup_path(doc, path).map(|v| !is_empty_value(v)).unwrap_or(false),
            Filter::Equals(path, expected) => any_element(doc, path, |v| {
                v == expected || (value_text(v).is_some() && value_text(v) == value_text(expected))
            }),
            Filter::EqualsIgnoreCase(path, expected) => any_element(doc, path, |v| {
                value_text(v)
                    .map(|text| text.eq_ignore_ascii_case(expected.trim()))
                    .unwrap_or(false)
            }),
            Filter::Contains(path, needle) => {
                let needle = needle.trim().to_lowercase();
                any_element(doc, path, |v| {
                    value_text(v)
                        .map(|text| text.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            }
            Filter::AtLeast(path, bound) => any_element(doc, path, |v| {
                !v.is_null() && compare_values(Some(v), Some(bound)) != Ordering::Less
            }),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

fn any_element(doc: &Document, path: &str, pred: impl Fn(&Value) -> bool) -> bool {
    match lookup_path(doc, path) {
        Some(Value::Array(items)) => items.iter().any(&pred),
        Some(value) => pred(value),
        None => false,
    }
}

/// Resolve a dot-separated path inside a record.
pub fn lookup_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn set_path(doc: &mut Document, path: &str, value: Value) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else {
        return;
    };
    let mut current = doc;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry.as_object_mut() {
            Some(next) => current = next,
            None => return,
        }
    }
    current.insert(last.to_string(), value);
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Textual rendering used for case/number-insensitive comparisons.
///
/// Integral floats render without a fraction so `2.0` and `"2"` agree.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(number_text(n)),
        _ => None,
    }
}

fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Total order over optional JSON values: missing/null first, then booleans,
/// numbers, strings (instants when both parse), everything else last.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            _ => 4,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => match (parse_instant(x), parse_instant(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn unwind(docs: Vec<Document>, path: &str) -> Vec<Document> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        match lookup_path(&doc, path).cloned() {
            Some(Value::Array(items)) => {
                for item in items {
                    let mut copy = doc.clone();
                    set_path(&mut copy, path, item);
                    out.push(copy);
                }
            }
            None | Some(Value::Null) => {}
            Some(_) => out.push(doc),
        }
    }
    out
}

#[derive(Default)]
struct GroupState {
    key: Value,
    count: u64,
    sums: HashMap<String, (f64, u64)>,
}

fn group(docs: Vec<Document>, key: &GroupKey, accumulators: &[(String, Accumulator)]) -> Vec<Document> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, GroupState> = HashMap::new();

    for doc in &docs {
        let key_value = match key {
            GroupKey::Field(path) => lookup_path(doc, path).cloned().unwrap_or(Value::Null),
            GroupKey::LowercaseText(path) => lookup_path(doc, path)
                .and_then(value_text)
                .map(|t| Value::String(t.to_lowercase()))
                .unwrap_or(Value::Null),
            GroupKey::Constant => Value::Null,
        };
        let identity = key_value.to_string();
        let state = groups.entry(identity.clone()).or_insert_with(|| {
            order.push(identity);
            GroupState {
                key: key_value.clone(),
                ..GroupState::default()
            }
        });
        state.count += 1;
        for (name, acc) in accumulators {
            if let Accumulator::Sum(path) | Accumulator::Avg(path) = acc {
                if let Some(n) = lookup_path(doc, path).and_then(Value::as_f64) {
                    let slot = state.sums.entry(name.clone()).or_insert((0.0, 0));
                    slot.0 += n;
                    slot.1 += 1;
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|identity| groups.remove(&identity))
        .map(|state| {
            let mut out = Map::new();
            out.insert("_id".to_string(), state.key.clone());
            for (name, acc) in accumulators {
                let value = match acc {
                    Accumulator::Count => Value::from(state.count),
                    Accumulator::Sum(_) => {
                        let (sum, _) = state.sums.get(name).copied().unwrap_or((0.0, 0));
                        Number::from_f64(sum).map(Value::Number).unwrap_or(Value::Null)
                    }
                    Accumulator::Avg(_) => match state.sums.get(name) {
                        Some((sum, n)) if *n > 0 => Number::from_f64(sum / *n as f64)
                            .map(Value::Number)
                            .unwrap_or(Value::Null),
                        _ => Value::Null,
                    },
                };
                out.insert(name.clone(), value);
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(values: Value) -> Vec<Document> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn unwind_keeps_scalars_and_drops_missing() {
        let input = docs(json!([
            {"p": {"program": ["BSCS", "BSIT"]}},
            {"p": {"program": "bscs"}},
            {"p": {"program": null}},
            {"p": {}},
            {"p": {"program": []}}
        ]));
        let out = run_pipeline(input, &[Stage::Unwind("p.program".into())]);
        let values: Vec<&Value> = out.iter().map(|d| lookup_path(d, "p.program").unwrap()).collect();
        assert_eq!(values, vec![&json!("BSCS"), &json!("BSIT"), &json!("bscs")]);
    }

    #[test]
    fn group_normalizes_case_and_numbers() {
        let input = docs(json!([
            {"v": "BSCS"}, {"v": "bscs"}, {"v": 2}, {"v": "2"}, {"v": 2.0}, {"v": "BSIT"}
        ]));
        let out = run_pipeline(
            input,
            &[
                Stage::Group {
                    key: GroupKey::LowercaseText("v".into()),
                    accumulators: vec![("count".into(), Accumulator::Count)],
                },
                Stage::Sort {
                    field: "count".into(),
                    descending: true,
                },
            ],
        );
        assert_eq!(out.len(), 3);
        assert_eq!(out[0]["_id"], "2");
        assert_eq!(out[0]["count"], 3);
        assert_eq!(out[1]["_id"], "bscs");
        assert_eq!(out[1]["count"], 2);
    }

    #[test]
    fn group_averages_numeric_fields() {
        let input = docs(json!([
            {"outcome": "SUCCESS_DIRECT", "t": 1.0},
            {"outcome": "SUCCESS_DIRECT", "t": 3.0},
            {"outcome": "FAIL_EMPTY", "t": 2.5},
            {"outcome": "FAIL_EMPTY"}
        ]));
        let out = run_pipeline(
            input,
            &[Stage::Group {
                key: GroupKey::Field("outcome".into()),
                accumulators: vec![
                    ("count".into(), Accumulator::Count),
                    ("avg_t".into(), Accumulator::Avg("t".into())),
                ],
            }],
        );
        assert_eq!(out[0]["_id"], "SUCCESS_DIRECT");
        assert_eq!(out[0]["avg_t"], 2.0);
        assert_eq!(out[1]["count"], 2);
        assert_eq!(out[1]["avg_t"], 2.5);
    }

    #[test]
    fn at_least_compares_timestamps_as_instants() {
        let input = docs(json!([
            {"timestamp": "2026-10-01T00:00:00Z"},
            {"timestamp": "2026-10-18T12:00:00+08:00"},
            {"timestamp": null}
        ]));
        let filter = Filter::AtLeast("timestamp".into(), json!("2026-10-10T00:00:00Z"));
        let out = run_pipeline(input, &[Stage::Match(filter)]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn filters_match_array_elements_and_ignore_case() {
        let doc = docs(json!([{"name": "Juan Dela Cruz", "sections": ["A", "B"], "year_level": 2}]))
            .remove(0);
        assert!(Filter::Contains("name".into(), "dela".into()).matches(&doc));
        assert!(Filter::EqualsIgnoreCase("sections".into(), "b".into()).matches(&doc));
        assert!(Filter::Equals("year_level".into(), json!("2")).matches(&doc));
        assert!(!Filter::NotEmpty("missing".into()).matches(&doc));
        assert!(Filter::Or(vec![Filter::NotEmpty("missing".into()), Filter::All]).matches(&doc));
    }
}
