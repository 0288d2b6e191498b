// policy-engine-rs/src/delex.rs
// Delexicalization of solved queries into reusable example records, and the
// reverse direction: relexicalization and template matching.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use serde_json::{Map, Value};
use shared_types_rs::{ExampleRecord, Plan};

use crate::annotation::{EntityLabel, TokenAnnotation};

/// Placeholder for names found by entity recognition rather than parameters.
pub const PERSON_SLOT: &str = "ENTITY_PERSON";
/// Placeholder for known program codes found by vocabulary matching.
pub const PROGRAM_SLOT: &str = "ENTITY_PROGRAM";

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Z0-9_]+)\}").expect("valid placeholder regex"));

/// `{KEY_UPPER}` for a parameter key.
pub fn placeholder_for(key: &str) -> String {
    format!("{{{}}}", key.to_uppercase())
}

/// Placeholder names (without braces) present in `text`.
pub fn placeholders_in(text: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

pub fn contains_placeholder(text: &str) -> bool {
    PLACEHOLDER_RE.is_match(text)
}

/// Textual form of a scalar value; `None` for null, lists and mappings.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn value_regex(value: &str) -> Option<Regex> {
    let escaped: Vec<String> = value.split_whitespace().map(regex::escape).collect();
    if escaped.is_empty() {
        return None;
    }
    let starts_word = value.chars().next().map(is_word_char).unwrap_or(false);
    let ends_word = value.chars().last().map(is_word_char).unwrap_or(false);
    let pattern = format!(
        "(?i){}{}{}",
        if starts_word { r"\b" } else { "" },
        escaped.join(r"\s+"),
        if ends_word { r"\b" } else { "" }
    );
    Regex::new(&pattern).ok()
}

/// Apply `re` only to the text between existing placeholders.
fn replace_outside_placeholders(text: &str, re: &Regex, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in PLACEHOLDER_RE.find_iter(text) {
        out.push_str(&re.replace_all(&text[last..m.start()], NoExpand(replacement)));
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&re.replace_all(&text[last..], NoExpand(replacement)));
    out
}

/// Whole-word, case-insensitive replacement of `value` by `replacement`.
pub fn replace_value(text: &str, value: &str, replacement: &str) -> String {
    match value_regex(value) {
        Some(re) => replace_outside_placeholders(text, &re, replacement),
        None => text.replace(value, replacement),
    }
}

/// Rewrite a solved query and its plan into an example record.
///
/// Every non-empty scalar parameter becomes `{KEY}` in both the plan copy and
/// the query text (whole word, case-insensitive, longest value first).
/// Lists, mappings and empty strings are left untouched. An empty parameter
/// mapping returns the inputs unchanged.
pub fn delexicalize(query: &str, plan: &Plan) -> ExampleRecord {
    if plan.parameters.is_empty() {
        return ExampleRecord {
            user_pattern: query.to_string(),
            plan_template: plan.clone(),
        };
    }

    let mut slots: Vec<(String, String, String)> = plan
        .parameters
        .iter()
        .filter_map(|(key, value)| {
            let text = scalar_text(value)?;
            if text.is_empty() {
                return None;
            }
            Some((key.clone(), text, placeholder_for(key)))
        })
        .collect();
    slots.sort_by(|a, b| b.1.chars().count().cmp(&a.1.chars().count()));

    // Parameters sharing a value share the first key's placeholder, so the
    // pattern can bind every slot of the template.
    let mut seen: HashMap<String, String> = HashMap::new();
    for (_, text, placeholder) in slots.iter_mut() {
        match seen.get(&text.to_lowercase()) {
            Some(shared) => *placeholder = shared.clone(),
            None => {
                seen.insert(text.to_lowercase(), placeholder.clone());
            }
        }
    }

    let mut user_pattern = query.to_string();
    let mut plan_template = plan.clone();
    for (key, text, placeholder) in &slots {
        user_pattern = replace_value(&user_pattern, text, placeholder);
        plan_template
            .parameters
            .insert(key.clone(), Value::String(placeholder.clone()));
    }

    ExampleRecord {
        user_pattern,
        plan_template,
    }
}

/// Consecutive PERSON tokens joined into names.
pub fn person_spans(tokens: &[TokenAnnotation]) -> Vec<String> {
    let mut spans = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for t in tokens {
        if t.entity == Some(EntityLabel::Person) {
            current.push(&t.token);
        } else if !current.is_empty() {
            spans.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        spans.push(current.join(" "));
    }
    spans
}

/// Known program codes mentioned in `text`, in vocabulary spelling.
pub fn program_mentions(text: &str, known_programs: &[String]) -> Vec<String> {
    known_programs
        .iter()
        .filter(|program| {
            value_regex(program)
                .map(|re| re.is_match(text))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Secondary pass: replace recognised people and programs that the
/// parameter pass did not already cover.
pub fn delexicalize_entities(pattern: &str, people: &[String], programs: &[String]) -> String {
    let mut out = pattern.to_string();
    let mut values: Vec<(&String, String)> = programs
        .iter()
        .map(|p| (p, format!("{{{}}}", PROGRAM_SLOT)))
        .chain(people.iter().map(|p| (p, format!("{{{}}}", PERSON_SLOT))))
        .collect();
    values.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
    for (value, placeholder) in values {
        out = replace_value(&out, value, &placeholder);
    }
    out
}

/// Fill placeholders from `values` (keys without braces). Unknown
/// placeholders are left in place.
pub fn relexicalize(record: &ExampleRecord, values: &Map<String, Value>) -> ExampleRecord {
    let fill = |text: &str| -> String {
        PLACEHOLDER_RE
            .replace_all(text, |caps: &regex::Captures| {
                values
                    .get(&caps[1])
                    .and_then(scalar_text)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    };

    let mut plan_template = record.plan_template.clone();
    for value in plan_template.parameters.values_mut() {
        let Some(text) = value.as_str().map(str::to_string) else {
            continue;
        };
        match whole_placeholder(&text).and_then(|key| values.get(&key)) {
            Some(replacement) => *value = replacement.clone(),
            None => *value = Value::String(fill(&text)),
        }
    }

    ExampleRecord {
        user_pattern: fill(&record.user_pattern),
        plan_template,
    }
}

fn whole_placeholder(text: &str) -> Option<String> {
    let caps = PLACEHOLDER_RE.captures(text)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == text.len() {
        caps.get(1).map(|m| m.as_str().to_string())
    } else {
        None
    }
}

/// Result of matching a query against a stored pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMatch {
    pub plan: Plan,
    pub captures: HashMap<String, String>,
}

fn literal_regex(literal: &str) -> String {
    let mut out = String::new();
    let mut in_space = false;
    for c in literal.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push_str(r"\s+");
                in_space = true;
            }
        } else {
            in_space = false;
            out.push_str(&regex::escape(&c.to_string()));
        }
    }
    out
}

fn strip_terminal_punctuation(text: &str) -> &str {
    text.trim().trim_end_matches(['?', '.', '!']).trim_end()
}

fn typed_capture(text: &str) -> Value {
    match text.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(text.to_string()),
    }
}

/// Match `query` against `record.user_pattern`, treating placeholders as
/// wildcards, and rebuild a concrete plan from the captured values.
///
/// Fails when a placeholder captures two different values or when the plan
/// template needs a placeholder the pattern does not bind.
pub fn match_template(record: &ExampleRecord, query: &str) -> Option<TemplateMatch> {
    let pattern_text = strip_terminal_punctuation(&record.user_pattern);
    let mut pattern = String::from(r"(?i)^\s*");
    let mut keys = Vec::new();
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(pattern_text) {
        let whole = caps.get(0)?;
        pattern.push_str(&literal_regex(&pattern_text[last..whole.start()]));
        pattern.push_str("(.+?)");
        keys.push(caps[1].to_string());
        last = whole.end();
    }
    pattern.push_str(&literal_regex(&pattern_text[last..]));
    pattern.push_str(r"\s*$");

    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(strip_terminal_punctuation(query))?;

    let mut captures: HashMap<String, String> = HashMap::new();
    for (i, key) in keys.iter().enumerate() {
        let text = caps.get(i + 1)?.as_str().trim().to_string();
        if text.is_empty() {
            return None;
        }
        match captures.get(key) {
            Some(existing) if !existing.eq_ignore_ascii_case(&text) => return None,
            Some(_) => {}
            None => {
                captures.insert(key.clone(), text);
            }
        }
    }

    let mut plan = record.plan_template.clone();
    for value in plan.parameters.values_mut() {
        let Some(text) = value.as_str().map(str::to_string) else {
            continue;
        };
        if placeholders_in(&text).iter().any(|k| !captures.contains_key(k)) {
            return None;
        }
        *value = match whole_placeholder(&text) {
            Some(key) => typed_capture(&captures[&key]),
            None => Value::String(
                PLACEHOLDER_RE
                    .replace_all(&text, |c: &regex::Captures| captures[&c[1]].clone())
                    .into_owned(),
            ),
        };
    }

    Some(TemplateMatch { plan, captures })
}
