// orchestrator-rs/src/narration.rs
// Deterministic checks applied around the synthesizer: superlative
// narrowing, singular-query clarification, enumeration coverage and
// source citation.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use document_store::{value_text, Document};
use tool_registry::SOURCE_FIELD;

use crate::context::mentions;

/// Fields that identify a person or record and must stay out of a
/// clarification question.
const IDENTIFYING_FIELDS: &[&str] = &[
    "_id",
    "id",
    "pdm_id",
    "student_id",
    "faculty_id",
    "staff_id",
    "name",
    "full_name",
    "first_name",
    "middle_name",
    "last_name",
    "student_name",
    "owner_name",
    "email",
    "contact",
    "contact_number",
    "address",
    SOURCE_FIELD,
];

const ID_FIELDS: &[&str] = &["pdm_id", "student_id", "faculty_id", "staff_id", "id", "_id"];
const NAME_FIELDS: &[&str] = &["full_name", "name", "student_name", "owner_name"];
/// Fields that describe a record when it has no name.
const TITLE_FIELDS: &[&str] = &["subject", "course_code", "title", "program"];
const DETAIL_FIELDS: &[&str] = &["position", "department", "program", "year_level", "section"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Max,
    Min,
}

/// Superlative word, the record field it ranks and which end wins.
pub const SUPERLATIVES: &[(&str, &str, Extreme)] = &[
    ("tallest", "height", Extreme::Max),
    ("shortest", "height", Extreme::Min),
    ("oldest", "age", Extreme::Max),
    ("youngest", "age", Extreme::Min),
    ("heaviest", "weight", Extreme::Max),
    ("lightest", "weight", Extreme::Min),
    // Lower GWA is better.
    ("smartest", "gwa", Extreme::Min),
];

static ENUMERATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(all|list|every|each|how many|count|enumerate)\b").expect("valid enumeration regex")
});

static SINGULAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(who is|who's|who was|whose|which \w+ (is|was|has))\b").expect("valid singular regex")
});

/// The query asks for every matching item or a count.
pub fn is_enumeration(query: &str) -> bool {
    ENUMERATION_RE.is_match(query)
}

pub fn superlative_in(query: &str) -> Option<(&'static str, &'static str, Extreme)> {
    SUPERLATIVES
        .iter()
        .copied()
        .find(|(word, _, _)| mentions(query, word))
}

/// The query grammatically refers to exactly one entity.
pub fn is_singular(query: &str) -> bool {
    !is_enumeration(query) && (SINGULAR_RE.is_match(query) || superlative_in(query).is_some())
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Keep only the rows tied at the extreme of the superlative's field.
/// Rows are returned unchanged when the query has no superlative or no row
/// carries a numeric value for it.
pub fn narrow_superlative(query: &str, rows: Vec<Document>) -> Vec<Document> {
    let Some((_, field, extreme)) = superlative_in(query) else {
        return rows;
    };
    let values: Vec<Option<f64>> = rows.iter().map(|row| row.get(field).and_then(numeric)).collect();
    let best = values.iter().flatten().copied().reduce(|a, b| match extreme {
        Extreme::Max => a.max(b),
        Extreme::Min => a.min(b),
    });
    let Some(best) = best else {
        return rows;
    };
    rows.into_iter()
        .zip(values)
        .filter(|(_, value)| matches!(value, Some(v) if (v - best).abs() < 1e-9))
        .map(|(row, _)| row)
        .collect()
}

fn first_text(row: &Document, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find_map(|field| row.get(*field).and_then(value_text))
        .filter(|text| !text.is_empty())
}

fn entity_key(row: &Document) -> String {
    if let Some(id) = first_text(row, ID_FIELDS) {
        return format!("id:{}", id.to_lowercase());
    }
    if let Some(name) = first_text(row, NAME_FIELDS) {
        return format!("name:{}", name.to_lowercase());
    }
    Value::Object(row.clone()).to_string()
}

/// Number of distinct entities among `rows`.
pub fn distinct_entities(rows: &[Document]) -> usize {
    rows.iter().map(entity_key).collect::<HashSet<_>>().len()
}

/// Non-identifying fields whose values differ between rows, in first-seen order.
pub fn distinguishing_attributes(rows: &[Document]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !IDENTIFYING_FIELDS.contains(&key.as_str()) && !fields.contains(key) {
                fields.push(key.clone());
            }
        }
    }
    fields
        .into_iter()
        .filter(|field| {
            let rendered: HashSet<String> = rows
                .iter()
                .map(|row| match row.get(field) {
                    Some(value) => value_text(value).unwrap_or_else(|| value.to_string()).to_lowercase(),
                    None => String::new(),
                })
                .collect();
            rendered.len() > 1
        })
        .collect()
}

fn readable(field: &str) -> String {
    field.replace('_', " ")
}

/// Clarifying question for a singular query that matched several entities.
/// Names only the attributes that tell the candidates apart.
pub fn clarification_question(rows: &[Document]) -> String {
    let count = distinct_entities(rows);
    let attributes = distinguishing_attributes(rows);
    if attributes.is_empty() {
        return format!(
            "I found {} matching records with the same details. Could you add something more specific, such as a program, year level or section?",
            count
        );
    }
    let attributes: Vec<String> = attributes.iter().map(|a| readable(a)).collect();
    format!(
        "I found {} matching records. Which one do you mean? They differ by {}.",
        count,
        attributes.join(", ")
    )
}

fn source_tag(row: &Document) -> Option<String> {
    row.get(SOURCE_FIELD).and_then(value_text).map(|s| format!("[{}]", s))
}

/// One-line description of a record for numbered listings.
pub fn row_label(row: &Document) -> String {
    let mut label = match first_text(row, NAME_FIELDS).or_else(|| first_text(row, TITLE_FIELDS)) {
        Some(title) => {
            let details: Vec<String> = DETAIL_FIELDS
                .iter()
                .filter_map(|field| {
                    row.get(*field)
                        .and_then(value_text)
                        .filter(|text| !text.is_empty() && text != &title)
                        .map(|text| format!("{}: {}", readable(field), text))
                })
                .collect();
            if details.is_empty() {
                title
            } else {
                format!("{} ({})", title, details.join(", "))
            }
        }
        None => row
            .iter()
            .filter(|(key, _)| key.as_str() != SOURCE_FIELD)
            .filter_map(|(key, value)| value_text(value).map(|text| format!("{}: {}", readable(key), text)))
            .take(4)
            .collect::<Vec<_>>()
            .join(", "),
    };
    if let Some(tag) = source_tag(row) {
        label.push(' ');
        label.push_str(&tag);
    }
    label
}

/// Full numbered listing of `rows`.
pub fn complete_listing(rows: &[Document]) -> String {
    let mut out = format!("Here are all {} matching records:", rows.len());
    for (i, row) in rows.iter().enumerate() {
        out.push_str(&format!("\n{}. {}", i + 1, row_label(row)));
    }
    out
}

/// Text a report must mention for `row` to count as covered: its name, else
/// its title, else its first non-source value.
fn row_identity(row: &Document) -> Option<String> {
    first_text(row, NAME_FIELDS)
        .or_else(|| first_text(row, TITLE_FIELDS))
        .or_else(|| {
            row.iter()
                .filter(|(key, _)| key.as_str() != SOURCE_FIELD)
                .find_map(|(_, value)| value_text(value).filter(|text| !text.is_empty()))
        })
}

/// First occurrence of each entity, in order.
pub fn distinct_rows(rows: &[Document]) -> Vec<Document> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| seen.insert(entity_key(row)))
        .cloned()
        .collect()
}

/// Replace `report` with a complete listing of the distinct rows when it
/// leaves any of them out. Returns the report and whether it was replaced.
pub fn ensure_complete_listing(report: &str, rows: &[Document]) -> (String, bool) {
    let rows = distinct_rows(rows);
    let identities: Vec<String> = rows.iter().filter_map(row_identity).collect();
    if identities.is_empty() {
        return (report.to_string(), false);
    }
    let missing = identities
        .iter()
        .filter(|identity| !mentions(report, identity))
        .count();
    if missing == 0 {
        return (report.to_string(), false);
    }
    log::info!("Synthesized report omitted {} of {} records, listing all", missing, rows.len());
    (complete_listing(&rows), true)
}

/// Append a `Sources:` line when the report cites none of the collections
/// the rows came from.
pub fn ensure_citation(report: &str, rows: &[Document]) -> String {
    let mut sources: Vec<String> = Vec::new();
    for tag in rows.iter().filter_map(source_tag) {
        if !sources.contains(&tag) {
            sources.push(tag);
        }
    }
    if sources.is_empty() || sources.iter().any(|tag| report.contains(tag.as_str())) {
        return report.to_string();
    }
    format!("{}\n\nSources: {}", report.trim_end(), sources.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn students() -> Vec<Document> {
        vec![
            doc(json!({"student_id": "1", "full_name": "Ana Cruz", "height": 180, "program": "BSCS", "section": "A", "source_collection": "students"})),
            doc(json!({"student_id": "2", "full_name": "Ben Lim", "height": "180", "program": "BSIT", "section": "A", "source_collection": "students"})),
            doc(json!({"student_id": "3", "full_name": "Cara Sy", "height": 165, "program": "BSCS", "section": "B", "source_collection": "students"})),
        ]
    }

    #[test]
    fn test_singular_and_enumeration_queries() {
        assert!(is_singular("who is the tallest student"));
        assert!(is_singular("Who is Juan?"));
        assert!(is_singular("the youngest faculty member"));
        assert!(!is_singular("list all bscs students"));
        assert!(!is_singular("who are the tallest students in every section"));
        assert!(is_enumeration("how many faculty are there"));
    }

    #[test]
    fn test_superlative_keeps_ties() {
        let narrowed = narrow_superlative("who is the tallest student", students());
        assert_eq!(narrowed.len(), 2);
        assert_eq!(distinct_entities(&narrowed), 2);

        let untouched = narrow_superlative("who is ana", students());
        assert_eq!(untouched.len(), 3);
    }

    #[test]
    fn test_clarification_names_no_one() {
        let narrowed = narrow_superlative("who is the tallest student", students());
        let question = clarification_question(&narrowed);
        assert_eq!(question, "I found 2 matching records. Which one do you mean? They differ by program.");
        assert!(!question.contains("Ana") && !question.contains("Ben"));
    }

    #[test]
    fn test_duplicate_rows_count_once() {
        let mut rows = students();
        rows.push(rows[0].clone());
        assert_eq!(distinct_entities(&rows), 3);
    }

    #[test]
    fn test_incomplete_listing_is_replaced() {
        let rows = students();
        let (report, replaced) = ensure_complete_listing("Ana Cruz and Ben Lim are enrolled.", &rows);
        assert!(replaced);
        assert!(report.starts_with("Here are all 3 matching records:"));
        assert!(report.contains("3. Cara Sy (program: BSCS, section: B) [students]"));

        let full = "Ana Cruz, Ben Lim and Cara Sy [students]";
        assert_eq!(ensure_complete_listing(full, &rows), (full.to_string(), false));
    }

    #[test]
    fn test_listing_without_names_checks_titles() {
        let rows: Vec<Document> = (1..=6)
            .map(|i| doc(json!({"subject": format!("Subject {}", i), "program": "BSCS", "source_collection": "curriculum"})))
            .collect();
        let (report, replaced) =
            ensure_complete_listing("The BSCS curriculum includes Subject 1 and Subject 2 [curriculum].", &rows);
        assert!(replaced);
        assert!(report.starts_with("Here are all 6 matching records:"));
        assert!(report.contains("6. Subject 6 (program: BSCS) [curriculum]"));

        let full = "Subject 1, Subject 2, Subject 3, Subject 4, Subject 5 and Subject 6 [curriculum]";
        assert!(!ensure_complete_listing(full, &rows).1);
    }

    #[test]
    fn test_prefix_name_is_not_coverage() {
        let rows = vec![
            doc(json!({"student_id": "1", "full_name": "Ana Lim"})),
            doc(json!({"student_id": "2", "full_name": "Ana Lima"})),
        ];
        let (report, replaced) = ensure_complete_listing("The only match is Ana Lima [students].", &rows);
        assert!(replaced);
        assert!(report.contains("1. Ana Lim"));

        // "Student 10".."Student 12" do not cover "Student 1"
        let numbered: Vec<Document> = (1..=12)
            .map(|i| doc(json!({"full_name": format!("Student {}", i)})))
            .collect();
        let all_but_one = (1..=12)
            .filter(|i| *i != 1)
            .map(|i| format!("Student {}", i))
            .collect::<Vec<_>>()
            .join(", ");
        assert!(ensure_complete_listing(&all_but_one, &numbered).1);
    }

    #[test]
    fn test_listing_counts_each_entity_once() {
        let mut rows = students();
        rows.push(rows[2].clone());
        let (report, replaced) = ensure_complete_listing("Ana Cruz and Ben Lim [students]", &rows);
        assert!(replaced);
        assert!(report.starts_with("Here are all 3 matching records:"));
        assert!(!report.contains("\n4."));
    }

    #[test]
    fn test_citation_appended_once() {
        let rows = students();
        assert_eq!(
            ensure_citation("Ana Cruz is in BSCS.", &rows),
            "Ana Cruz is in BSCS.\n\nSources: [students]"
        );
        assert_eq!(ensure_citation("Ana Cruz is in BSCS [students].", &rows), "Ana Cruz is in BSCS [students].");
        assert_eq!(ensure_citation("Nothing", &[]), "Nothing");
    }

    #[test]
    fn test_row_label_without_name() {
        let row = doc(json!({"subject": "Data Structures", "program": "BSCS", "year_level": 2, "source_collection": "curriculum"}));
        assert_eq!(row_label(&row), "Data Structures (program: BSCS, year level: 2) [curriculum]");
    }
}
