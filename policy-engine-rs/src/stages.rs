// policy-engine-rs/src/stages.rs
// Structural stages over an annotated query.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::annotation::{DependencyRole, PartOfSpeech, TokenAnnotation};

/// Role and record nouns that are meaningless without a referent.
pub static TARGET_REQUIRED_NOUNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "adviser", "advisor", "instructor", "professor", "schedule", "grades", "grade", "gwa",
        "profile", "record", "records", "timetable",
    ]
    .iter()
    .cloned()
    .collect()
});

/// Dependents that pin a target noun to a referent.
pub const SAVING_ROLES: &[DependencyRole] = &[
    DependencyRole::Pobj,
    DependencyRole::Dobj,
    DependencyRole::Compound,
    DependencyRole::Nsubj,
    DependencyRole::Poss,
    DependencyRole::Amod,
];

/// Trim and collapse internal whitespace.
pub fn normalize(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if the first word is a wh-word or an auxiliary verb.
pub fn is_interrogative(tokens: &[TokenAnnotation]) -> bool {
    tokens
        .iter()
        .find(|t| t.pos != PartOfSpeech::Punct)
        .map(|t| t.is_wh_word() || t.pos == PartOfSpeech::Aux)
        .unwrap_or(false)
}

/// True if any token carries content: a noun, proper noun, number or adjective.
pub fn is_data_like(tokens: &[TokenAnnotation]) -> bool {
    tokens.iter().any(|t| {
        matches!(
            t.pos,
            PartOfSpeech::Noun | PartOfSpeech::Propn | PartOfSpeech::Num | PartOfSpeech::Adj
        )
    })
}

fn children(tokens: &[TokenAnnotation], head: usize) -> impl Iterator<Item = (usize, &TokenAnnotation)> {
    tokens
        .iter()
        .enumerate()
        .filter(move |(idx, t)| *idx != head && t.head == head)
}

fn is_saved(tokens: &[TokenAnnotation], idx: usize) -> bool {
    children(tokens, idx).any(|(child_idx, child)| {
        SAVING_ROLES.contains(&child.dep)
            || (child.dep == DependencyRole::Prep
                && children(tokens, child_idx).any(|(_, grandchild)| grandchild.dep == DependencyRole::Pobj))
    })
}

/// First target-required noun that lacks a saving dependent, if any.
pub fn vague_target(tokens: &[TokenAnnotation]) -> Option<String> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.pos == PartOfSpeech::Noun)
        .find(|(idx, t)| TARGET_REQUIRED_NOUNS.contains(t.lower().as_str()) && !is_saved(tokens, *idx))
        .map(|(_, t)| t.lower())
}

pub fn is_vague(tokens: &[TokenAnnotation]) -> bool {
    vague_target(tokens).is_some()
}
