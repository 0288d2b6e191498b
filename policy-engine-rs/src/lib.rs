// policy-engine-rs/src/lib.rs
// Heuristic policy engine: cheap local decisions taken before any
// generative call.
//
// Every stage is a pure function over normalized text plus its annotation:
// - intent classification (ordered rules, first match wins)
// - interrogative detection
// - data-likeness
// - vagueness (target nouns without a referent)
// - delexicalization / relexicalization of example records

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use shared_types_rs::{ExampleRecord, Plan};

pub mod annotation;
pub mod delex;
pub mod intent;
pub mod lexicon;
pub mod stages;


pub use annotation::{DependencyRole, EntityLabel, NlpAnnotator, PartOfSpeech, TokenAnnotation};
pub use delex::{
    contains_placeholder, delexicalize, match_template, placeholders_in, relexicalize, TemplateMatch,
    PERSON_SLOT, PROGRAM_SLOT,
};
pub use intent::{classify_intent, Intent};
pub use lexicon::LexiconAnnotator;
pub use stages::{is_data_like, is_interrogative, is_vague, normalize, vague_target};

/// Parameter keys that a recognised person name may fill.
const PERSON_KEYS: &[&str] = &["PERSON_NAME", "STUDENT_NAME", "NAME", "FACULTY_NAME"];
/// Parameter keys that a recognised program code may fill.
const PROGRAM_KEYS: &[&str] = &["PROGRAM", "COURSE"];

/// Everything the engine can tell about a query without a model call.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnalysis {
    pub normalized: String,
    pub intent: Option<Intent>,
    pub interrogative: bool,
    pub data_like: bool,
    pub vague_target: Option<String>,
    pub people: Vec<String>,
    pub programs: Vec<String>,
}

impl QueryAnalysis {
    pub fn is_vague(&self) -> bool {
        self.vague_target.is_some()
    }
}

pub struct PolicyEngine {
    annotator: Arc<dyn NlpAnnotator>,
    known_programs: Vec<String>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(Arc::new(LexiconAnnotator::new()), Vec::new())
    }
}

impl PolicyEngine {
    pub fn new(annotator: Arc<dyn NlpAnnotator>, known_programs: Vec<String>) -> Self {
        Self {
            annotator,
            known_programs,
        }
    }

    pub fn known_programs(&self) -> &[String] {
        &self.known_programs
    }

    pub fn annotate(&self, query: &str) -> Vec<TokenAnnotation> {
        self.annotator.annotate(&normalize(query))
    }

    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let normalized = normalize(query);
        let tokens = self.annotator.annotate(&normalized);
        QueryAnalysis {
            intent: classify_intent(&normalized),
            interrogative: is_interrogative(&tokens),
            data_like: is_data_like(&tokens),
            vague_target: vague_target(&tokens),
            people: delex::person_spans(&tokens),
            programs: delex::program_mentions(&normalized, &self.known_programs),
            normalized,
        }
    }

    pub fn classify_intent(&self, query: &str) -> Option<Intent> {
        classify_intent(&normalize(query))
    }

    pub fn is_interrogative(&self, query: &str) -> bool {
        is_interrogative(&self.annotate(query))
    }

    pub fn is_data_like(&self, query: &str) -> bool {
        is_data_like(&self.annotate(query))
    }

    pub fn is_vague(&self, query: &str) -> bool {
        is_vague(&self.annotate(query))
    }

    /// Parameter pass followed by the entity pass.
    pub fn delexicalize(&self, query: &str, plan: &Plan) -> ExampleRecord {
        if plan.parameters.is_empty() {
            return delexicalize(query, plan);
        }
        let mut record = delexicalize(query, plan);
        let tokens = self.annotate(query);
        let people = delex::person_spans(&tokens);
        let programs = delex::program_mentions(query, &self.known_programs);
        record.user_pattern = delex::delexicalize_entities(&record.user_pattern, &people, &programs);
        record
    }

    /// Values the current query supplies for placeholder slots.
    pub fn slot_values(&self, query: &str) -> Map<String, Value> {
        let analysis = self.analyze(query);
        let mut values = Map::new();
        if let Some(person) = analysis.people.first() {
            values.insert(PERSON_SLOT.to_string(), Value::String(person.clone()));
            for key in PERSON_KEYS {
                values.insert(key.to_string(), Value::String(person.clone()));
            }
        }
        if let Some(program) = analysis.programs.first() {
            values.insert(PROGRAM_SLOT.to_string(), Value::String(program.clone()));
            for key in PROGRAM_KEYS {
                values.insert(key.to_string(), Value::String(program.clone()));
            }
        }
        values
    }

    /// Fill an example with this query's values for few-shot prompting.
    pub fn relexicalize(&self, record: &ExampleRecord, query: &str) -> ExampleRecord {
        relexicalize(record, &self.slot_values(query))
    }

    /// Try stored patterns in order; the first whose captured values all
    /// look like entity mentions wins.
    ///
    /// A capture containing determiners, pronouns, verbs, prepositions or
    /// superlatives ("the tallest student") is not a slot value.
    pub fn match_example(&self, query: &str, records: &[ExampleRecord]) -> Option<Plan> {
        let normalized = normalize(query);
        records.iter().find_map(|record| {
            let matched = match_template(record, &normalized)?;
            let plausible = matched.captures.values().all(|text| self.is_entity_mention(text));
            if plausible {
                log::debug!("template fast path matched '{}'", record.user_pattern);
                Some(matched.plan)
            } else {
                None
            }
        })
    }

    fn is_entity_mention(&self, text: &str) -> bool {
        let tokens = self.annotator.annotate(text);
        !tokens.is_empty()
            && tokens.len() <= 5
            && tokens.iter().all(|t| match t.pos {
                PartOfSpeech::Noun | PartOfSpeech::Propn | PartOfSpeech::Num => true,
                PartOfSpeech::Adj => t.tag != "JJS",
                PartOfSpeech::Punct => t.token == "-" || t.token == ".",
                _ => false,
            })
    }
}
