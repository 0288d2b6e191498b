// policy-engine-rs/src/annotation.rs
// Token-level NLP annotation contract.

use std::fmt;

use serde::Serialize;

/// Universal part-of-speech classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PartOfSpeech {
    Noun,
    Propn,
    Num,
    Adj,
    Verb,
    Aux,
    Pron,
    Det,
    Adp,
    Adv,
    Cconj,
    Part,
    Intj,
    Punct,
    X,
}

/// Dependency relation of a token to its head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DependencyRole {
    Root,
    Nsubj,
    Dobj,
    Dative,
    Attr,
    Pobj,
    Prep,
    Compound,
    Poss,
    Case,
    Amod,
    Nummod,
    Det,
    Aux,
    Advmod,
    Cc,
    Conj,
    Intj,
    Punct,
    Dep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityLabel {
    Person,
    Org,
    Cardinal,
    Ordinal,
}

/// One annotated token.
///
/// `tag` carries the fine-grained (Penn) tag; wh-words are recognised by
/// `WDT`, `WP`, `WP$` and `WRB`. `head` is the index of the governing token
/// (the root points at itself).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenAnnotation {
    pub token: String,
    pub pos: PartOfSpeech,
    pub tag: &'static str,
    pub dep: DependencyRole,
    pub head: usize,
    pub entity: Option<EntityLabel>,
}

impl TokenAnnotation {
    pub fn lower(&self) -> String {
        self.token.to_lowercase()
    }

    pub fn is_wh_word(&self) -> bool {
        matches!(self.tag, "WDT" | "WP" | "WP$" | "WRB")
    }
}

/// Pretrained (or rule-based) English annotator.
pub trait NlpAnnotator: Send + Sync {
    fn annotate(&self, text: &str) -> Vec<TokenAnnotation>;
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PartOfSpeech::Noun => "NOUN",
            PartOfSpeech::Propn => "PROPN",
            PartOfSpeech::Num => "NUM",
            PartOfSpeech::Adj => "ADJ",
            PartOfSpeech::Verb => "VERB",
            PartOfSpeech::Aux => "AUX",
            PartOfSpeech::Pron => "PRON",
            PartOfSpeech::Det => "DET",
            PartOfSpeech::Adp => "ADP",
            PartOfSpeech::Adv => "ADV",
            PartOfSpeech::Cconj => "CCONJ",
            PartOfSpeech::Part => "PART",
            PartOfSpeech::Intj => "INTJ",
            PartOfSpeech::Punct => "PUNCT",
            PartOfSpeech::X => "X",
        };
        f.write_str(label)
    }
}

impl fmt::Display for DependencyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DependencyRole::Root => "ROOT",
            DependencyRole::Nsubj => "nsubj",
            DependencyRole::Dobj => "dobj",
            DependencyRole::Dative => "dative",
            DependencyRole::Attr => "attr",
            DependencyRole::Pobj => "pobj",
            DependencyRole::Prep => "prep",
            DependencyRole::Compound => "compound",
            DependencyRole::Poss => "poss",
            DependencyRole::Case => "case",
            DependencyRole::Amod => "amod",
            DependencyRole::Nummod => "nummod",
            DependencyRole::Det => "det",
            DependencyRole::Aux => "aux",
            DependencyRole::Advmod => "advmod",
            DependencyRole::Cc => "cc",
            DependencyRole::Conj => "conj",
            DependencyRole::Intj => "intj",
            DependencyRole::Punct => "punct",
            DependencyRole::Dep => "dep",
        };
        f.write_str(label)
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityLabel::Person => "PERSON",
            EntityLabel::Org => "ORG",
            EntityLabel::Cardinal => "CARDINAL",
            EntityLabel::Ordinal => "ORDINAL",
        };
        f.write_str(label)
    }
}
