// policy-engine-rs/src/lexicon.rs
// Rule-based English annotator: closed-class lexicons for tagging and a
// shallow chunk-based dependency attachment.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::annotation::{DependencyRole, EntityLabel, NlpAnnotator, PartOfSpeech, TokenAnnotation};

// Protect against tokenizer DoS
const MAX_TOKENS: usize = 256;

static DETERMINERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "this", "that", "these", "those", "all", "every", "each", "any", "some",
        "no", "both", "another",
    ]
    .iter()
    .cloned()
    .collect()
});

static AUXILIARIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "is", "are", "was", "were", "am", "be", "been", "being", "do", "does", "did", "can",
        "could", "will", "would", "shall", "should", "may", "might", "must", "has", "have", "had",
    ]
    .iter()
    .cloned()
    .collect()
});

static MODALS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["can", "could", "will", "would", "shall", "should", "may", "might", "must"]
        .iter()
        .cloned()
        .collect()
});

static PERSONAL_PRONOUNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "i", "me", "you", "he", "him", "she", "it", "we", "us", "they", "them", "there",
        "someone", "anyone", "everyone", "somebody", "anybody", "everybody",
    ]
    .iter()
    .cloned()
    .collect()
});

static POSSESSIVE_PRONOUNS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["my", "your", "his", "her", "its", "our", "their"].iter().cloned().collect());

static PREPOSITIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "of", "in", "for", "from", "with", "at", "on", "by", "about", "under", "to", "into",
        "during", "between", "among", "per", "than", "like", "within", "without",
    ]
    .iter()
    .cloned()
    .collect()
});

static CONJUNCTIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["and", "or", "but", "nor"].iter().cloned().collect());

static INTERJECTIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["hi", "hello", "hey", "thanks", "ok", "okay", "yes", "yeah", "bye", "goodbye"]
        .iter()
        .cloned()
        .collect()
});

static ADVERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "also", "only", "currently", "now", "please", "just", "very", "too", "again", "not",
        "n't", "today", "tomorrow", "yesterday", "here", "exactly", "really",
    ]
    .iter()
    .cloned()
    .collect()
});

static VERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "show", "list", "find", "tell", "give", "get", "display", "search", "count", "know",
        "need", "want", "see", "teach", "teaches", "taught", "handle", "handles", "handled",
        "enroll", "enrolled", "look", "fetch", "check", "thank", "compare", "take", "takes",
        "advise", "advises", "study", "studies", "belong", "belongs", "shows", "lists", "finds",
        "gives", "tells", "print", "describe", "explain", "help", "go", "goes",
    ]
    .iter()
    .cloned()
    .collect()
});

static ADJECTIVES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "many", "much", "few", "top", "new", "current", "regular", "irregular", "full", "active",
        "inactive", "male", "female", "senior", "junior", "old", "young", "tall", "short", "high",
        "low", "good", "bad", "other", "same", "different", "next", "last", "previous", "whole",
        "complete", "total", "average", "first", "second", "third", "fourth", "fifth", "part-time",
        "full-time", "irregular",
    ]
    .iter()
    .cloned()
    .collect()
});

// words ending in -est that are nouns
static EST_NOUNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["test", "interest", "request", "contest", "priest", "rest", "forest", "guest", "quest", "chest"]
        .iter()
        .cloned()
        .collect()
});

static NUMBER_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
        "twelve", "hundred",
    ]
    .iter()
    .cloned()
    .collect()
});

static ORDINAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(st|nd|rd|th)$").expect("valid ordinal regex"));

/// Tokenize text into words and punctuation, splitting the `'s` clitic.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for segment in text.split_word_bounds() {
        if segment.trim().is_empty() {
            continue;
        }
        let clitic = ["'s", "'S", "\u{2019}s", "\u{2019}S"]
            .iter()
            .find_map(|suffix| segment.strip_suffix(*suffix).map(|stem| (stem, &segment[stem.len()..])));
        match clitic {
            Some((stem, suffix)) if !stem.is_empty() => {
                out.push(stem.to_string());
                out.push(suffix.to_string());
            }
            _ => out.push(segment.to_string()),
        }
        if out.len() >= MAX_TOKENS {
            out.truncate(MAX_TOKENS);
            break;
        }
    }
    out
}

/// Default annotator backed by closed-class word lists.
///
/// Capitalisation is only trusted for proper-noun detection when the query
/// is not written entirely in title or upper case.
#[derive(Debug, Default, Clone)]
pub struct LexiconAnnotator;

impl LexiconAnnotator {
    pub fn new() -> Self {
        Self
    }
}

impl NlpAnnotator for LexiconAnnotator {
    fn annotate(&self, text: &str) -> Vec<TokenAnnotation> {
        let words = tokenize(text);
        if words.is_empty() {
            return Vec::new();
        }
        let mut tokens = tag(&words);
        attach(&mut tokens);
        tokens
    }
}

fn is_title_case(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => chars.all(|c| !c.is_alphabetic() || c.is_lowercase()),
        _ => false,
    }
}

fn is_acronym(word: &str) -> bool {
    word.chars().count() >= 2
        && word.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && word.chars().any(|c| c.is_ascii_uppercase())
}

fn is_punct(word: &str) -> bool {
    word.chars().all(|c| !c.is_alphanumeric())
}

fn token(word: &str, pos: PartOfSpeech, tag: &'static str) -> TokenAnnotation {
    TokenAnnotation {
        token: word.to_string(),
        pos,
        tag,
        dep: DependencyRole::Dep,
        head: 0,
        entity: None,
    }
}

fn tag(words: &[String]) -> Vec<TokenAnnotation> {
    let alphabetic: Vec<&String> = words
        .iter()
        .filter(|w| w.chars().any(char::is_alphabetic))
        .collect();
    let capitalised = alphabetic
        .iter()
        .filter(|w| w.chars().next().map(char::is_uppercase).unwrap_or(false))
        .count();
    // a fully capitalised query carries no proper-noun signal
    let case_informative = alphabetic.len() <= 2 || capitalised * 10 < alphabetic.len() * 7;

    let mut tokens: Vec<TokenAnnotation> = Vec::with_capacity(words.len());
    let mut seen_aux = false;
    for (i, word) in words.iter().enumerate() {
        let lower = word.to_lowercase();
        let l = lower.as_str();
        let mut t = if l == "'s" || l == "\u{2019}s" {
            let after_pronoun = tokens
                .last()
                .map(|prev| prev.is_wh_word() || prev.tag == "PRP")
                .unwrap_or(false);
            if after_pronoun {
                token(word, PartOfSpeech::Aux, "VBZ")
            } else {
                token(word, PartOfSpeech::Part, "POS")
            }
        } else if is_punct(word) {
            token(word, PartOfSpeech::Punct, ".")
        } else if matches!(l, "who" | "whom" | "what") {
            token(word, PartOfSpeech::Pron, "WP")
        } else if l == "whose" {
            token(word, PartOfSpeech::Pron, "WP$")
        } else if l == "which" {
            token(word, PartOfSpeech::Det, "WDT")
        } else if matches!(l, "when" | "where" | "why" | "how") {
            token(word, PartOfSpeech::Adv, "WRB")
        } else if AUXILIARIES.contains(l) {
            // "does ... have": the second auxiliary-like verb is the main verb
            if seen_aux && matches!(l, "do" | "does" | "did" | "have" | "has" | "had") {
                token(word, PartOfSpeech::Verb, "VB")
            } else if MODALS.contains(l) {
                token(word, PartOfSpeech::Aux, "MD")
            } else {
                token(word, PartOfSpeech::Aux, "VBZ")
            }
        } else if POSSESSIVE_PRONOUNS.contains(l) {
            token(word, PartOfSpeech::Pron, "PRP$")
        } else if PERSONAL_PRONOUNS.contains(l) {
            token(word, PartOfSpeech::Pron, "PRP")
        } else if DETERMINERS.contains(l) {
            token(word, PartOfSpeech::Det, "DT")
        } else if PREPOSITIONS.contains(l) {
            token(word, PartOfSpeech::Adp, "IN")
        } else if CONJUNCTIONS.contains(l) {
            token(word, PartOfSpeech::Cconj, "CC")
        } else if INTERJECTIONS.contains(l) {
            token(word, PartOfSpeech::Intj, "UH")
        } else if ADVERBS.contains(l) {
            token(word, PartOfSpeech::Adv, "RB")
        } else if ORDINAL_RE.is_match(l) || matches!(l, "first" | "second" | "third" | "fourth" | "fifth") {
            let mut t = token(word, PartOfSpeech::Adj, "JJ");
            t.entity = Some(EntityLabel::Ordinal);
            t
        } else if l.chars().all(|c| c.is_ascii_digit()) || NUMBER_WORDS.contains(l) {
            let mut t = token(word, PartOfSpeech::Num, "CD");
            t.entity = Some(EntityLabel::Cardinal);
            t
        } else if l.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            token(word, PartOfSpeech::Num, "CD")
        } else if VERBS.contains(l) {
            token(word, PartOfSpeech::Verb, if l.ends_with('s') { "VBZ" } else { "VB" })
        } else if ADJECTIVES.contains(l) {
            token(word, PartOfSpeech::Adj, "JJ")
        } else if l.ends_with("est") && l.chars().count() > 4 && !EST_NOUNS.contains(l) {
            token(word, PartOfSpeech::Adj, "JJS")
        } else if case_informative && is_acronym(word) {
            let mut t = token(word, PartOfSpeech::Propn, "NNP");
            t.entity = Some(EntityLabel::Org);
            t
        } else if case_informative
            && is_title_case(word)
            && (i > 0 || words.get(1).map(|w| is_title_case(w)).unwrap_or(false))
        {
            let mut t = token(word, PartOfSpeech::Propn, "NNP");
            t.entity = Some(EntityLabel::Person);
            t
        } else if l.ends_with('s') && !l.ends_with("ss") && l.chars().count() > 3 {
            token(word, PartOfSpeech::Noun, "NNS")
        } else {
            token(word, PartOfSpeech::Noun, "NN")
        };
        if t.pos == PartOfSpeech::Aux {
            seen_aux = true;
        }
        t.head = i;
        tokens.push(t);
    }

    // "what"/"whose" directly before a nominal act as determiners
    for i in 0..tokens.len().saturating_sub(1) {
        let next_nominal = matches!(
            tokens[i + 1].pos,
            PartOfSpeech::Noun | PartOfSpeech::Propn | PartOfSpeech::Adj | PartOfSpeech::Num
        );
        if next_nominal && tokens[i].tag == "WP" && tokens[i].lower() == "what" {
            tokens[i].pos = PartOfSpeech::Det;
            tokens[i].tag = "WDT";
        }
    }
    tokens
}

fn chunk_member(t: &TokenAnnotation) -> bool {
    match t.pos {
        PartOfSpeech::Det | PartOfSpeech::Adj | PartOfSpeech::Num | PartOfSpeech::Noun | PartOfSpeech::Propn => true,
        PartOfSpeech::Pron => t.tag == "PRP$" || t.tag == "WP$",
        PartOfSpeech::Part => t.tag == "POS",
        _ => false,
    }
}

fn is_nominal(t: &TokenAnnotation) -> bool {
    matches!(t.pos, PartOfSpeech::Noun | PartOfSpeech::Propn)
}

/// Noun chunk: token span plus the index of its head.
#[derive(Debug, Clone, Copy)]
struct Chunk {
    start: usize,
    end: usize,
    head: usize,
}

fn find_chunks(tokens: &[TokenAnnotation]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        // a chunk never starts with a bare possessive marker
        if chunk_member(&tokens[i]) && tokens[i].tag != "POS" {
            let start = i;
            while i < tokens.len() && chunk_member(&tokens[i]) {
                i += 1;
            }
            chunks.push(Chunk { start, end: i, head: start });
        } else {
            i += 1;
        }
    }
    chunks
}

fn segment_head(tokens: &[TokenAnnotation], start: usize, end: usize) -> usize {
    (start..end)
        .rev()
        .find(|&j| is_nominal(&tokens[j]))
        .unwrap_or(end.saturating_sub(1).max(start))
}

fn set(tokens: &mut [TokenAnnotation], assigned: &mut [bool], idx: usize, dep: DependencyRole, head: usize) {
    tokens[idx].dep = dep;
    tokens[idx].head = head;
    assigned[idx] = true;
}

/// Attach the members of one possessive-free segment to its head.
fn attach_segment(tokens: &mut [TokenAnnotation], assigned: &mut [bool], start: usize, end: usize, head: usize) {
    for j in start..end {
        if j == head {
            continue;
        }
        let dep = match tokens[j].pos {
            PartOfSpeech::Det => DependencyRole::Det,
            PartOfSpeech::Pron => DependencyRole::Poss,
            PartOfSpeech::Adj => DependencyRole::Amod,
            PartOfSpeech::Num => DependencyRole::Nummod,
            PartOfSpeech::Noun | PartOfSpeech::Propn if j < head => DependencyRole::Compound,
            _ => DependencyRole::Dep,
        };
        set(tokens, assigned, j, dep, head);
    }
}

fn attach_chunk(tokens: &mut [TokenAnnotation], assigned: &mut [bool], chunk: &mut Chunk) {
    let markers: Vec<usize> = (chunk.start..chunk.end)
        .filter(|&j| tokens[j].tag == "POS")
        .collect();
    let mut bounds = Vec::new();
    let mut seg_start = chunk.start;
    for &m in &markers {
        bounds.push((seg_start, m));
        seg_start = m + 1;
    }
    bounds.push((seg_start, chunk.end));
    bounds.retain(|(s, e)| s < e);

    let heads: Vec<usize> = bounds
        .iter()
        .map(|&(s, e)| segment_head(tokens, s, e))
        .collect();
    for (k, &(s, e)) in bounds.iter().enumerate() {
        attach_segment(tokens, assigned, s, e, heads[k]);
    }
    // possessor segments point at the following segment head
    for k in 0..heads.len().saturating_sub(1) {
        set(tokens, assigned, heads[k], DependencyRole::Poss, heads[k + 1]);
    }
    for &m in &markers {
        let owner = heads
            .iter()
            .copied()
            .filter(|&h| h < m)
            .last()
            .unwrap_or(chunk.start);
        set(tokens, assigned, m, DependencyRole::Case, owner);
    }
    chunk.head = heads.last().copied().unwrap_or(chunk.start);
}

fn attach(tokens: &mut [TokenAnnotation]) {
    let n = tokens.len();
    let mut assigned = vec![false; n];
    let mut chunks = find_chunks(tokens);
    for chunk in chunks.iter_mut() {
        attach_chunk(tokens, &mut assigned, chunk);
    }
    let chunk_of = |idx: usize, chunks: &[Chunk]| chunks.iter().position(|c| c.start <= idx && idx < c.end);

    let root = (0..n)
        .find(|&i| tokens[i].pos == PartOfSpeech::Verb)
        .or_else(|| (0..n).find(|&i| tokens[i].pos == PartOfSpeech::Aux))
        .or_else(|| chunks.first().map(|c| c.head))
        .unwrap_or(0);
    let root_is_verb = tokens[root].pos == PartOfSpeech::Verb;
    let root_is_copula = tokens[root].pos == PartOfSpeech::Aux;
    set(tokens, &mut assigned, root, DependencyRole::Root, root);

    let mut subject_taken = false;
    let mut object_taken = false;

    for i in 0..n {
        if assigned[i] && !chunks.iter().any(|c| c.head == i) {
            continue;
        }
        if i == root {
            continue;
        }
        if let Some(ci) = chunk_of(i, &chunks) {
            let chunk = chunks[ci];
            if chunk.head != i {
                continue;
            }
            let before = chunk.start.checked_sub(1).map(|p| tokens[p].pos);
            let (dep, head) = match before {
                Some(PartOfSpeech::Adp) => (DependencyRole::Pobj, chunk.start - 1),
                Some(PartOfSpeech::Cconj) if ci > 0 => (DependencyRole::Conj, chunks[ci - 1].head),
                _ if i < root => {
                    subject_taken = true;
                    (DependencyRole::Nsubj, root)
                }
                _ if root_is_verb && !object_taken => {
                    object_taken = true;
                    (DependencyRole::Dobj, root)
                }
                _ if root_is_copula => {
                    if subject_taken {
                        (DependencyRole::Attr, root)
                    } else {
                        subject_taken = true;
                        (DependencyRole::Nsubj, root)
                    }
                }
                _ => (DependencyRole::Dep, root),
            };
            set(tokens, &mut assigned, i, dep, head);
            continue;
        }

        let (dep, head) = match tokens[i].pos {
            PartOfSpeech::Aux => (DependencyRole::Aux, root),
            PartOfSpeech::Adp => {
                let governor = (0..i)
                    .rev()
                    .find(|&j| chunks.iter().any(|c| c.head == j) || tokens[j].pos == PartOfSpeech::Verb)
                    .unwrap_or(root);
                (DependencyRole::Prep, governor)
            }
            PartOfSpeech::Pron if tokens[i].is_wh_word() => {
                if i < root && root_is_copula {
                    subject_taken = true;
                    (DependencyRole::Attr, root)
                } else if i < root {
                    subject_taken = true;
                    (DependencyRole::Nsubj, root)
                } else {
                    (DependencyRole::Dobj, root)
                }
            }
            PartOfSpeech::Pron => {
                if i < root {
                    subject_taken = true;
                    (DependencyRole::Nsubj, root)
                } else if root_is_verb && chunks.iter().any(|c| c.start > i) {
                    (DependencyRole::Dative, root)
                } else if root_is_verb && !object_taken {
                    object_taken = true;
                    (DependencyRole::Dobj, root)
                } else if root_is_copula && !subject_taken {
                    subject_taken = true;
                    (DependencyRole::Nsubj, root)
                } else {
                    (DependencyRole::Attr, root)
                }
            }
            PartOfSpeech::Adv => (DependencyRole::Advmod, root),
            PartOfSpeech::Cconj => {
                let prev = chunks.iter().filter(|c| c.end <= i).last().map(|c| c.head).unwrap_or(root);
                (DependencyRole::Cc, prev)
            }
            PartOfSpeech::Intj => (DependencyRole::Intj, root),
            PartOfSpeech::Punct => (DependencyRole::Punct, root),
            _ => (DependencyRole::Dep, root),
        };
        set(tokens, &mut assigned, i, dep, head);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotate(text: &str) -> Vec<TokenAnnotation> {
        LexiconAnnotator::new().annotate(text)
    }

    fn find<'a>(tokens: &'a [TokenAnnotation], word: &str) -> (usize, &'a TokenAnnotation) {
        tokens
            .iter()
            .enumerate()
            .find(|(_, t)| t.token.eq_ignore_ascii_case(word))
            .unwrap()
    }

    #[test]
    fn tokenize_splits_possessive_clitic_and_punctuation() {
        assert_eq!(tokenize("Juan's grades?"), vec!["Juan", "'s", "grades", "?"]);
        assert_eq!(tokenize("  "), Vec::<String>::new());
    }

    #[test]
    fn tags_question_words_and_auxiliaries() {
        let tokens = annotate("who is the tallest student");
        assert_eq!(tokens[0].tag, "WP");
        assert_eq!(tokens[1].pos, PartOfSpeech::Aux);
        assert_eq!(tokens[3].tag, "JJS");
        assert_eq!(tokens[4].pos, PartOfSpeech::Noun);
        // tallest modifies student
        assert_eq!(tokens[3].dep, DependencyRole::Amod);
        assert_eq!(tokens[3].head, 4);
    }

    #[test]
    fn attaches_prepositional_objects() {
        let tokens = annotate("what is the schedule of bscs 2");
        let (schedule, _) = find(&tokens, "schedule");
        let (of, of_tok) = find(&tokens, "of");
        let (_, bscs) = find(&tokens, "bscs");
        assert_eq!(of_tok.dep, DependencyRole::Prep);
        assert_eq!(of_tok.head, schedule);
        assert_eq!(bscs.dep, DependencyRole::Pobj);
        assert_eq!(bscs.head, of);
    }

    #[test]
    fn possessives_attach_to_owned_noun() {
        let tokens = annotate("show me Juan's grades");
        let (grades, _) = find(&tokens, "grades");
        let (_, juan) = find(&tokens, "juan");
        assert_eq!(juan.dep, DependencyRole::Poss);
        assert_eq!(juan.head, grades);
        assert_eq!(juan.entity, Some(EntityLabel::Person));
        let (_, me) = find(&tokens, "me");
        assert_eq!(me.dep, DependencyRole::Dative);
        assert_eq!(tokens[grades].dep, DependencyRole::Dobj);
    }

    #[test]
    fn compounds_inside_noun_chunks() {
        let tokens = annotate("list all bscs students");
        let (students, st) = find(&tokens, "students");
        let (_, bscs) = find(&tokens, "bscs");
        assert_eq!(bscs.dep, DependencyRole::Compound);
        assert_eq!(bscs.head, students);
        assert_eq!(st.dep, DependencyRole::Dobj);
        assert_eq!(tokens[0].dep, DependencyRole::Root);
    }

    #[test]
    fn shouting_disables_proper_noun_guessing() {
        let tokens = annotate("LIST ALL FACULTY MEMBERS");
        assert!(tokens.iter().all(|t| t.pos != PartOfSpeech::Propn));
        let tokens = annotate("who is Maria Santos");
        assert_eq!(tokens[2].entity, Some(EntityLabel::Person));
        assert_eq!(tokens[3].entity, Some(EntityLabel::Person));
    }
}
