// policy-engine-rs/src/intent.rs
// Ordered intent rules. First match wins; the order is significant.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Intent catalogue. Each intent maps onto the tool that serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    GetPersonProfile,
    GetPersonSchedule,
    GetStudentGrades,
    QueryCurriculum,
    FindPeople,
    AnswerConversationalQuery,
}

impl Intent {
    pub fn tool_name(&self) -> &'static str {
        match self {
            Intent::GetPersonProfile => "get_person_profile",
            Intent::GetPersonSchedule => "get_person_schedule",
            Intent::GetStudentGrades => "get_student_grades",
            Intent::QueryCurriculum => "query_curriculum",
            Intent::FindPeople => "find_people",
            Intent::AnswerConversationalQuery => "answer_conversational_query",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Intent> {
        [
            Intent::GetPersonProfile,
            Intent::GetPersonSchedule,
            Intent::GetStudentGrades,
            Intent::QueryCurriculum,
            Intent::FindPeople,
            Intent::AnswerConversationalQuery,
        ]
        .into_iter()
        .find(|intent| intent.tool_name() == name)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

enum Matcher {
    Pattern(Regex),
    AllOf(Vec<Regex>),
    Exact(&'static [&'static str]),
}

struct IntentRule {
    intent: Intent,
    matcher: Matcher,
}

impl IntentRule {
    fn matches(&self, normalized: &str) -> bool {
        match &self.matcher {
            Matcher::Pattern(re) => re.is_match(normalized),
            Matcher::AllOf(res) => res.iter().all(|re| re.is_match(normalized)),
            Matcher::Exact(phrases) => phrases.contains(&normalized),
        }
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid intent regex")
}

const SMALL_TALK: &[&str] = &["hi", "hello", "hey", "thanks", "thank you", "ok", "okay"];

/// Queries with at most this many tokens fall back to a profile lookup.
pub const SHORT_QUERY_TOKENS: usize = 4;

static RULES: Lazy<Vec<IntentRule>> = Lazy::new(|| {
    vec![
        IntentRule {
            intent: Intent::GetPersonProfile,
            matcher: Matcher::Pattern(re(r"^(who is|what is|profile of|tell me about)\b")),
        },
        IntentRule {
            intent: Intent::GetPersonSchedule,
            matcher: Matcher::Pattern(re(r"\b(schedule|class|when is|classes)\b")),
        },
        IntentRule {
            intent: Intent::GetStudentGrades,
            matcher: Matcher::Pattern(re(r"\b(grades|gwa|scores|class standing)\b")),
        },
        IntentRule {
            intent: Intent::QueryCurriculum,
            matcher: Matcher::Pattern(re(r"\b(curriculum|subjects|what subjects)\b")),
        },
        IntentRule {
            intent: Intent::FindPeople,
            matcher: Matcher::AllOf(vec![
                re(r"\b(list all|how many|find all|show all)\b"),
                re(r"\b(students|faculty|teachers)\b"),
            ]),
        },
        IntentRule {
            intent: Intent::AnswerConversationalQuery,
            matcher: Matcher::Exact(SMALL_TALK),
        },
    ]
});

/// Classify a query into an intent, or `None` to defer to the planner.
///
/// Deterministic and total: the query is lowercased and trimmed, rules are
/// tried in order, and short unmatched queries are assumed to name a person.
pub fn classify_intent(query: &str) -> Option<Intent> {
    let normalized = query.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    if let Some(rule) = RULES.iter().find(|rule| rule.matches(&normalized)) {
        return Some(rule.intent);
    }
    if normalized.split_whitespace().count() <= SHORT_QUERY_TOKENS {
        return Some(Intent::GetPersonProfile);
    }
    None
}
