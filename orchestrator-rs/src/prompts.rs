// orchestrator-rs/src/prompts.rs
// Prompt text and fixed user-facing replies.

use shared_types_rs::ExampleRecord;

pub(crate) const GENERIC_APOLOGY: &str =
    "I'm sorry, something went wrong while answering your question. Please try again.";

pub(crate) const PLANNER_APOLOGY: &str =
    "I'm sorry, I couldn't work out how to answer that. Could you rephrase your question?";

pub(crate) const SYNTHESIS_APOLOGY: &str =
    "I'm sorry, I found the data but couldn't put together an answer. Please try again.";

pub(crate) fn execution_apology(summary: &str) -> String {
    format!(
        "I'm sorry, I ran into a problem while retrieving that information. {}",
        summary
    )
}

pub(crate) const GREETING_REPLY: &str =
    "Hello! I can look up students, faculty, staff, schedules, grades and curricula. What would you like to know?";

pub(crate) const THANKS_REPLY: &str = "You're welcome! Let me know if there is anything else you need.";

pub(crate) const CAPABILITIES_REPLY: &str = "I answer questions about the school directory: people and their profiles, class schedules, student grades and program curricula.";

/// Deterministic reply for small talk.
pub(crate) fn conversational_reply(normalized_query: &str) -> &'static str {
    let q = normalized_query.trim();
    if q.starts_with("thank") || q.contains("thanks") {
        THANKS_REPLY
    } else if q.contains("what can you do") || q.contains("help") {
        CAPABILITIES_REPLY
    } else {
        GREETING_REPLY
    }
}

/// Clarifying question for a query whose target noun has no referent.
pub(crate) fn vague_clarification(target: &str) -> String {
    format!(
        "Which {} do you mean? Please give a name, or details such as a program, year level or section.",
        target
    )
}

pub(crate) fn planner_system_prompt(
    catalogue: &str,
    context_json: &str,
    examples: &[ExampleRecord],
    known_programs: &[String],
) -> String {
    let mut few_shot = String::new();
    for example in examples {
        let plan = serde_json::to_string(&example.plan_template).unwrap_or_default();
        few_shot.push_str(&format!("User: {}\nPlan: {}\n", example.user_pattern, plan));
    }
    if few_shot.is_empty() {
        few_shot.push_str("(none)\n");
    }

    format!(
        r#"You are the planner of a school information assistant. Choose exactly one tool for the user's question and extract its parameters.

--- AVAILABLE TOOLS ---
{catalogue}
- `answer_conversational_query(response: str)`: Greetings, thanks and small talk that need no data.

--- CONVERSATION CONTEXT ---
{context_json}

--- KNOWN PROGRAMS ---
{programs}

--- SOLVED EXAMPLES ---
{few_shot}
Rules:
- Only extract values the user actually stated. Never invent names.
- Program codes are upper case (e.g. BSCS). Year levels are integers.
- Respond with a single raw JSON object: {{"tool_name": "...", "parameters": {{...}}}}"#,
        programs = known_programs.join(", "),
    )
}

pub(crate) const SYNTHESIS_SYSTEM_PROMPT: &str = r#"You are a school information assistant. Answer using only the factual data provided.
Respond with a single JSON object with the keys "report" (string) and "chart_data" (list).
- Every record has a "source_collection". Cite it in square brackets after each fact, e.g. [students].
- If the question asks for "all", a "list" or a count, include every record. Never summarize or truncate.
- If the question asks about one person but several records match, do not pick one. Ask which one is meant, naming only the attributes that differ (such as program or section), never full names.
- chart_data holds {"label": ..., "value": ...} pairs when a chart would help, otherwise []."#;

pub(crate) fn synthesis_user_prompt(data_json: &str, context_json: &str, query: &str) -> String {
    format!(
        "Factual Data:\n{}\n---\nConversation Context:\n{}\n---\nUser's Question:\n{}\n---\nYour final JSON response (with `report` and `chart_data` keys):",
        data_json, context_json, query
    )
}

pub(crate) const SUMMARIZER_SYSTEM_PROMPT: &str = r#"You maintain the memory of a conversation with a school information assistant.
Given the previous context, the latest question and its plan, return the updated context as a single JSON object:
{"current_topic": "...", "active_filters": {...}, "mentioned_entities": [...]}
- Keep only filters the user stated (program, year_level, section, department).
- If the latest question starts an unrelated topic, return empty active_filters.
- Keep mentioned_entities in order of first mention."#;

pub(crate) fn summarizer_user_prompt(previous_json: &str, query: &str, plan_json: &str) -> String {
    format!(
        "Previous Context:\n{}\n---\nLatest Question:\n{}\n---\nLatest Plan:\n{}\n---\nUpdated context JSON:",
        previous_json, query, plan_json
    )
}
