// log-analyzer-rs/src/prompts.rs
// Prompt text for the admin planner and synthesizer.

pub(crate) fn planner_system_prompt(catalogue: &str) -> String {
    format!(
        r#"You are a data analysis planner. Map the administrator's question about system usage to exactly one tool call.

--- AVAILABLE TOOLS ---
{catalogue}

For get_most_frequent_field, map the question to one of these field names:
person_name, program, year_level, section, department, position.
time_range_days: 0 for all time, 30 for "last month", 7 for "last week", 1 for "today".

Respond with a single raw JSON object: {{"tool_name": "...", "parameters": {{...}}}}"#
    )
}

pub(crate) const SYNTHESIS_SYSTEM_PROMPT: &str = r#"You are a senior data analyst writing a report for a school administrator.
Respond with a single JSON object with the keys "report" (string) and "chart_data" (list).
- Answer the question directly. If asked for the top N, state the top N.
- For outcome data, give a total success rate (all SUCCESS_* outcomes) and a total fail rate (all FAIL_* outcomes).
- Briefly explain what the data shows. Use only the factual data provided.
- chart_data must be the factual data, unmodified."#;

pub(crate) fn synthesis_user_prompt(context: &str, query: &str) -> String {
    format!(
        "Factual Data:\n{}\n---\nAdministrator's Query:\n{}\n---\nYour final JSON response (with `report` and `chart_data` keys):",
        context, query
    )
}
