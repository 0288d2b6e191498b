use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use document_store::MemoryDocumentStore;
use llm_client::Phase;
use shared_types_rs::{Outcome, ToolResult};
use tool_registry::{Tool, ToolArguments, ToolError, ToolMetadata};

use super::{analyst, directory_store, doc, logged, named_mock, planner_reply};

#[tokio::test]
async fn test_tied_superlative_asks_without_naming_anyone() {
    let store = MemoryDocumentStore::new();
    store
        .insert_many(
            "students",
            vec![
                doc(json!({"student_id": "S-1", "full_name": "Ana Cruz", "program": "BSCS", "section": "A", "height": 190})),
                doc(json!({"student_id": "S-2", "full_name": "Ben Lim", "program": "BSIT", "section": "A", "height": 190})),
                doc(json!({"student_id": "S-3", "full_name": "Cara Sy", "program": "BSCS", "section": "B", "height": 190})),
                doc(json!({"student_id": "S-4", "full_name": "Dan Uy", "program": "BSCS", "section": "A", "height": 160})),
            ],
        )
        .await
        .unwrap();
    let store = Arc::new(store);

    let mut generator = named_mock("mock");
    generator
        .expect_generate()
        .withf(|_, _, _, phase| *phase == Phase::Planner)
        .times(1)
        .returning(|_, _, _, _| planner_reply(json!({"tool_name": "find_people", "parameters": {"position": "students"}})));
    let analyst = analyst(store.clone(), generator);

    let response = analyst.ask("who is the tallest student", "s-1").await;
    assert_eq!(response.outcome, Outcome::SuccessDirect);
    assert!(response.report.starts_with("I found 3 matching records. Which one do you mean?"));
    assert!(response.report.contains("program"));
    assert!(response.report.contains("section"));
    for name in ["Ana Cruz", "Ben Lim", "Cara Sy", "Dan Uy", "S-1"] {
        assert!(!response.report.contains(name), "clarification leaked {}", name);
    }

    let records = logged(&store).await;
    assert_eq!(records[0].results_count, 4);
    assert!(records[0].synth_model.is_none());

    let session = analyst.sessions().session("s-1");
    assert_eq!(
        session.lock().await.pending_clarification.as_deref(),
        Some("who is the tallest student")
    );
    // an unresolved question is not a reusable example
    assert!(analyst.examples().all().is_empty());
}

#[tokio::test]
async fn test_enumeration_lists_every_record() {
    let store = MemoryDocumentStore::new();
    let students = (1..=120)
        .map(|i| {
            doc(json!({
                "student_id": format!("S-{:03}", i),
                "full_name": format!("Student {:03}", i),
                "program": "BSCS",
                "year_level": 1 + i % 4,
            }))
        })
        .collect();
    store.insert_many("students", students).await.unwrap();
    let store = Arc::new(store);

    let mut generator = named_mock("mock");
    generator
        .expect_generate()
        .withf(|_, _, _, phase| *phase == Phase::Planner)
        .times(1)
        .returning(|_, _, _, _| {
            planner_reply(json!({"tool_name": "find_people", "parameters": {"program": "BSCS", "position": "students"}}))
        });
    generator
        .expect_generate()
        .withf(|_, _, _, phase| *phase == Phase::Synthesizer)
        .times(1)
        .returning(|_, _, _, _| {
            Ok(r#"{"report": "Some BSCS students are Student 001, Student 002 and Student 003 [students].", "chart_data": [{"label": "BSCS", "value": 120}]}"#.to_string())
        });
    let analyst = analyst(store.clone(), generator);

    let response = analyst.ask("list all bscs students", "s-1").await;
    assert_eq!(response.outcome, Outcome::SuccessDirect);
    assert!(response.report.starts_with("Here are all 120 matching records:"));
    for i in 1..=120 {
        assert!(response.report.contains(&format!("Student {:03}", i)));
    }
    assert_eq!(response.chart_data, vec![json!({"label": "BSCS", "value": 120})]);

    let records = logged(&store).await;
    assert_eq!(records[0].outcome, Outcome::SuccessDirect);
    assert_eq!(records[0].results_count, 120);
}

#[tokio::test]
async fn test_enumeration_of_unnamed_rows_lists_every_subject() {
    let store = MemoryDocumentStore::new();
    let subjects = (1..=6)
        .map(|i| doc(json!({"program": "BSCS", "year_level": 1, "subject": format!("Subject {}", i)})))
        .collect();
    store.insert_many("curriculum", subjects).await.unwrap();
    let store = Arc::new(store);

    let mut generator = named_mock("mock");
    generator
        .expect_generate()
        .withf(|_, _, _, phase| *phase == Phase::Planner)
        .times(1)
        .returning(|_, _, _, _| planner_reply(json!({"tool_name": "query_curriculum", "parameters": {"program": "BSCS"}})));
    generator
        .expect_generate()
        .withf(|_, _, _, phase| *phase == Phase::Synthesizer)
        .times(1)
        .returning(|_, _, _, _| {
            Ok(r#"{"report": "The BSCS curriculum includes Subject 1 and Subject 2 [curriculum].", "chart_data": []}"#.to_string())
        });
    let analyst = analyst(store.clone(), generator);

    let response = analyst.ask("list all subjects in the bscs curriculum", "s-1").await;
    assert_eq!(response.outcome, Outcome::SuccessDirect);
    assert!(response.report.starts_with("Here are all 6 matching records:"));
    for i in 1..=6 {
        assert!(response.report.contains(&format!("{}. Subject {} (", i, i)));
    }
}

struct BrokenStatsTool {
    metadata: ToolMetadata,
}

impl BrokenStatsTool {
    fn new() -> Self {
        Self {
            metadata: ToolMetadata {
                name: "get_enrollment_stats".to_string(),
                description: "Enrollment totals per program.".to_string(),
                category: "reports".to_string(),
                parameters: Vec::new(),
            },
        }
    }
}

#[async_trait]
impl Tool for BrokenStatsTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, _args: ToolArguments) -> Result<ToolResult, ToolError> {
        Err(ToolError::Execution("registrar backend unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_failing_tool_is_logged_once() {
    let store = directory_store().await;
    let mut generator = named_mock("mock");
    generator
        .expect_generate()
        .withf(|_, _, _, phase| *phase == Phase::Planner)
        .times(1)
        .returning(|_, _, _, _| planner_reply(json!({"tool_name": "get_enrollment_stats", "parameters": {}})));
    let analyst = analyst(store.clone(), generator);
    analyst.registry().register_tool(Arc::new(BrokenStatsTool::new())).unwrap();

    let response = analyst.ask("summarize the enrollment numbers for this semester", "s-1").await;
    assert_eq!(response.outcome, Outcome::FailExecution);
    assert!(response.report.starts_with("I'm sorry, I ran into a problem"));

    let records = logged(&store).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, Outcome::FailExecution);
    let error = records[0].error_message.as_deref().unwrap();
    assert!(error.contains("registrar backend unreachable"));
    assert!(records[0].synth_model.is_none());
}

#[tokio::test]
async fn test_context_filters_win_until_the_topic_changes() {
    let store = directory_store().await;
    store
        .insert_many(
            "curriculum",
            vec![
                doc(json!({"program": "BSIT", "year_level": 1, "subject": "Intro to Computing"})),
                doc(json!({"program": "BSCS", "year_level": 1, "subject": "Discrete Structures"})),
            ],
        )
        .await
        .unwrap();

    let mut generator = named_mock("mock");
    generator
        .expect_generate()
        .withf(|_, user, _, phase| *phase == Phase::Planner && user == "list all bscs students")
        .times(1)
        .returning(|_, _, _, _| {
            planner_reply(json!({"tool_name": "find_people", "parameters": {"program": "BSCS", "position": "students"}}))
        });
    generator
        .expect_generate()
        .withf(|_, user, _, phase| *phase == Phase::Planner && user == "show me the bsit students")
        .times(1)
        .returning(|_, _, _, _| {
            planner_reply(json!({"tool_name": "find_people", "parameters": {"program": "BSIT", "position": "students"}}))
        });
    generator
        .expect_generate()
        .withf(|_, user, _, phase| *phase == Phase::Planner && user == "what subjects are in the bsit curriculum")
        .times(1)
        .returning(|_, _, _, _| planner_reply(json!({"tool_name": "query_curriculum", "parameters": {"program": "BSIT"}})));
    generator
        .expect_generate()
        .withf(|_, _, _, phase| *phase == Phase::Synthesizer)
        .times(3)
        .returning(|_, _, _, _| Ok(r#"{"report": "Done.", "chart_data": []}"#.to_string()));
    let analyst = analyst(store.clone(), generator);

    analyst.ask("list all bscs students", "s-1").await;
    analyst.ask("show me the bsit students", "s-1").await;
    let response = analyst.ask("what subjects are in the bsit curriculum", "s-1").await;
    assert_eq!(response.outcome, Outcome::SuccessDirect);

    let records = logged(&store).await;
    assert_eq!(records.len(), 3);
    let program = |i: usize| records[i].plan.as_ref().unwrap().parameters.get("program").cloned();
    assert_eq!(program(0), Some(json!("BSCS")));
    // same tool, no new filter value: the remembered program wins
    assert_eq!(program(1), Some(json!("BSCS")));
    assert_eq!(records[1].results_count, 2);
    // a different tool starts over with the extracted value
    assert_eq!(program(2), Some(json!("BSIT")));
    assert_eq!(records[2].results_count, 1);
}
